// Account Service
// Bridges the identity provider's signed-in user to document-store records
// via an idempotent upsert keyed by the provider's user id.

use crate::models::{AnalysisRecord, DocumentRecord, SubscriptionRecord, ToolKind, UserRecord};
use crate::services::providers::AnalysisError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

pub const FREE_PLAN: &str = "free";
const FREE_PLAN_DAYS: i64 = 365;

/// Query/mutation access to the four record kinds the app stores.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_user_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<UserRecord>, AnalysisError>;
    async fn insert_user(&self, user: &UserRecord) -> Result<(), AnalysisError>;
    async fn update_user(&self, user: &UserRecord) -> Result<(), AnalysisError>;
    async fn insert_subscription(&self, sub: &SubscriptionRecord) -> Result<(), AnalysisError>;
    async fn find_subscription_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, AnalysisError>;
    async fn insert_document(&self, doc: &DocumentRecord) -> Result<(), AnalysisError>;
    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AnalysisError>;
}

/// Identity-provider sign-in payload.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub provider_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

pub struct AccountService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Idempotent upsert: an existing user is returned unchanged (with
    /// email/name patched on drift); a first sign-in creates the user and
    /// one free subscription with a one-year expiry.
    ///
    /// Existence check then insert: two racing sign-ins for the same new
    /// user are not guarded against here.
    pub async fn ensure_user(&self, sign_in: &SignIn) -> Result<UserRecord, AnalysisError> {
        if let Some(mut existing) = self
            .store
            .find_user_by_provider_id(&sign_in.provider_id)
            .await?
        {
            let drifted = existing.email != sign_in.email
                || existing.first_name != sign_in.first_name
                || existing.last_name != sign_in.last_name;
            if drifted {
                existing.email = sign_in.email.clone();
                existing.first_name = sign_in.first_name.clone();
                existing.last_name = sign_in.last_name.clone();
                self.store.update_user(&existing).await?;
                info!("[ACCOUNTS] patched drifted profile for provider_id={}", sign_in.provider_id);
            }
            return Ok(existing);
        }

        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            provider_id: sign_in.provider_id.clone(),
            email: sign_in.email.clone(),
            first_name: sign_in.first_name.clone(),
            last_name: sign_in.last_name.clone(),
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;

        let subscription = SubscriptionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            plan: FREE_PLAN.to_string(),
            expires_at: Utc::now() + Duration::days(FREE_PLAN_DAYS),
        };
        self.store.insert_subscription(&subscription).await?;

        info!("[ACCOUNTS] created user and free subscription for provider_id={}", sign_in.provider_id);
        Ok(user)
    }

    pub async fn save_document(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
    ) -> Result<DocumentRecord, AnalysisError> {
        let doc = DocumentRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_document(&doc).await?;
        Ok(doc)
    }

    pub async fn record_analysis(
        &self,
        user_id: &str,
        tool: ToolKind,
        score: f64,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let record = AnalysisRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            tool,
            score,
            created_at: Utc::now(),
        };
        self.store.insert_analysis(&record).await?;
        Ok(record)
    }
}

// ============ HTTP document store ============

/// Query/mutation RPC client for a hosted document database.
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            auth_token,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        name: &str,
        args: Value,
    ) -> Result<T, AnalysisError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);
        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "name": name, "args": args }));
        if let Some(ref token) = self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Store(format!("{} failed: {} {}", name, status, body)));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Store(e.to_string()))?;
        serde_json::from_value(envelope["value"].clone())
            .map_err(|e| AnalysisError::Store(format!("{} response: {}", name, e)))
    }

    async fn query<T: DeserializeOwned>(&self, name: &str, args: Value) -> Result<T, AnalysisError> {
        self.call("query", name, args).await
    }

    async fn mutation(&self, name: &str, args: Value) -> Result<(), AnalysisError> {
        self.call::<Value>("mutation", name, args).await.map(|_| ())
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn find_user_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<UserRecord>, AnalysisError> {
        self.query("users:byProviderId", json!({ "providerId": provider_id }))
            .await
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), AnalysisError> {
        self.mutation("users:insert", serde_json::to_value(user).unwrap_or_default())
            .await
    }

    async fn update_user(&self, user: &UserRecord) -> Result<(), AnalysisError> {
        self.mutation("users:update", serde_json::to_value(user).unwrap_or_default())
            .await
    }

    async fn insert_subscription(&self, sub: &SubscriptionRecord) -> Result<(), AnalysisError> {
        self.mutation("subscriptions:insert", serde_json::to_value(sub).unwrap_or_default())
            .await
    }

    async fn find_subscription_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, AnalysisError> {
        self.query("subscriptions:byUser", json!({ "userId": user_id }))
            .await
    }

    async fn insert_document(&self, doc: &DocumentRecord) -> Result<(), AnalysisError> {
        self.mutation("documents:insert", serde_json::to_value(doc).unwrap_or_default())
            .await
    }

    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AnalysisError> {
        self.mutation("analysisResults:insert", serde_json::to_value(record).unwrap_or_default())
            .await
    }
}

// ============ In-memory document store ============

/// In-process store used in tests and key-less trial mode.
#[derive(Default)]
pub struct MemoryDocumentStore {
    users: Mutex<HashMap<String, UserRecord>>,
    subscriptions: Mutex<Vec<SubscriptionRecord>>,
    documents: Mutex<Vec<DocumentRecord>>,
    analyses: Mutex<Vec<AnalysisRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().expect("users lock").len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().expect("subscriptions lock").len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_user_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<UserRecord>, AnalysisError> {
        Ok(self
            .users
            .lock()
            .expect("users lock")
            .get(provider_id)
            .cloned())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), AnalysisError> {
        self.users
            .lock()
            .expect("users lock")
            .insert(user.provider_id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &UserRecord) -> Result<(), AnalysisError> {
        self.insert_user(user).await
    }

    async fn insert_subscription(&self, sub: &SubscriptionRecord) -> Result<(), AnalysisError> {
        self.subscriptions
            .lock()
            .expect("subscriptions lock")
            .push(sub.clone());
        Ok(())
    }

    async fn find_subscription_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, AnalysisError> {
        Ok(self
            .subscriptions
            .lock()
            .expect("subscriptions lock")
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn insert_document(&self, doc: &DocumentRecord) -> Result<(), AnalysisError> {
        self.documents.lock().expect("documents lock").push(doc.clone());
        Ok(())
    }

    async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<(), AnalysisError> {
        self.analyses.lock().expect("analyses lock").push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_in() -> SignIn {
        SignIn {
            provider_id: "prov_123".to_string(),
            email: "ada@example.org".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_user_and_free_subscription() {
        let service = AccountService::new(MemoryDocumentStore::new());
        let user = service.ensure_user(&sign_in()).await.unwrap();

        assert_eq!(service.store().user_count(), 1);
        assert_eq!(service.store().subscription_count(), 1);

        let sub = service
            .store()
            .find_subscription_by_user(&user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.plan, FREE_PLAN);
        let days_out = (sub.expires_at - Utc::now()).num_days();
        assert!((360..=365).contains(&days_out));
    }

    #[tokio::test]
    async fn test_second_sign_in_creates_nothing_new() {
        let service = AccountService::new(MemoryDocumentStore::new());
        let first = service.ensure_user(&sign_in()).await.unwrap();
        let second = service.ensure_user(&sign_in()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(service.store().user_count(), 1);
        assert_eq!(service.store().subscription_count(), 1);
    }

    #[tokio::test]
    async fn test_drifted_profile_is_patched_without_new_records() {
        let service = AccountService::new(MemoryDocumentStore::new());
        let original = service.ensure_user(&sign_in()).await.unwrap();

        let mut changed = sign_in();
        changed.email = "ada@newdomain.org".to_string();
        let patched = service.ensure_user(&changed).await.unwrap();

        assert_eq!(patched.id, original.id);
        assert_eq!(patched.email, "ada@newdomain.org");
        assert_eq!(service.store().user_count(), 1);
        assert_eq!(service.store().subscription_count(), 1);
    }

    #[tokio::test]
    async fn test_record_analysis_and_document() {
        let service = AccountService::new(MemoryDocumentStore::new());
        let user = service.ensure_user(&sign_in()).await.unwrap();

        let record = service
            .record_analysis(&user.id, ToolKind::Plagiarism, 42.0)
            .await
            .unwrap();
        assert_eq!(record.user_id, user.id);

        let doc = service
            .save_document(&user.id, "Essay", "Body text")
            .await
            .unwrap();
        assert_eq!(doc.title, "Essay");
    }
}
