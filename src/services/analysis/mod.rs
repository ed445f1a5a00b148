// Analysis Module
// Content-authenticity tools organized into specialized submodules:
// - prompts: instruction templates sent to hosted models
// - coerce: JSON extraction and field normalization for model replies
// - plagiarism / ai_detection / humanize: per-tool hosted pipelines
// - heuristics: offline fallback scorer (no external calls)
// - source_catalog: static domain table for placeholder Source records
// - mock: canned results substituted after rate-limit exhaustion

pub mod ai_detection;
pub mod coerce;
pub mod heuristics;
pub mod humanize;
pub mod mock;
pub mod plagiarism;
pub mod prompts;
pub mod source_catalog;

use crate::models::{
    AIDetectionResult, AnalysisRequest, ContentAnalysisResult, HumanizeResult,
};
use crate::services::config_store::{env_api_key, SharedConfig};
use crate::services::providers::{AnalysisError, ChatResult, ProviderClient, SamplingParams};
use crate::services::retry::RetryPolicy;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

pub use coerce::{parse_ai_detection, parse_humanize, parse_plagiarism};
pub use heuristics::{check_plagiarism_offline, detect_ai_offline, text_statistics};
pub use humanize::{humanize_offline, DEFAULT_TONE};
pub use source_catalog::fabricate_sources;

/// Per-arm timeout for the fan-out comparison.
const FAN_OUT_TIMEOUT_SECS: u64 = 90;

pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const OPENROUTER_DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Which concrete provider serves a request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProviderKind {
    Mock,
    Gemini,
    OpenRouter,
}

impl ProviderKind {
    pub fn from_str(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "gemini" => Self::Gemini,
            "openrouter" => Self::OpenRouter,
            _ => Self::Mock,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Gemini => "gemini",
            Self::OpenRouter => "openrouter",
        }
    }
}

/// One capability interface for all three tools, implemented by the mock
/// and hosted variants and selected by configuration.
#[async_trait]
pub trait ContentAnalysisProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn check_plagiarism(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ContentAnalysisResult, AnalysisError>;

    async fn detect_ai(&self, request: &AnalysisRequest)
        -> Result<AIDetectionResult, AnalysisError>;

    async fn humanize(&self, request: &AnalysisRequest) -> Result<HumanizeResult, AnalysisError>;
}

/// Reject empty/whitespace input before any other work.
fn validate_input(request: &AnalysisRequest) -> Result<&str, AnalysisError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    Ok(text)
}

fn tone_of(request: &AnalysisRequest) -> &str {
    request.tone.as_deref().unwrap_or(DEFAULT_TONE)
}

// ============ Hosted backends ============

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HostedDialect {
    Gemini,
    OpenRouter,
}

/// A configured hosted-model endpoint: client, dialect, model, injected
/// credential and sampling/retry settings.
pub struct HostedBackend {
    client: ProviderClient,
    dialect: HostedDialect,
    model: String,
    api_key: String,
    params: SamplingParams,
    retry: RetryPolicy,
}

impl HostedBackend {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn chat(&self, system: &str, user: &str) -> Result<ChatResult, AnalysisError> {
        match self.dialect {
            HostedDialect::Gemini => {
                self.client
                    .call_gemini(&self.model, &self.api_key, system, user, self.params)
                    .await
            }
            HostedDialect::OpenRouter => {
                self.client
                    .call_openrouter(&self.model, &self.api_key, system, user, self.params)
                    .await
            }
        }
    }
}

/// Shared constructor plumbing for the two hosted variants.
struct HostedProvider {
    backend: Option<HostedBackend>,
    kind: ProviderKind,
}

impl HostedProvider {
    fn new(
        kind: ProviderKind,
        dialect: HostedDialect,
        model: String,
        api_key: Option<String>,
        client: ProviderClient,
        params: SamplingParams,
        retry: RetryPolicy,
    ) -> Self {
        let backend = api_key
            .filter(|k| !k.trim().is_empty())
            .map(|api_key| HostedBackend {
                client,
                dialect,
                model,
                api_key,
                params,
                retry,
            });
        Self { backend, kind }
    }

    /// The configured backend, or MissingApiKey before any network call.
    fn backend(&self) -> Result<&HostedBackend, AnalysisError> {
        self.backend.as_ref().ok_or(AnalysisError::MissingApiKey)
    }
}

macro_rules! hosted_provider_impl {
    ($name:ident) => {
        #[async_trait]
        impl ContentAnalysisProvider for $name {
            fn kind(&self) -> ProviderKind {
                self.inner.kind
            }

            async fn check_plagiarism(
                &self,
                request: &AnalysisRequest,
            ) -> Result<ContentAnalysisResult, AnalysisError> {
                let text = validate_input(request)?;
                let backend = self.inner.backend()?;
                plagiarism::check_plagiarism_hosted(backend, text).await
            }

            async fn detect_ai(
                &self,
                request: &AnalysisRequest,
            ) -> Result<AIDetectionResult, AnalysisError> {
                let text = validate_input(request)?;
                let backend = self.inner.backend()?;
                ai_detection::detect_ai_hosted(backend, text).await
            }

            async fn humanize(
                &self,
                request: &AnalysisRequest,
            ) -> Result<HumanizeResult, AnalysisError> {
                let text = validate_input(request)?;
                let backend = self.inner.backend()?;
                humanize::humanize_hosted(backend, text, tone_of(request)).await
            }
        }
    };
}

pub struct GeminiProvider {
    inner: HostedProvider,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_client(ProviderClient::new(), GEMINI_DEFAULT_MODEL.to_string(), api_key,
            SamplingParams::default(), RetryPolicy::default())
    }

    pub fn with_client(
        client: ProviderClient,
        model: String,
        api_key: Option<String>,
        params: SamplingParams,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner: HostedProvider::new(
                ProviderKind::Gemini,
                HostedDialect::Gemini,
                model,
                api_key,
                client,
                params,
                retry,
            ),
        }
    }
}

hosted_provider_impl!(GeminiProvider);

pub struct OpenRouterProvider {
    inner: HostedProvider,
}

impl OpenRouterProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_client(ProviderClient::new(), OPENROUTER_DEFAULT_MODEL.to_string(), api_key,
            SamplingParams::default(), RetryPolicy::default())
    }

    pub fn with_client(
        client: ProviderClient,
        model: String,
        api_key: Option<String>,
        params: SamplingParams,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner: HostedProvider::new(
                ProviderKind::OpenRouter,
                HostedDialect::OpenRouter,
                model,
                api_key,
                client,
                params,
                retry,
            ),
        }
    }
}

hosted_provider_impl!(OpenRouterProvider);

// ============ Mock (offline) provider ============

/// Offline provider backed by the heuristic scorer; used when no hosted
/// model is configured. Results are cosmetic estimates, never verified.
#[derive(Debug, Default)]
pub struct MockProvider;

#[async_trait]
impl ContentAnalysisProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn check_plagiarism(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ContentAnalysisResult, AnalysisError> {
        let text = validate_input(request)?;
        Ok(heuristics::check_plagiarism_offline(text))
    }

    async fn detect_ai(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AIDetectionResult, AnalysisError> {
        let text = validate_input(request)?;
        Ok(heuristics::detect_ai_offline(text))
    }

    async fn humanize(&self, request: &AnalysisRequest) -> Result<HumanizeResult, AnalysisError> {
        let text = validate_input(request)?;
        Ok(humanize::humanize_offline(text, tone_of(request)))
    }
}

/// Build the provider named by configuration, reading its credential from
/// the shared config (environment variables take precedence).
pub fn provider_from_config(config: &SharedConfig) -> Box<dyn ContentAnalysisProvider> {
    let kind = config
        .store()
        .load()
        .ok()
        .and_then(|c| c.default_provider)
        .map(|name| ProviderKind::from_str(&name))
        .unwrap_or(ProviderKind::Mock);

    provider_for(kind, config)
}

pub fn provider_for(kind: ProviderKind, config: &SharedConfig) -> Box<dyn ContentAnalysisProvider> {
    info!("[ANALYSIS] selecting provider: {}", kind.as_str());
    // Environment variables take precedence over the config file.
    let key = |name: &str| env_api_key(name).or_else(|| config.api_key(name));

    let app = config.store().load().unwrap_or_default();
    let params = SamplingParams {
        temperature: app.analysis.temperature,
        top_p: app.analysis.top_p,
        top_k: app.analysis.top_k,
        max_tokens: app.analysis.max_tokens,
    };
    let retry = RetryPolicy {
        max_retries: app.analysis.max_retries,
        ..RetryPolicy::default()
    };
    let model_for = |name: &str, default: &str| {
        app.providers
            .get(name)
            .and_then(|p| p.model.clone())
            .unwrap_or_else(|| default.to_string())
    };
    let base_url = |name: &str| app.providers.get(name).and_then(|p| p.base_url.clone());

    match kind {
        ProviderKind::Mock => Box::new(MockProvider),
        ProviderKind::Gemini => Box::new(GeminiProvider::with_client(
            ProviderClient::with_overrides(base_url("gemini"), None),
            model_for("gemini", GEMINI_DEFAULT_MODEL),
            key("gemini"),
            params,
            retry,
        )),
        ProviderKind::OpenRouter => Box::new(OpenRouterProvider::with_client(
            ProviderClient::with_overrides(None, base_url("openrouter")),
            model_for("openrouter", OPENROUTER_DEFAULT_MODEL),
            key("openrouter"),
            params,
            retry,
        )),
    }
}

// ============ Fan-out comparison ============

/// Per-tool results from one fan-out run. Arms settle independently;
/// one failure never blocks the others.
pub struct ComparisonOutcome {
    pub plagiarism: Result<ContentAnalysisResult, AnalysisError>,
    pub ai_detection: Result<AIDetectionResult, AnalysisError>,
    pub humanize: Result<HumanizeResult, AnalysisError>,
}

async fn with_timeout<T>(
    fut: impl std::future::Future<Output = Result<T, AnalysisError>>,
) -> Result<T, AnalysisError> {
    match tokio::time::timeout(Duration::from_secs(FAN_OUT_TIMEOUT_SECS), fut).await {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::Timeout),
    }
}

/// Run all three tools concurrently against one provider.
pub async fn compare_all(
    provider: &dyn ContentAnalysisProvider,
    request: &AnalysisRequest,
) -> ComparisonOutcome {
    let (plagiarism, ai_detection, humanize) = tokio::join!(
        with_timeout(provider.check_plagiarism(request)),
        with_timeout(provider.detect_ai(request)),
        with_timeout(provider.humanize(request)),
    );

    ComparisonOutcome {
        plagiarism,
        ai_detection,
        humanize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_empty_input_rejected_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::with_client(
            ProviderClient::with_urls("http://unused", server.uri()),
            "m".to_string(),
            Some("key".to_string()),
            SamplingParams::default(),
            fast_retry(),
        );

        let err = provider
            .check_plagiarism(&AnalysisRequest::new("   \n\t "))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput));
    }

    #[tokio::test]
    async fn test_missing_key_rejected_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::with_client(
            ProviderClient::with_urls("http://unused", server.uri()),
            "m".to_string(),
            None,
            SamplingParams::default(),
            fast_retry(),
        );

        let err = provider
            .detect_ai(&AnalysisRequest::new("real text to analyze"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_hosted_plagiarism_normalizes_reply() {
        let server = MockServer::start().await;
        let reply = serde_json::json!({
            "choices": [{"message": {"content":
                "{\"score\": 400, \"explanation\": \"derivative\", \"sources\": [{\"url\": \"https://example.com/x\", \"title\": \"t\", \"similarity\": 30, \"matchedText\": \"m\"}]}"
            }}]
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::with_client(
            ProviderClient::with_urls("http://unused", server.uri()),
            "m".to_string(),
            Some("key".to_string()),
            SamplingParams::default(),
            fast_retry(),
        );

        let result = provider
            .check_plagiarism(&AnalysisRequest::new("essay text"))
            .await
            .unwrap();
        // Out-of-range score replaced with the plagiarism default.
        assert_eq!(result.score, coerce::DEFAULT_PLAGIARISM_SCORE);
        assert!(!result.sources[0].url.contains("example.com"));
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_yields_mock_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3) // initial attempt + 2 retries
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::with_client(
            ProviderClient::with_urls("http://unused", server.uri()),
            "m".to_string(),
            Some("key".to_string()),
            SamplingParams::default(),
            fast_retry(),
        );

        let result = provider
            .detect_ai(&AnalysisRequest::new("essay text under rate limit"))
            .await
            .unwrap();
        assert_eq!(result.score, 50.0);
        assert_eq!(result.ai_probability + result.human_probability, 100.0);
    }

    #[tokio::test]
    async fn test_mock_provider_scores_in_range() {
        let provider = MockProvider;
        let request = AnalysisRequest::new(
            "Furthermore, technology plays a crucial role in modern systems. \
             Moreover, data delve into every domain of daily life.",
        );

        let plag = provider.check_plagiarism(&request).await.unwrap();
        let ai = provider.detect_ai(&request).await.unwrap();
        assert!((0.0..=100.0).contains(&plag.score));
        assert!((0.0..=100.0).contains(&ai.score));
        assert!((ai.ai_probability + ai.human_probability - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_compare_all_settles_every_arm() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::with_client(
            ProviderClient::with_urls("http://unused", server.uri()),
            "m".to_string(),
            Some("key".to_string()),
            SamplingParams::default(),
            fast_retry(),
        );

        let outcome = compare_all(&provider, &AnalysisRequest::new("essay text")).await;
        // All arms settle even though every call fails.
        assert!(outcome.plagiarism.is_err());
        assert!(outcome.ai_detection.is_err());
        assert!(outcome.humanize.is_err());
    }

    #[tokio::test]
    async fn test_compare_all_with_mock_provider() {
        let provider = MockProvider;
        let outcome = compare_all(
            &provider,
            &AnalysisRequest::with_tone("Some ordinary essay text, long enough to score.", "casual"),
        )
        .await;
        assert!(outcome.plagiarism.is_ok());
        assert!(outcome.ai_detection.is_ok());
        assert_eq!(outcome.humanize.unwrap().tone, "casual");
    }

    #[tokio::test]
    async fn test_provider_for_uses_configured_endpoint_and_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("custom-model"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"score\": 10, \"explanation\": \"ok\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let shared = SharedConfig::new(dir.path().to_path_buf()).unwrap();
        shared
            .store()
            .set_provider_url("openrouter", &server.uri())
            .unwrap();
        let mut app = shared.store().load().unwrap();
        app.analysis.max_retries = 0;
        if let Some(p) = app.providers.get_mut("openrouter") {
            p.model = Some("custom-model".to_string());
        }
        shared.store().save(&app).unwrap();
        shared.set_api_key("openrouter", "or-key").unwrap();

        let provider = provider_for(ProviderKind::OpenRouter, &shared);
        let result = provider
            .check_plagiarism(&AnalysisRequest::new("essay text"))
            .await
            .unwrap();
        assert_eq!(result.score, 10.0);
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!(ProviderKind::from_str("Gemini"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::from_str("openrouter"), ProviderKind::OpenRouter);
        assert_eq!(ProviderKind::from_str("anything-else"), ProviderKind::Mock);
    }
}
