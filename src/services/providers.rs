// Hosted Model Provider Client
// Implements Gemini and OpenRouter chat/completion calls

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Instant;
use thiserror::Error;

const GEMINI_DEFAULT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
const OPENROUTER_DEFAULT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const REQUEST_TIMEOUT_SECS: u64 = 80;

/// Structured analysis/provider errors.
///
/// The original implementation distinguished failures by substring-matching
/// error message text; these variants carry the same distinctions explicitly.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("API key not configured")]
    MissingApiKey,
    #[error("rate limit exceeded (HTTP {status})")]
    RateLimited { status: u16 },
    #[error("API error: {status} - {message}")]
    Upstream { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("could not parse AI response: {0}")]
    UnparseableResponse(String),
    #[error("missing content in response")]
    MissingContent,
    #[error("document store error: {0}")]
    Store(String),
}

impl AnalysisError {
    /// Transient upstream failures worth retrying (429/500/503, timeouts).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Upstream { status, .. } => matches!(status, 500 | 503),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Generic message safe to surface to end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyInput => "Please enter some text to analyze.",
            Self::MissingApiKey => "A valid API key is required.",
            Self::RateLimited { .. } => "Rate limit reached, please wait and try again.",
            Self::UnparseableResponse(_) | Self::MissingContent => {
                "Failed to parse AI response, try different text."
            }
            _ => "Failed to analyze, please try again.",
        }
    }
}

/// Sampling parameters forwarded to the completion endpoint.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: i32,
    pub max_tokens: i32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
    top_p: f64,
    top_k: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ProviderClient {
    client: Client,
    gemini_url: String,
    openrouter_url: String,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        Self::with_overrides(None, None)
    }

    /// Endpoint resolution order: explicit override, environment
    /// variable, built-in default.
    pub fn with_overrides(gemini_url: Option<String>, openrouter_url: Option<String>) -> Self {
        let gemini_url = gemini_url
            .or_else(|| env::var("GEMINI_API_URL").ok())
            .unwrap_or_else(|| GEMINI_DEFAULT_URL.to_string());
        let openrouter_url = openrouter_url
            .or_else(|| env::var("OPENROUTER_API_URL").ok())
            .unwrap_or_else(|| OPENROUTER_DEFAULT_URL.to_string());
        Self::with_urls(gemini_url, openrouter_url)
    }

    /// Override endpoint URLs (used by hosts with gateway proxies and by tests).
    pub fn with_urls(gemini_url: impl Into<String>, openrouter_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            gemini_url: gemini_url.into(),
            openrouter_url: openrouter_url.into(),
        }
    }

    pub async fn call_gemini(
        &self,
        model: &str,
        api_key: &str,
        system: &str,
        user: &str,
        params: SamplingParams,
    ) -> Result<ChatResult, AnalysisError> {
        // Gemini has no system role on this endpoint; prepend it to the user turn.
        let combined = if system.is_empty() {
            user.to_string()
        } else {
            format!("{}\n\n{}", system, user)
        };

        let request = serde_json::json!({
            "model": model,
            "contents": [{"role": "user", "parts": [{"text": combined}]}],
            "generationConfig": {
                "temperature": params.temperature,
                "topP": params.top_p,
                "topK": params.top_k,
                "maxOutputTokens": params.max_tokens
            }
        });

        let start = Instant::now();

        let response = self
            .client
            .post(&self.gemini_url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), body));
        }

        // Gemini response format: {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}
        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::UnparseableResponse(e.to_string()))?;

        let content = data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or(AnalysisError::MissingContent)?;

        Ok(ChatResult {
            content,
            latency_ms,
        })
    }

    pub async fn call_openrouter(
        &self,
        model: &str,
        api_key: &str,
        system: &str,
        user: &str,
        params: SamplingParams,
    ) -> Result<ChatResult, AnalysisError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.openrouter_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), body));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::UnparseableResponse(e.to_string()))?;

        let content = data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(AnalysisError::MissingContent)?;

        Ok(ChatResult {
            content,
            latency_ms,
        })
    }
}

fn map_status(status: u16, message: String) -> AnalysisError {
    if status == 429 {
        AnalysisError::RateLimited { status }
    } else {
        AnalysisError::Upstream { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_status_mapping() {
        assert!(map_status(429, String::new()).is_rate_limit());
        assert!(map_status(500, String::new()).is_retryable());
        assert!(map_status(503, String::new()).is_retryable());
        assert!(!map_status(400, String::new()).is_retryable());
    }

    #[tokio::test]
    async fn test_call_openrouter_extracts_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("Authorization", "Bearer or-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"score\": 12}"}}]
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::with_urls("http://unused", format!("{}/chat", server.uri()));
        let result = client
            .call_openrouter("test-model", "or-key", "sys", "user", SamplingParams::default())
            .await
            .unwrap();
        assert_eq!(result.content, "{\"score\": 12}");
    }

    #[tokio::test]
    async fn test_call_gemini_extracts_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gemini"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "hello"}]}}]
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::with_urls(format!("{}/gemini", server.uri()), "http://unused");
        let result = client
            .call_gemini("gemini-1.5-flash", "g-key", "", "hi", SamplingParams::default())
            .await
            .unwrap();
        assert_eq!(result.content, "hello");
    }

    #[tokio::test]
    async fn test_429_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = ProviderClient::with_urls("http://unused", server.uri());
        let err = client
            .call_openrouter("m", "k", "s", "u", SamplingParams::default())
            .await
            .unwrap_err();
        assert!(err.is_rate_limit());
    }
}
