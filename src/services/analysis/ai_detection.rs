// AI Detection Pipeline
// Hosted-model detection: prompt assembly, retry, JSON coercion

use crate::models::AIDetectionResult;
use crate::services::analysis::coerce::parse_ai_detection;
use crate::services::analysis::mock::ai_detection_fallback;
use crate::services::analysis::prompts::{ai_detection_user_prompt, AI_DETECTION_SYSTEM_PROMPT};
use crate::services::analysis::HostedBackend;
use crate::services::providers::AnalysisError;
use crate::services::retry::run_with_retry;
use tracing::info;

pub async fn detect_ai_hosted(
    backend: &HostedBackend,
    text: &str,
) -> Result<AIDetectionResult, AnalysisError> {
    let user_prompt = ai_detection_user_prompt(text);
    let user_prompt = user_prompt.as_str();

    let result = run_with_retry(
        backend.retry_policy(),
        "ai_detection",
        || async move {
            let reply = backend.chat(AI_DETECTION_SYSTEM_PROMPT, user_prompt).await?;
            info!(
                "[AI_DETECTION] reply received, latency_ms={}, bytes={}",
                reply.latency_ms,
                reply.content.len()
            );
            parse_ai_detection(&reply.content, text)
        },
        || ai_detection_fallback(text),
    )
    .await?;

    Ok(result)
}
