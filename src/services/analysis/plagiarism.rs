// Plagiarism Pipeline
// Hosted-model plagiarism check: prompt assembly, retry, JSON coercion

use crate::models::ContentAnalysisResult;
use crate::services::analysis::coerce::parse_plagiarism;
use crate::services::analysis::mock::plagiarism_fallback;
use crate::services::analysis::prompts::{plagiarism_user_prompt, PLAGIARISM_SYSTEM_PROMPT};
use crate::services::analysis::HostedBackend;
use crate::services::providers::AnalysisError;
use crate::services::retry::run_with_retry;
use tracing::info;

pub async fn check_plagiarism_hosted(
    backend: &HostedBackend,
    text: &str,
) -> Result<ContentAnalysisResult, AnalysisError> {
    let user_prompt = plagiarism_user_prompt(text);
    let user_prompt = user_prompt.as_str();

    let result = run_with_retry(
        backend.retry_policy(),
        "plagiarism",
        || async move {
            let reply = backend.chat(PLAGIARISM_SYSTEM_PROMPT, user_prompt).await?;
            info!(
                "[PLAGIARISM] reply received, latency_ms={}, bytes={}",
                reply.latency_ms,
                reply.content.len()
            );
            parse_plagiarism(&reply.content)
        },
        plagiarism_fallback,
    )
    .await?;

    Ok(result)
}
