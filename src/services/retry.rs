// Retry State Machine
// Bounded exponential backoff with a rate-limit fallback path

use crate::services::providers::AnalysisError;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Explicit retry lifecycle. The original expressed this as a recursive
/// function; the states make the transitions inspectable.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RetryState {
    Attempting,
    Retrying(u32),
    Fallback,
    Success,
    Failed,
}

#[derive(Debug, Copy, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Exponential delay before retry attempt `n` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms << attempt.saturating_sub(1).min(10))
    }
}

/// Outcome of a single attempt, as seen by the state machine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AttemptOutcome {
    Succeeded,
    RetryableError { rate_limited: bool },
    FatalError,
}

impl RetryState {
    /// Pure transition function: Attempting → Retrying(n) → Fallback | Success | Failed.
    pub fn next(self, outcome: AttemptOutcome, policy: &RetryPolicy) -> RetryState {
        let attempts_used = match self {
            RetryState::Attempting => 0,
            RetryState::Retrying(n) => n,
            terminal => return terminal,
        };

        match outcome {
            AttemptOutcome::Succeeded => RetryState::Success,
            AttemptOutcome::FatalError => RetryState::Failed,
            AttemptOutcome::RetryableError { rate_limited } => {
                if attempts_used < policy.max_retries {
                    RetryState::Retrying(attempts_used + 1)
                } else if rate_limited {
                    // Quota exhaustion degrades to the static mock result.
                    RetryState::Fallback
                } else {
                    RetryState::Failed
                }
            }
        }
    }
}

fn classify<T>(result: &Result<T, AnalysisError>) -> AttemptOutcome {
    match result {
        Ok(_) => AttemptOutcome::Succeeded,
        Err(e) if e.is_retryable() => AttemptOutcome::RetryableError {
            rate_limited: e.is_rate_limit(),
        },
        Err(_) => AttemptOutcome::FatalError,
    }
}

/// Drive an operation through the retry state machine.
///
/// `fallback` supplies the canned result substituted when retries exhaust
/// on a rate-limit-flavored error; all other exhaustions propagate the
/// last error.
pub async fn run_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
    fallback: impl FnOnce() -> T,
) -> Result<T, AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    let mut state = RetryState::Attempting;

    loop {
        let result = op().await;
        let outcome = classify(&result);
        state = state.next(outcome, &policy);

        match state {
            RetryState::Success => return result,
            RetryState::Failed => {
                if let Err(ref e) = result {
                    warn!("[RETRY] {} failed: {}", label, e);
                }
                return result;
            }
            RetryState::Fallback => {
                warn!("[RETRY] {} rate-limited after {} retries, using fallback result", label, policy.max_retries);
                return Ok(fallback());
            }
            RetryState::Retrying(n) => {
                let delay = policy.delay(n);
                info!("[RETRY] {} attempt {} failed, retrying in {}ms", label, n, delay.as_millis());
                tokio::time::sleep(delay).await;
            }
            RetryState::Attempting => unreachable!("next() never returns Attempting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
        }
    }

    #[test]
    fn test_transitions() {
        let p = policy();
        let s = RetryState::Attempting;
        assert_eq!(s.next(AttemptOutcome::Succeeded, &p), RetryState::Success);
        assert_eq!(s.next(AttemptOutcome::FatalError, &p), RetryState::Failed);

        let s = s.next(AttemptOutcome::RetryableError { rate_limited: true }, &p);
        assert_eq!(s, RetryState::Retrying(1));
        let s = s.next(AttemptOutcome::RetryableError { rate_limited: true }, &p);
        assert_eq!(s, RetryState::Retrying(2));
        // Retries exhausted: rate limit falls back, others fail.
        assert_eq!(
            s.next(AttemptOutcome::RetryableError { rate_limited: true }, &p),
            RetryState::Fallback
        );
        assert_eq!(
            s.next(AttemptOutcome::RetryableError { rate_limited: false }, &p),
            RetryState::Failed
        );
    }

    #[test]
    fn test_delay_doubles() {
        let p = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 500,
        };
        assert_eq!(p.delay(1).as_millis(), 500);
        assert_eq!(p.delay(2).as_millis(), 1000);
        assert_eq!(p.delay(3).as_millis(), 2000);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_returns_fallback() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(
            policy(),
            "test",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(AnalysisError::RateLimited { status: 429 }) }
            },
            || 42,
        )
        .await
        .unwrap();

        assert_eq!(result, 42);
        // Initial attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_after_transient_error() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(
            policy(),
            "test",
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(AnalysisError::Upstream {
                            status: 503,
                            message: "unavailable".to_string(),
                        })
                    } else {
                        Ok(7)
                    }
                }
            },
            || 0,
        )
        .await
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_propagates() {
        let err = run_with_retry(
            policy(),
            "test",
            || async { Err::<i32, _>(AnalysisError::MissingApiKey) },
            || 0,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AnalysisError::MissingApiKey));
    }
}
