// Humanization Pipeline
// Hosted-model rewriting plus the offline regex/template fallback

use crate::models::HumanizeResult;
use crate::services::analysis::coerce::parse_humanize;
use crate::services::analysis::mock::humanize_fallback;
use crate::services::analysis::prompts::{humanize_user_prompt, HUMANIZE_SYSTEM_PROMPT};
use crate::services::analysis::HostedBackend;
use crate::services::providers::AnalysisError;
use crate::services::retry::run_with_retry;
use regex::Regex;
use std::sync::OnceLock;
use tracing::info;

pub const DEFAULT_TONE: &str = "neutral";

pub async fn humanize_hosted(
    backend: &HostedBackend,
    text: &str,
    tone: &str,
) -> Result<HumanizeResult, AnalysisError> {
    let user_prompt = humanize_user_prompt(text, tone);
    let user_prompt = user_prompt.as_str();

    let result = run_with_retry(
        backend.retry_policy(),
        "humanize",
        || async move {
            let reply = backend.chat(HUMANIZE_SYSTEM_PROMPT, user_prompt).await?;
            info!(
                "[HUMANIZE] reply received, latency_ms={}, bytes={}",
                reply.latency_ms,
                reply.content.len()
            );
            parse_humanize(&reply.content, tone)
        },
        || humanize_fallback(text, tone),
    )
    .await?;

    Ok(result)
}

// ============ Offline fallback ============

struct Substitution {
    pattern: &'static str,
    replacement: &'static str,
    note: &'static str,
}

/// Contraction insertions and stock-phrase swaps that lower the usual
/// machine-generation signals without touching meaning.
// Phrase-level swaps run before contractions so longer patterns are not
// broken by an earlier rewrite inside them.
const SUBSTITUTIONS: &[Substitution] = &[
    Substitution { pattern: r"(?i)\bit is important to note that\s", replacement: "note that ", note: "swap: it is important to note" },
    Substitution { pattern: r"(?i)\bfurthermore,?\s", replacement: "also, ", note: "swap: furthermore" },
    Substitution { pattern: r"(?i)\bmoreover,?\s", replacement: "plus, ", note: "swap: moreover" },
    Substitution { pattern: r"(?i)\bin conclusion,?\s", replacement: "all in all, ", note: "swap: in conclusion" },
    Substitution { pattern: r"(?i)\bdelve into\b", replacement: "dig into", note: "swap: delve into" },
    Substitution { pattern: r"(?i)\butilize\b", replacement: "use", note: "swap: utilize" },
    Substitution { pattern: r"(?i)\bin order to\b", replacement: "to", note: "swap: in order to" },
    Substitution { pattern: r"(?i)\bplays a crucial role in\b", replacement: "matters a lot for", note: "swap: plays a crucial role" },
    Substitution { pattern: r"(?i)\bdo not\b", replacement: "don't", note: "contraction: do not" },
    Substitution { pattern: r"(?i)\bit is\b", replacement: "it's", note: "contraction: it is" },
    Substitution { pattern: r"(?i)\bcannot\b", replacement: "can't", note: "contraction: cannot" },
    Substitution { pattern: r"(?i)\bwill not\b", replacement: "won't", note: "contraction: will not" },
    Substitution { pattern: r"(?i)\bthat is\b", replacement: "that's", note: "contraction: that is" },
    Substitution { pattern: r"(?i)\bthere is\b", replacement: "there's", note: "contraction: there is" },
    Substitution { pattern: r"(?i)\bis not\b", replacement: "isn't", note: "contraction: is not" },
    Substitution { pattern: r"(?i)\bdoes not\b", replacement: "doesn't", note: "contraction: does not" },
];

fn substitution_regexes() -> &'static Vec<(Regex, &'static Substitution)> {
    static REGEXES: OnceLock<Vec<(Regex, &'static Substitution)>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        SUBSTITUTIONS
            .iter()
            .map(|s| (Regex::new(s.pattern).expect("substitution pattern"), s))
            .collect()
    })
}

/// Offline humanizer: regex/template substitution with a change log.
pub fn humanize_offline(text: &str, tone: &str) -> HumanizeResult {
    let mut rewritten = text.to_string();
    let mut changes = Vec::new();

    for (re, sub) in substitution_regexes() {
        if re.is_match(&rewritten) {
            rewritten = re.replace_all(&rewritten, sub.replacement).to_string();
            changes.push(sub.note.to_string());
        }
    }

    if changes.is_empty() {
        changes.push("no mechanical rewrites applied".to_string());
    }

    HumanizeResult {
        rewritten,
        tone: tone.to_string(),
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_substitutions_apply() {
        let text = "Furthermore, it is important to note that we utilize data. It is not simple.";
        let result = humanize_offline(text, "casual");
        assert!(result.rewritten.to_lowercase().contains("also,"));
        assert!(result.rewritten.contains("use data"));
        assert!(!result.rewritten.to_lowercase().contains("furthermore"));
        assert!(result.changes.len() >= 3);
    }

    #[test]
    fn test_offline_no_op_records_empty_change() {
        let result = humanize_offline("Plain words here.", DEFAULT_TONE);
        assert_eq!(result.rewritten, "Plain words here.");
        assert_eq!(result.changes.len(), 1);
    }
}
