// Veritext Data Models
// Request/response shapes exchanged with hosted model providers and the document store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Analysis Request ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub text: String,
    /// Optional style/tone hint forwarded to the humanizer prompt.
    pub tone: Option<String>,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: None,
        }
    }

    pub fn with_tone(text: impl Into<String>, tone: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Some(tone.into()),
        }
    }
}

// ============ Sources ============

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub url: String,
    pub title: String,
    /// Similarity percentage in [0,100].
    pub similarity: f64,
    pub matched_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

// ============ Content Analysis ============

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysisResult {
    /// Plagiarism/derivation score in [0,100].
    pub score: f64,
    pub explanation: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

// ============ AI Detection ============

#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    #[default]
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn from_str(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysis {
    pub name: String,
    /// Pattern strength in [0,100].
    pub score: f64,
    pub severity: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TextStatistics {
    pub word_count: i32,
    pub sentence_count: i32,
    pub avg_sentence_length: f64,
    /// Unique words / total words.
    pub vocabulary_diversity: f64,
    pub repeated_phrase_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AIDetectionResult {
    /// AI-likelihood score in [0,100].
    pub score: f64,
    pub ai_probability: f64,
    pub human_probability: f64,
    pub confidence: ConfidenceTier,
    pub explanation: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<PatternAnalysis>,
    #[serde(default)]
    pub statistics: TextStatistics,
}

// ============ Humanization ============

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HumanizeResult {
    pub rewritten: String,
    pub tone: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

// ============ Tool Comparison ============

#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Plagiarism,
    AiDetection,
    Humanize,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plagiarism => "plagiarism",
            Self::AiDetection => "ai_detection",
            Self::Humanize => "humanize",
        }
    }
}

// ============ Account Records ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    /// Identity-provider user id; the upsert key.
    pub provider_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub id: String,
    pub user_id: String,
    pub plan: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub user_id: String,
    pub tool: ToolKind,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_tier_round_trip() {
        assert_eq!(ConfidenceTier::from_str("HIGH"), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_str("nonsense"), ConfidenceTier::Medium);
        let json = serde_json::to_string(&ConfidenceTier::Low).unwrap();
        assert_eq!(json, "\"low\"");
    }

    #[test]
    fn test_content_result_missing_lists_deserialize_empty() {
        let raw = r#"{"score": 72.0, "explanation": "ok"}"#;
        let parsed: ContentAnalysisResult = serde_json::from_str(raw).unwrap();
        assert!(parsed.sources.is_empty());
        assert!(parsed.suggestions.is_empty());
    }
}
