// Heuristic Fallback Scorer
// Produces plausible-looking scores without any external call or reference
// corpus: word/sentence statistics, regex phrase hits, fixed linear weights
// and bounded random jitter. Explicitly cosmetic; no precision/recall claim.

use crate::models::{
    AIDetectionResult, ConfidenceTier, ContentAnalysisResult, PatternAnalysis, TextStatistics,
};
use crate::services::analysis::source_catalog::fabricate_sources;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Stock phrases over-represented in machine-generated prose.
const COMMON_PHRASES: &[&str] = &[
    r"(?i)\bin conclusion\b",
    r"(?i)\bfurthermore\b",
    r"(?i)\bmoreover\b",
    r"(?i)\bit is important to note\b",
    r"(?i)\bdelve into\b",
    r"(?i)\bin today's (?:world|society)\b",
    r"(?i)\bplays a crucial role\b",
    r"(?i)\bon the other hand\b",
    r"(?i)\ba testament to\b",
    r"(?i)\bas an ai\b",
];

fn phrase_regexes() -> &'static Vec<Regex> {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        COMMON_PHRASES
            .iter()
            .map(|p| Regex::new(p).expect("common phrase pattern"))
            .collect()
    })
}

fn words(text: &str) -> Vec<&str> {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    let re = WORD_RE.get_or_init(|| Regex::new(r"[A-Za-z0-9']+").expect("word pattern"));
    re.find_iter(text).map(|m| m.as_str()).collect()
}

fn sentences(text: &str) -> Vec<&str> {
    text.split(|c| matches!(c, '.' | '!' | '?'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Count stock-phrase hits across the text.
pub fn common_phrase_hits(text: &str) -> usize {
    phrase_regexes()
        .iter()
        .map(|re| re.find_iter(text).count())
        .sum()
}

/// Aggregate text statistics reported alongside detection results.
pub fn text_statistics(text: &str) -> TextStatistics {
    let words = words(text);
    let sentences = sentences(text);
    let total = words.len();
    let unique: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let avg_sentence_length = if sentences.is_empty() {
        total as f64
    } else {
        total as f64 / sentences.len() as f64
    };

    let diversity = if total == 0 {
        0.0
    } else {
        unique.len() as f64 / total as f64
    };

    TextStatistics {
        word_count: total as i32,
        sentence_count: sentences.len() as i32,
        avg_sentence_length,
        vocabulary_diversity: diversity,
        repeated_phrase_count: common_phrase_hits(text) as i32,
    }
}

/// Bounded random jitter so repeated runs do not return identical scores.
fn jitter(bound: f64) -> f64 {
    rand::thread_rng().gen_range(-bound..=bound)
}

/// Heuristic AI-likelihood score in [0,100].
///
/// Fixed linear weights over vocabulary diversity, sentence-length
/// uniformity and stock-phrase density.
pub fn ai_likelihood_score(text: &str) -> f64 {
    let stats = text_statistics(text);
    if stats.word_count == 0 {
        return 0.0;
    }

    let mut score = 35.0;

    // Low vocabulary diversity reads as machine-generated.
    score += (0.55 - stats.vocabulary_diversity).max(0.0) * 80.0;
    // Very uniform, mid-length sentences are a weak machine signal.
    if stats.avg_sentence_length > 14.0 && stats.avg_sentence_length < 26.0 {
        score += 8.0;
    }
    // Stock phrases weigh heavily.
    score += (stats.repeated_phrase_count as f64 * 6.0).min(30.0);

    (score + jitter(5.0)).clamp(0.0, 100.0)
}

/// Heuristic plagiarism score in [0,100].
pub fn plagiarism_score(text: &str) -> f64 {
    let stats = text_statistics(text);
    if stats.word_count == 0 {
        return 0.0;
    }

    let mut score = 12.0;
    score += (stats.repeated_phrase_count as f64 * 5.0).min(25.0);
    score += (0.45 - stats.vocabulary_diversity).max(0.0) * 50.0;
    if stats.avg_sentence_length > 22.0 {
        score += 6.0;
    }

    (score + jitter(4.0)).clamp(0.0, 100.0)
}

fn severity_for(score: f64) -> &'static str {
    if score >= 70.0 {
        "high"
    } else if score >= 40.0 {
        "medium"
    } else {
        "low"
    }
}

/// Pattern-analysis entries derived from the same statistics.
pub fn pattern_entries(stats: &TextStatistics) -> Vec<PatternAnalysis> {
    let diversity_score = ((0.8 - stats.vocabulary_diversity).max(0.0) * 125.0).clamp(0.0, 100.0);
    let phrase_score = (stats.repeated_phrase_count as f64 * 12.0).clamp(0.0, 100.0);
    let uniformity_score = if stats.avg_sentence_length > 14.0 && stats.avg_sentence_length < 26.0 {
        60.0
    } else {
        20.0
    };

    vec![
        PatternAnalysis {
            name: "vocabulary_diversity".to_string(),
            score: diversity_score,
            severity: severity_for(diversity_score).to_string(),
            description: "Ratio of unique words to total words".to_string(),
        },
        PatternAnalysis {
            name: "stock_phrases".to_string(),
            score: phrase_score,
            severity: severity_for(phrase_score).to_string(),
            description: "Density of transitions common in machine-generated prose".to_string(),
        },
        PatternAnalysis {
            name: "sentence_uniformity".to_string(),
            score: uniformity_score,
            severity: severity_for(uniformity_score).to_string(),
            description: "Consistency of sentence length across the text".to_string(),
        },
    ]
}

/// Full offline AI-detection result.
pub fn detect_ai_offline(text: &str) -> AIDetectionResult {
    let statistics = text_statistics(text);
    let score = ai_likelihood_score(text);
    let confidence = if statistics.word_count < 50 {
        ConfidenceTier::Low
    } else {
        ConfidenceTier::Medium
    };

    AIDetectionResult {
        score,
        ai_probability: score,
        human_probability: 100.0 - score,
        confidence,
        explanation: "Heuristic estimate from vocabulary diversity, sentence structure and stock-phrase density. No external model was consulted.".to_string(),
        suggestions: vec![
            "Vary sentence openings and lengths.".to_string(),
            "Replace stock transitions with specific connectives.".to_string(),
            "Add concrete personal detail or first-hand observation.".to_string(),
        ],
        patterns: pattern_entries(&statistics),
        statistics,
    }
}

/// Full offline plagiarism result with fabricated placeholder sources.
pub fn check_plagiarism_offline(text: &str) -> ContentAnalysisResult {
    let score = plagiarism_score(text);
    let sources = if score >= 15.0 {
        fabricate_sources(text, 3)
    } else {
        Vec::new()
    };

    ContentAnalysisResult {
        score,
        explanation: "Heuristic originality estimate from phrase and vocabulary statistics. Listed sources are representative placeholders, not verified matches.".to_string(),
        suggestions: vec![
            "Quote and cite any borrowed phrasing.".to_string(),
            "Paraphrase repeated stock expressions in your own words.".to_string(),
        ],
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Furthermore, technology plays a crucial role in modern society. \
        Moreover, it is important to note that data systems delve into every domain. \
        In conclusion, the internet changed everything.";

    #[test]
    fn test_statistics_counts() {
        let stats = text_statistics(SAMPLE);
        assert_eq!(stats.sentence_count, 3);
        assert!(stats.word_count > 20);
        assert!(stats.vocabulary_diversity > 0.0 && stats.vocabulary_diversity <= 1.0);
        assert!(stats.repeated_phrase_count >= 4);
    }

    #[test]
    fn test_scores_stay_in_range() {
        for _ in 0..20 {
            let ai = ai_likelihood_score(SAMPLE);
            let plag = plagiarism_score(SAMPLE);
            assert!((0.0..=100.0).contains(&ai));
            assert!((0.0..=100.0).contains(&plag));
        }
    }

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(ai_likelihood_score(""), 0.0);
        assert_eq!(plagiarism_score("   "), 0.0);
    }

    #[test]
    fn test_offline_detection_probabilities_complement() {
        let result = detect_ai_offline(SAMPLE);
        assert!((result.ai_probability + result.human_probability - 100.0).abs() < 1e-9);
        assert_eq!(result.patterns.len(), 3);
    }

    #[test]
    fn test_offline_plagiarism_has_placeholder_sources() {
        let result = check_plagiarism_offline(SAMPLE);
        assert!((0.0..=100.0).contains(&result.score));
        for s in &result.sources {
            assert!((0.0..=100.0).contains(&s.similarity));
        }
    }
}
