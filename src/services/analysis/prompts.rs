// Prompt Templates
// Instruction strings asking the hosted model for a fixed JSON shape

/// System prompt for plagiarism analysis.
pub const PLAGIARISM_SYSTEM_PROMPT: &str = r#"You are a professional plagiarism analyst. Judge how much of the given text appears derivative of published material.

Return a JSON object with exactly these fields:
- score: number from 0-100, the percentage of the text judged derivative
- explanation: short analysis of the result
- suggestions: array of strings with concrete rewriting advice
- sources: array of objects, each with url, title, similarity (0-100), matchedText, and optionally publication and year

Only return JSON, no other text."#;

/// System prompt for AI-generated-text detection.
pub const AI_DETECTION_SYSTEM_PROMPT: &str = r#"You are a professional AI-text detection expert. Judge whether the given text was machine-generated.

Consider:
1. Fluency and naturalness of the language
2. Typical machine-generation signals (overly formal register, absent personal voice, repeated templates)
3. Logical coherence and structure

Return a JSON object with exactly these fields:
- score: number from 0-100, the likelihood the text is AI-generated
- aiProbability: number from 0-100
- humanProbability: number from 0-100
- confidence: one of "low", "medium", "high"
- explanation: short analysis of the result
- suggestions: array of strings
- patterns: array of objects with name, score (0-100), severity, description

Only return JSON, no other text."#;

/// System prompt for humanization rewriting.
pub const HUMANIZE_SYSTEM_PROMPT: &str = r#"You are an expert editor. Rewrite the given text so it reads as naturally human-written: vary sentence length, prefer contractions, replace stock transitions, keep the meaning intact.

Return a JSON object with exactly these fields:
- rewritten: the full rewritten text
- changes: array of strings describing each kind of edit made

Only return JSON, no other text."#;

pub fn plagiarism_user_prompt(text: &str) -> String {
    format!(
        "Analyze the following text for plagiarism and return the result as JSON:\n\n{}",
        text
    )
}

pub fn ai_detection_user_prompt(text: &str) -> String {
    format!(
        "Analyze whether the following text was AI-generated and return the result as JSON:\n\n{}",
        text
    )
}

pub fn humanize_user_prompt(text: &str, tone: &str) -> String {
    format!(
        "Rewrite the following text in a {} tone so it reads as human-written, and return the result as JSON:\n\n{}",
        tone, text
    )
}
