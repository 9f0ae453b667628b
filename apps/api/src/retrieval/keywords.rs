use std::sync::OnceLock;

use regex::Regex;

/// Filler words of recruiter queries. Carry no signal for exact matching.
const STOP_WORDS: &[&str] = &[
    "show",
    "me",
    "find",
    "with",
    "the",
    "and",
    "or",
    "a",
    "an",
    "is",
    "are",
    "has",
    "have",
    "who",
    "what",
    "where",
    "when",
    "candidates",
    "experience",
    "skills",
    "any",
    "all",
    "some",
    "looking",
    "for",
    "need",
];

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)"|(\b\w+\b)"#).expect("static regex"))
}

/// Extracts search keywords from a free-form query.
///
/// Quoted phrases are kept whole; bare words are split on word boundaries.
/// Tokens shorter than two characters and stop words are dropped, and
/// duplicates are removed keeping first-seen order.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();

    for caps in token_pattern().captures_iter(&lowered) {
        let Some(token) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let token = token.as_str().trim();
        if token.chars().count() < 2 || STOP_WORDS.contains(&token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }

    keywords
}
