//! Deterministic text cleanup applied before segmentation.

use std::sync::OnceLock;

use regex::Regex;

fn horizontal_ws() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").expect("static regex"))
}

fn blank_line_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"))
}

/// Normalizes extracted resume text.
///
/// - `\r\n` and lone `\r` become `\n`
/// - runs of spaces/tabs collapse to a single space (newlines untouched)
/// - three or more consecutive newlines collapse to exactly two
/// - leading/trailing whitespace is trimmed
///
/// Total and idempotent.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = horizontal_ws().replace_all(&unified, " ");
    let paragraphs = blank_line_run().replace_all(&collapsed, "\n\n");
    paragraphs.trim().to_string()
}

fn any_ws() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z])([A-Z])").expect("static regex"))
}

fn space_before_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+,").expect("static regex"))
}

fn space_before_period() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+\.").expect("static regex"))
}

/// Flattens text into a single ASCII line for the LLM segmenter.
///
/// PDF extraction often glues a heading onto the next sentence
/// (`"Python developerExperience"`); a sentence break is inserted at every
/// lowercase→uppercase boundary so the model sees two clauses.
pub fn clean_for_llm(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let ascii: String = text.chars().filter(char::is_ascii).collect();
    let flat = any_ws().replace_all(&ascii, " ");
    let split = camel_boundary().replace_all(&flat, "$1. $2");
    let commas = space_before_comma().replace_all(&split, ",");
    let periods = space_before_period().replace_all(&commas, ".");
    periods.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings_unified() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_horizontal_whitespace_collapsed() {
        assert_eq!(normalize("Python \t\t  Rust\n  Go"), "Python Rust\n Go");
    }

    #[test]
    fn test_blank_line_runs_capped_at_one() {
        let out = normalize("Summary\n\n\n\n\nExperience");
        assert_eq!(out, "Summary\n\nExperience");
        assert!(!out.contains("\n\n\n"));
    }

    #[test]
    fn test_crlf_blank_runs_capped() {
        let out = normalize("a\r\n\r\n\r\n\r\nb");
        assert_eq!(out, "a\n\nb");
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(normalize("  \n\t hello \n\n "), "hello");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "   ",
            "a\r\n\r\n\r\n b \t c\n\n\n\n",
            "Skills\n\tPython\r\rRust  \n \n \n \nGo",
            "\n\n\nx\n\n\n",
            "line \n\n\n \n\n\n next",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(clean_for_llm(""), "");
    }

    #[test]
    fn test_clean_for_llm_flattens_and_splits() {
        let out = clean_for_llm("Senior developerExperience\n\nAcme  Corp , Berlin .");
        assert_eq!(out, "Senior developer. Experience Acme Corp, Berlin.");
    }

    #[test]
    fn test_clean_for_llm_drops_non_ascii() {
        assert_eq!(clean_for_llm("Café • Zürich"), "Caf Zrich");
    }
}
