// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_RULES: &str = "\
Return ONLY valid JSON. \
Do NOT include any text outside the JSON object. \
Do NOT use markdown code fences. \
Do NOT include explanations or apologies.";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("static regex"))
}

/// Fills `{name}` placeholders in a prompt template.
///
/// Substitution is a single pass over the template; substituted values are
/// never scanned for placeholders themselves.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match vars.iter().find(|(var, _)| *var == name) {
                Some((_, value)) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_all_placeholders() {
        let out = render("Q: {question}\n{context}\n{question}", &[
            ("question", "who knows Rust?"),
            ("context", "ctx"),
        ]);
        assert_eq!(out, "Q: who knows Rust?\nctx\nwho knows Rust?");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{a} {b}", &[("a", "1")]), "1 {b}");
    }

    #[test]
    fn test_render_does_not_expand_placeholders_inside_values() {
        let out = render("JD: {job_description}\nCV: {resume_text}", &[
            ("job_description", "we use {resume_text} placeholders"),
            ("resume_text", "SKILLS: Rust"),
        ]);
        assert_eq!(out, "JD: we use {resume_text} placeholders\nCV: SKILLS: Rust");
    }
}
