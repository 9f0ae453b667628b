//! Rule-based section segmentation.
//!
//! Two independent strategies, combined per section with "first non-empty wins":
//!
//! 1. **Line scan**: walk the text line by line; a line whose lower-cased,
//!    trimmed form exactly equals a known heading switches the current bucket.
//! 2. **Regex fallback**: for a named section the scan left empty, search the
//!    whole text for a heading word followed by `:`/whitespace and capture up to
//!    the next line that looks like a heading.
//!
//! The fallback boundary is approximate. Matching is
//! case-insensitive throughout, so *any* line starting with two letters (or a
//! letter and a space) ends the capture, while lines starting with a digit,
//! bullet or punctuation never do. A heading written as `• EDUCATION` therefore
//! bleeds into the preceding capture.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::resume::SectionName;

/// Exact-match headings recognized by the line scan.
const HEADING_SYNONYMS: [(SectionName, &[&str]); 5] = [
    (
        SectionName::Summary,
        &["summary", "professional summary", "profile", "overview"],
    ),
    (
        SectionName::Experience,
        &[
            "experience",
            "professional experience",
            "work experience",
            "employment",
        ],
    ),
    (
        SectionName::Education,
        &["education", "education and training", "academic"],
    ),
    (
        SectionName::Skills,
        &["skills", "skill highlights", "core qualifications", "competencies"],
    ),
    (SectionName::Certifications, &["certifications", "licenses"]),
];

/// Heading alternations used by the regex fallback. Broader than the line-scan
/// set: they match anywhere in the text, not just on a line of their own.
const FALLBACK_HEADINGS: [(SectionName, &str); 5] = [
    (SectionName::Summary, "summary|objective|profile|overview"),
    (SectionName::Experience, "experience|work history|employment"),
    (
        SectionName::Education,
        "education|academic|education and training",
    ),
    (
        SectionName::Skills,
        "skills|competencies|technologies|core qualifications",
    ),
    (SectionName::Certifications, "certifications?|licenses?"),
];

/// How a section's content was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", content = "content", rename_all = "snake_case")]
pub enum Resolution {
    Unresolved,
    LineScan(String),
    RegexFallback(String),
}

impl Resolution {
    pub fn content(&self) -> Option<&str> {
        match self {
            Resolution::Unresolved => None,
            Resolution::LineScan(text) | Resolution::RegexFallback(text) => Some(text),
        }
    }
}

/// Returns the section a line introduces, if the line is a recognized heading.
pub fn detect_heading(line: &str) -> Option<SectionName> {
    let normalized = line.trim().to_lowercase();
    HEADING_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| *s == normalized))
        .map(|(section, _)| *section)
}

/// First strategy: bucket every non-blank line under the most recent heading.
///
/// Lines before any heading land in `Other`. Heading lines themselves are not
/// kept. Every section, including empty ones, is present in the result.
pub fn line_scan(text: &str) -> BTreeMap<SectionName, String> {
    let mut buckets: BTreeMap<SectionName, Vec<&str>> = BTreeMap::new();
    let mut current = SectionName::Other;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(section) = detect_heading(line) {
            current = section;
            continue;
        }
        buckets.entry(current).or_default().push(line);
    }

    SectionName::NAMED
        .iter()
        .chain(std::iter::once(&SectionName::Other))
        .map(|section| {
            let joined = buckets
                .get(section)
                .map(|lines| lines.join("\n"))
                .unwrap_or_default();
            (*section, joined.trim().to_string())
        })
        .collect()
}

fn fallback_patterns() -> &'static [(SectionName, Regex)] {
    static PATTERNS: OnceLock<Vec<(SectionName, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        FALLBACK_HEADINGS
            .iter()
            .map(|(section, alternation)| {
                let re = Regex::new(&format!(r"(?i)(?:{alternation})[\s:]+"))
                    .expect("static regex");
                (*section, re)
            })
            .collect()
    })
}

fn heading_like_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\n[A-Z][a-z ]").expect("static regex"))
}

/// Second strategy: capture the text following the first heading word for `section`.
///
/// Returns the trimmed capture, or `None` when no heading word matches or the
/// capture is blank. Always `None` for `Other`.
pub fn regex_fallback(text: &str, section: SectionName) -> Option<String> {
    let (_, pattern) = fallback_patterns().iter().find(|(s, _)| *s == section)?;
    let heading = pattern.find(text)?;
    let rest = &text[heading.end()..];
    let end = heading_like_line()
        .find(rest)
        .map(|boundary| boundary.start())
        .unwrap_or(rest.len());
    let captured = rest[..end].trim();
    (!captured.is_empty()).then(|| captured.to_string())
}

/// Resolves every section: line scan first, regex fallback for empty named sections.
pub fn resolve_sections(text: &str) -> BTreeMap<SectionName, Resolution> {
    let scanned = line_scan(text);
    let mut resolved = BTreeMap::new();

    for (section, content) in scanned {
        let resolution = if !content.is_empty() {
            Resolution::LineScan(content)
        } else if section == SectionName::Other {
            Resolution::Unresolved
        } else {
            regex_fallback(text, section)
                .map(Resolution::RegexFallback)
                .unwrap_or(Resolution::Unresolved)
        };
        resolved.insert(section, resolution);
    }

    resolved
}

/// Segments normalized resume text into `{section: content}`.
///
/// Sections with no content are omitted; `Other` is kept when non-empty.
pub fn segment(text: &str) -> BTreeMap<SectionName, String> {
    resolve_sections(text)
        .into_iter()
        .filter_map(|(section, resolution)| {
            resolution
                .content()
                .map(|content| (section, content.to_string()))
        })
        .collect()
}
