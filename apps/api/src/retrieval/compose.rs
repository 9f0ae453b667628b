//! Renders a structured resume back into one flat text blob.
//!
//! Layout, sections separated by a blank line:
//!
//! ```text
//! SUMMARY: <summary>
//!
//! EXPERIENCE:
//! - <title> at <company> (<dates>): <resp1>; <resp2>
//!
//! EDUCATION:
//! - <degree> in <field> from <institution>
//!
//! SKILLS: a, b, c
//!
//! CERTIFICATIONS: x, y
//! ```

use serde_json::Value;

use crate::models::resume::{
    value_text, EducationEntry, ExperienceEntry, ListItem, LooseSection, SectionContent, Sections,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Responsibilities rendered per experience entry.
    pub max_responsibilities: usize,
}

impl ComposeOptions {
    /// Used for indexing and retrieval.
    pub const RETRIEVAL: ComposeOptions = ComposeOptions {
        max_responsibilities: 3,
    };

    /// Used when scoring a candidate against a job description.
    pub const SCORING: ComposeOptions = ComposeOptions {
        max_responsibilities: 5,
    };
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self::RETRIEVAL
    }
}

pub fn compose(sections: &Sections, options: ComposeOptions) -> String {
    let mut parts = Vec::new();

    if let Some(summary) = sections.summary.as_ref().and_then(loose_text) {
        parts.push(format!("SUMMARY: {summary}"));
    }

    if let Some(experience) = &sections.experience {
        let lines = render_list(experience, |entry| render_experience(entry, options));
        if !lines.is_empty() {
            parts.push(format!("EXPERIENCE:\n{}", lines.join("\n")));
        }
    }

    if let Some(education) = &sections.education {
        let lines = render_list(education, render_education);
        if !lines.is_empty() {
            parts.push(format!("EDUCATION:\n{}", lines.join("\n")));
        }
    }

    let skills = sections.skills_list();
    if !skills.is_empty() {
        parts.push(format!("SKILLS: {}", skills.join(", ")));
    }

    let certifications = sections.certifications_list();
    if !certifications.is_empty() {
        parts.push(format!("CERTIFICATIONS: {}", certifications.join(", ")));
    }

    parts.join("\n\n")
}

/// Free text stays verbatim; list shapes become `- item` lines.
fn render_list<E>(section: &SectionContent<E>, render: impl Fn(&E) -> Option<String>) -> Vec<String> {
    match section {
        SectionContent::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text.to_string()]
            }
        }
        SectionContent::Items(items) => items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| format!("- {s}"))
            .collect(),
        SectionContent::Entries(entries) => entries
            .iter()
            .filter_map(|entry| match entry {
                ListItem::Plain(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                ListItem::Plain(_) => None,
                ListItem::Structured(e) => render(e),
                ListItem::Raw(value) => non_empty(value_text(value)),
            })
            .map(|line| format!("- {line}"))
            .collect(),
        SectionContent::Raw(Value::Array(items)) => items
            .iter()
            .filter_map(|item| non_empty(value_text(item)))
            .map(|line| format!("- {line}"))
            .collect(),
        SectionContent::Raw(value) => non_empty(value_text(value)).into_iter().collect(),
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn render_experience(entry: &ExperienceEntry, options: ComposeOptions) -> Option<String> {
    let mut line = String::new();
    if let Some(title) = present(&entry.title) {
        line.push_str(title);
    }
    if let Some(company) = present(&entry.company) {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str("at ");
        line.push_str(company);
    }
    if let Some(dates) = present(&entry.dates) {
        line.push_str(&format!(" ({dates})"));
    }

    let responsibilities: Vec<&str> = entry
        .responsibilities
        .iter()
        .flatten()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .take(options.max_responsibilities)
        .collect();
    if !responsibilities.is_empty() {
        line.push_str(": ");
        line.push_str(&responsibilities.join("; "));
    }

    let line = line.trim().to_string();
    (!line.is_empty()).then_some(line)
}

fn render_education(entry: &EducationEntry) -> Option<String> {
    let mut line = present(&entry.degree).unwrap_or_default().to_string();
    if let Some(field) = present(&entry.field) {
        line.push_str(&format!(" in {field}"));
    }
    if let Some(institution) = present(&entry.institution) {
        line.push_str(&format!(" from {institution}"));
    }
    let line = line.trim().to_string();
    (!line.is_empty()).then_some(line)
}

fn loose_text(section: &LooseSection) -> Option<String> {
    let text = match section {
        SectionContent::Text(text) => text.trim().to_string(),
        SectionContent::Items(items) => items.join(" "),
        SectionContent::Entries(entries) => entries
            .iter()
            .map(|entry| match entry {
                ListItem::Plain(s) => s.clone(),
                ListItem::Structured(value) | ListItem::Raw(value) => value_text(value),
            })
            .collect::<Vec<_>>()
            .join(" "),
        SectionContent::Raw(value) => value_text(value),
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}
