use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named semantic field of a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Summary,
    Experience,
    Education,
    Skills,
    Certifications,
    Other,
}

impl SectionName {
    /// The five target sections, in composition order. `Other` is excluded.
    pub const NAMED: [SectionName; 5] = [
        SectionName::Summary,
        SectionName::Experience,
        SectionName::Education,
        SectionName::Skills,
        SectionName::Certifications,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionName::Summary => "summary",
            SectionName::Experience => "experience",
            SectionName::Education => "education",
            SectionName::Skills => "skills",
            SectionName::Certifications => "certifications",
            SectionName::Other => "other",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which segmenter produced a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterKind {
    #[default]
    RuleBased,
    Llm,
}

/// One role from the experience section.
///
/// Fields are read leniently: numbers become strings and a lone string is a
/// one-item responsibility list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::list", skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<Vec<String>>,
}

/// One degree from the education section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    /// Kept as raw JSON: extractors emit both `"3.8"` and `3.8`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<Value>,
}

/// Flattens any JSON value into display text. Null is empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => join_texts(items.iter()),
        Value::Object(map) => join_texts(map.values()),
        other => other.to_string(),
    }
}

fn join_texts<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values
        .map(value_text)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::value_text;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.map(|v| value_text(&v)).filter(|s| !s.is_empty()))
    }

    pub fn list<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        let items = match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(items)) => items.iter().map(value_text).collect::<Vec<_>>(),
            Some(other) => vec![value_text(&other)],
        };
        Ok(Some(items.into_iter().filter(|s| !s.is_empty()).collect()))
    }
}

/// An element of a list-shaped section: either a loose string or a structured entry.
///
/// `Plain` is tried first so bare strings never get captured by a permissive `E`.
/// Anything `E` rejects is kept as `Raw` instead of failing the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListItem<E> {
    Plain(String),
    Structured(E),
    Raw(Value),
}

/// Content of a single section.
///
/// Rule-based segmentation produces `Text`; LLM segmentation produces `Items`
/// for flat lists and `Entries` when at least one element is structured.
/// Any other shape (an object, a number) is kept as `Raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionContent<E> {
    Text(String),
    Items(Vec<String>),
    Entries(Vec<ListItem<E>>),
    Raw(Value),
}

impl<E> SectionContent<E> {
    /// Empty text, or an empty list. Persisted output omits empty sections.
    pub fn is_empty(&self) -> bool {
        match self {
            SectionContent::Text(text) => text.trim().is_empty(),
            SectionContent::Items(items) => items.is_empty(),
            SectionContent::Entries(entries) => entries.is_empty(),
            SectionContent::Raw(value) => value_text(value).is_empty(),
        }
    }
}

/// Free-form sections carry no schema for their structured elements.
pub type LooseSection = SectionContent<Value>;

/// All recognized sections of a resume. `None` means "nothing found".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LooseSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<SectionContent<ExperienceEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<SectionContent<EducationEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<LooseSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications: Option<LooseSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<LooseSection>,
}

impl Sections {
    /// Builds sections from a segmenter's `{section: text}` map. Empty texts are dropped.
    pub fn from_text_map(map: &BTreeMap<SectionName, String>) -> Self {
        let text = |name: SectionName| {
            map.get(&name)
                .filter(|t| !t.trim().is_empty())
                .cloned()
        };
        Sections {
            summary: text(SectionName::Summary).map(SectionContent::Text),
            experience: text(SectionName::Experience).map(SectionContent::Text),
            education: text(SectionName::Education).map(SectionContent::Text),
            skills: text(SectionName::Skills).map(SectionContent::Text),
            certifications: text(SectionName::Certifications).map(SectionContent::Text),
            other: text(SectionName::Other).map(SectionContent::Text),
        }
    }

    /// Replaces every empty section with `None`.
    pub fn prune(mut self) -> Self {
        fn keep<E>(section: Option<SectionContent<E>>) -> Option<SectionContent<E>> {
            section.filter(|s| !s.is_empty())
        }
        self.summary = keep(self.summary);
        self.experience = keep(self.experience);
        self.education = keep(self.education);
        self.skills = keep(self.skills);
        self.certifications = keep(self.certifications);
        self.other = keep(self.other);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clone().prune() == Sections::default()
    }

    /// Names of the sections that hold content, in declaration order.
    pub fn present(&self) -> Vec<SectionName> {
        let mut names = Vec::new();
        let checks = [
            (SectionName::Summary, self.summary.as_ref().map(|s| s.is_empty())),
            (SectionName::Experience, self.experience.as_ref().map(|s| s.is_empty())),
            (SectionName::Education, self.education.as_ref().map(|s| s.is_empty())),
            (SectionName::Skills, self.skills.as_ref().map(|s| s.is_empty())),
            (
                SectionName::Certifications,
                self.certifications.as_ref().map(|s| s.is_empty()),
            ),
            (SectionName::Other, self.other.as_ref().map(|s| s.is_empty())),
        ];
        for (name, empty) in checks {
            if empty == Some(false) {
                names.push(name);
            }
        }
        names
    }

    /// The skills section as a flat list.
    ///
    /// Free-text skills are split on line breaks, commas, semicolons and bullets.
    /// Blank items are discarded.
    pub fn skills_list(&self) -> Vec<String> {
        loose_items(self.skills.as_ref())
    }

    pub fn certifications_list(&self) -> Vec<String> {
        loose_items(self.certifications.as_ref())
    }
}

fn loose_items(section: Option<&LooseSection>) -> Vec<String> {
    let items: Vec<String> = match section {
        None => Vec::new(),
        Some(SectionContent::Items(items)) => items.clone(),
        Some(SectionContent::Text(text)) => split_free_text(text),
        Some(SectionContent::Entries(entries)) => entries
            .iter()
            .map(|entry| match entry {
                ListItem::Plain(s) => s.clone(),
                ListItem::Structured(value) | ListItem::Raw(value) => value_text(value),
            })
            .collect(),
        Some(SectionContent::Raw(value)) => split_free_text(&value_text(value)),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn split_free_text(text: &str) -> Vec<String> {
    text.split(['\n', ',', ';', '•', '·'])
        .map(|s| s.trim().trim_start_matches(['-', '*']).trim().to_string())
        .collect()
}

/// A processed resume, persisted one file per source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    /// Source file stem. Reassigned from the file name whenever a record is loaded.
    #[serde(default)]
    pub id: String,
    #[serde(alias = "source_txt", default)]
    pub source_file: String,
    #[serde(default)]
    pub segmenter: SegmenterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sections: Sections,
}

impl ResumeRecord {
    pub fn new(
        id: impl Into<String>,
        source_file: impl Into<String>,
        segmenter: SegmenterKind,
        sections: Sections,
    ) -> Self {
        Self {
            id: id.into(),
            source_file: source_file.into(),
            segmenter,
            processed_at: Some(Utc::now()),
            sections: sections.prune(),
        }
    }
}
