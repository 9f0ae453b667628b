//! Resume scoring: the scoring collaborator contract and its LLM backend.
//!
//! A scorer never fails: collaborator errors become a zero-score
//! [`ScoreCard`] so one bad candidate cannot abort a ranking.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::llm_client::prompts::{render, JSON_ONLY_RULES};
use crate::llm_client::provider::ErrorKind;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{complete_json, Completion, CompletionRequest, LlmError};
use crate::matching::prompts::{SCORING_PROMPT_TEMPLATE, SCORING_SYSTEM};

pub const DEFAULT_SCORE: u8 = 50;
pub const MISSING_REASONING: &str = "Unable to generate detailed reasoning.";

const SCORING_TEMPERATURE: f32 = 0.2;
const SCORING_MAX_TOKENS: u32 = 800;

// ────────────────────────────────────────────────────────────────────────────
// Output data model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub score: u8, // 0-100
    pub summary: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub reasoning: String,
}

/// Reply shape as the model sends it. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct RawScore {
    #[serde(default)]
    score: Option<Value>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    strengths: Option<Value>,
    #[serde(default)]
    gaps: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

impl ScoreCard {
    /// Fills every missing field with its default.
    pub fn from_raw(raw: RawScore) -> Self {
        let score = raw.score.as_ref().and_then(parse_score).unwrap_or(DEFAULT_SCORE);
        ScoreCard {
            score,
            summary: non_blank(raw.summary).unwrap_or_else(|| format!("Match score: {score}/100")),
            strengths: string_list(raw.strengths),
            gaps: string_list(raw.gaps),
            reasoning: non_blank(raw.reasoning).unwrap_or_else(|| MISSING_REASONING.to_string()),
        }
    }

    /// Placeholder for a candidate whose reply never parsed.
    pub fn unparseable(error: &str) -> Self {
        ScoreCard {
            score: 0,
            summary: "Error parsing AI response".to_string(),
            strengths: Vec::new(),
            gaps: vec!["Could not analyze resume".to_string()],
            reasoning: format!("JSON parsing error: {}", truncate(error, 50)),
        }
    }

    /// Placeholder for a candidate whose scoring call failed outright.
    pub fn failed(error: &str) -> Self {
        ScoreCard {
            score: 0,
            summary: "Error during analysis".to_string(),
            strengths: Vec::new(),
            gaps: vec!["Analysis failed".to_string()],
            reasoning: format!("Error: {}", truncate(error, 100)),
        }
    }
}

/// Integers, floats and numeric strings are accepted; rounded and clamped to 0-100.
fn parse_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches("/100").trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}

fn string_list(value: Option<Value>) -> Vec<String> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) => vec![Value::String(s)],
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ResumeScorer: Send + Sync {
    async fn score(&self, resume_text: &str, job_description: &str) -> ScoreCard;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmResumeScorer
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmResumeScorer<'a> {
    llm: &'a dyn Completion,
    retry: RetryPolicy,
}

impl<'a> LlmResumeScorer<'a> {
    /// Two attempts, one second apart.
    pub fn new(llm: &'a dyn Completion) -> Self {
        Self::with_retry(llm, RetryPolicy::new(2, vec![Duration::from_secs(1)]))
    }

    pub fn with_retry(llm: &'a dyn Completion, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }
}

#[async_trait]
impl<'a> ResumeScorer for LlmResumeScorer<'a> {
    async fn score(&self, resume_text: &str, job_description: &str) -> ScoreCard {
        let system = format!("{SCORING_SYSTEM}\n\n{JSON_ONLY_RULES}");
        let user = render(
            SCORING_PROMPT_TEMPLATE,
            &[
                ("job_description", job_description),
                ("resume_text", resume_text),
            ],
        );
        let request = CompletionRequest {
            system: &system,
            user: &user,
            temperature: SCORING_TEMPERATURE,
            max_tokens: SCORING_MAX_TOKENS,
        };

        match complete_json::<RawScore>(self.llm, &request, &self.retry).await {
            Ok(raw) => ScoreCard::from_raw(raw),
            Err(e) => {
                warn!(error = %e, "candidate scoring failed");
                placeholder_for(&e)
            }
        }
    }
}

fn placeholder_for(error: &LlmError) -> ScoreCard {
    match error.kind() {
        ErrorKind::Format => ScoreCard::unparseable(&error.to_string()),
        _ => ScoreCard::failed(&error.to_string()),
    }
}
