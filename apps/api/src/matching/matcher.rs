//! Candidate matching: retrieve, compose, score one at a time, rank.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::matching::scorer::{ResumeScorer, ScoreCard};
use crate::matching::MatchError;
use crate::models::resume::ResumeRecord;
use crate::retrieval::compose::{compose, ComposeOptions};
use crate::retrieval::index::IndexError;
use crate::retrieval::HybridRetriever;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub candidate_id: String,
    pub score: u8,
    pub summary: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub reasoning: String,
    /// Copied from the record at scoring time.
    pub skills: Vec<String>,
}

impl MatchResult {
    fn new(record: &ResumeRecord, card: ScoreCard) -> Self {
        MatchResult {
            candidate_id: record.id.clone(),
            score: card.score,
            summary: card.summary,
            strengths: card.strengths,
            gaps: card.gaps,
            reasoning: card.reasoning,
            skills: record.sections.skills_list(),
        }
    }
}

/// Narrows the corpus to the ids worth scoring.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidate_ids(&self, query: &str, n: usize) -> Result<Vec<String>, IndexError>;
}

#[async_trait]
impl<'a> CandidateSource for HybridRetriever<'a> {
    async fn candidate_ids(&self, query: &str, n: usize) -> Result<Vec<String>, IndexError> {
        Ok(self
            .search(query, n)
            .await
            .into_iter()
            .map(|m| m.id)
            .collect())
    }
}

/// Picks up to `n` records: the source's ids that exist in the corpus, or the
/// first `n` in canonical order when the source fails or finds nothing.
async fn select_candidates<'c>(
    corpus: &'c [ResumeRecord],
    source: Option<&dyn CandidateSource>,
    job_description: &str,
    n: usize,
) -> Vec<&'c ResumeRecord> {
    let retrieved = match source {
        Some(source) => match source.candidate_ids(job_description, n).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "candidate retrieval failed, falling back to corpus order");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let mut seen = HashSet::new();
    let selected: Vec<&ResumeRecord> = retrieved
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| corpus.iter().find(|r| &r.id == id))
        .take(n)
        .collect();

    if selected.is_empty() {
        corpus.iter().take(n).collect()
    } else {
        selected
    }
}

/// Scores up to `n` candidates against `job_description`, best first.
///
/// Scoring is strictly sequential with `pacing` between calls. `on_progress`
/// receives `(done, total)` after each candidate. Ties keep processing order.
pub async fn match_top_candidates(
    corpus: &[ResumeRecord],
    source: Option<&dyn CandidateSource>,
    scorer: &dyn ResumeScorer,
    job_description: &str,
    n: usize,
    pacing: Duration,
    mut on_progress: impl FnMut(usize, usize) + Send,
) -> Result<Vec<MatchResult>, MatchError> {
    if corpus.is_empty() {
        return Err(MatchError::EmptyCorpus);
    }

    let candidates: Vec<(&ResumeRecord, String)> =
        select_candidates(corpus, source, job_description, n)
            .await
            .into_iter()
            .map(|record| (record, compose(&record.sections, ComposeOptions::SCORING)))
            .filter(|(record, text)| {
                let keep = !text.trim().is_empty();
                if !keep {
                    warn!(id = %record.id, "skipping candidate with empty resume text");
                }
                keep
            })
            .collect();

    let total = candidates.len();
    info!(total, n, "scoring candidates");

    let mut results = Vec::with_capacity(total);
    for (i, (record, text)) in candidates.into_iter().enumerate() {
        if i > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        let card = scorer.score(&text, job_description).await;
        results.push(MatchResult::new(record, card));
        on_progress(i + 1, total);
    }

    results.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(results)
}
