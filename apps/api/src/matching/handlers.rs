use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::matching::matcher::{match_top_candidates, MatchResult};
use crate::matching::scorer::LlmResumeScorer;
use crate::matching::MatchError;
use crate::retrieval::HybridRetriever;
use crate::state::AppState;

const MAX_CANDIDATES: usize = 50;

fn default_candidates() -> usize {
    10
}

#[derive(Deserialize)]
pub struct MatchRequest {
    pub job_description: String,
    #[serde(default = "default_candidates")]
    pub n_candidates: usize,
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub results: Vec<MatchResult>,
    pub count: usize,
}

/// POST /api/v1/match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    if req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description must not be empty".to_string(),
        ));
    }
    let n = req.n_candidates.clamp(1, MAX_CANDIDATES);

    let corpus = state.corpus().await?;
    if corpus.is_empty() {
        return Err(MatchError::EmptyCorpus.into());
    }
    let retriever = HybridRetriever::new(&corpus, Some(state.index.as_ref()));
    let session = state.llm.session();
    let scorer = LlmResumeScorer::new(&session);

    let results = match_top_candidates(
        &corpus,
        Some(&retriever),
        &scorer,
        &req.job_description,
        n,
        state.config.match_pacing,
        |done, total| debug!(done, total, "candidate scored"),
    )
    .await?;

    Ok(Json(MatchResponse {
        count: results.len(),
        results,
    }))
}
