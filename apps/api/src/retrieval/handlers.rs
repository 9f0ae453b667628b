use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::retrieval::answer::{answer_question, Answer};
use crate::retrieval::{HybridRetriever, SearchMatch};
use crate::state::AppState;

const MAX_RESULTS: usize = 50;

fn default_k() -> usize {
    5
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchMatch>,
    pub count: usize,
}

/// POST /api/v1/search
pub async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }
    let corpus = state.corpus_or_empty().await?;
    let retriever = HybridRetriever::new(&corpus, Some(state.index.as_ref()));
    let results = retriever.search(&req.query, req.k.min(MAX_RESULTS)).await;
    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default = "default_k")]
    pub n: usize,
}

/// POST /api/v1/ask
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<Answer>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::Validation("question must not be empty".to_string()));
    }
    let corpus = state.corpus_or_empty().await?;
    let retriever = HybridRetriever::new(&corpus, Some(state.index.as_ref()));
    let session = state.llm.session();
    let answer = answer_question(&retriever, &session, &req.question, req.n.min(MAX_RESULTS)).await;
    Ok(Json(answer))
}
