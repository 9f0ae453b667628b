pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ingest::handlers as ingest;
use crate::matching::handlers as matching;
use crate::retrieval::handlers as retrieval;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/stats", get(ingest::handle_stats))
        // Resume ingestion
        .route("/api/v1/resumes", get(ingest::handle_list_resumes))
        .route("/api/v1/resumes/segment", post(ingest::handle_segment))
        .route("/api/v1/resumes/analyze", post(ingest::handle_analyze))
        .route("/api/v1/resumes/:id", get(ingest::handle_get_resume))
        // Retrieval
        .route("/api/v1/search", post(retrieval::handle_search))
        .route("/api/v1/ask", post(retrieval::handle_ask))
        // Matching
        .route("/api/v1/match", post(matching::handle_match))
        .with_state(state)
}
