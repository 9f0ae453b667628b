use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::corpus::CorpusError;
use crate::ingest::IngestError;
use crate::matching::MatchError;
use crate::retrieval::index::IndexError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A corpus-wide precondition failed (no source directory, no records).
    #[error("Nothing to do: {0}")]
    NothingToDo(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<CorpusError> for AppError {
    fn from(e: CorpusError) -> Self {
        match e {
            CorpusError::MissingDirectory(_) | CorpusError::Empty(_) => {
                AppError::NothingToDo(e.to_string())
            }
            CorpusError::NotFound(id) => AppError::NotFound(format!("Resume {id} not found")),
            CorpusError::InvalidId(_) => AppError::Validation(e.to_string()),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::MissingSource(_) | IngestError::NoDocuments(_) => {
                AppError::NothingToDo(e.to_string())
            }
            IngestError::Corpus(inner) => inner.into(),
            IngestError::LlmProcessing(_) | IngestError::LlmUnavailable => {
                AppError::Llm(e.to_string())
            }
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<MatchError> for AppError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::EmptyCorpus => AppError::NothingToDo(e.to_string()),
        }
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::NoTexts => AppError::NothingToDo(e.to_string()),
            other => AppError::Index(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NothingToDo(msg) => (StatusCode::CONFLICT, "NOTHING_TO_DO", msg.clone()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Index(msg) => {
                tracing::error!("Index error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INDEX_ERROR",
                    "A vector index error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
