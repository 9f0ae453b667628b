//! Ingest: raw document → text → sections → persisted [`ResumeRecord`].
//!
//! [`ResumeRecord`]: crate::models::resume::ResumeRecord

pub mod extract;
pub mod handlers;
pub mod llm_segmenter;
pub mod normalize;
pub mod pipeline;
mod prompts;
pub mod segmenter;

use thiserror::Error;

use crate::corpus::CorpusError;
use crate::ingest::extract::ExtractError;
use crate::llm_client::LlmError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Could not extract text: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Could not extract text from document")]
    EmptyText,

    #[error("LLM processing failed: {0}")]
    LlmProcessing(#[source] LlmError),

    #[error("Source directory not found: {0}")]
    MissingSource(std::path::PathBuf),

    #[error("No documents found in {0}")]
    NoDocuments(std::path::PathBuf),

    #[error("LLM segmentation requested but no LLM provider is configured")]
    LlmUnavailable,

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}
