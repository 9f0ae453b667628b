use std::sync::Arc;

use crate::config::Config;
use crate::corpus::{CorpusError, ResumeStore};
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::resume::ResumeRecord;
use crate::retrieval::index::VectorIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: ResumeStore,
    pub llm: LlmClient,
    /// Vector index collaborator. Default: `FileVectorIndex` at `config.index_path`.
    pub index: Arc<dyn VectorIndex>,
}

/// Runs blocking filesystem work on the blocking pool.
pub async fn run_blocking<T, E, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    AppError: From<E>,
{
    let result = tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(result?)
}

impl AppState {
    /// Loads the corpus off the async runtime.
    pub async fn corpus(&self) -> Result<Vec<ResumeRecord>, AppError> {
        let store = self.store.clone();
        run_blocking(move || store.load_all()).await
    }

    /// Like [`corpus`](Self::corpus), but a missing directory reads as empty.
    pub async fn corpus_or_empty(&self) -> Result<Vec<ResumeRecord>, AppError> {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.load_all()).await {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(CorpusError::MissingDirectory(_))) => Ok(Vec::new()),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(AppError::Internal(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_blocking_maps_store_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());

        let ids = run_blocking({
            let store = store.clone();
            move || store.ids()
        })
        .await
        .unwrap();
        assert!(ids.is_empty());

        let missing = run_blocking(move || store.load("absent")).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
