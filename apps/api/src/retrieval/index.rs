//! Vector-index collaborator and the file-backed implementation.
//!
//! [`FileVectorIndex`] keeps every vector in one JSON file and answers queries
//! by brute-force squared-L2 scan.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::corpus::write_atomic;
use crate::models::resume::ResumeRecord;
use crate::retrieval::compose::{compose, ComposeOptions};
use crate::retrieval::embedding::{EmbedError, Embedder};

/// Default number of records indexed by [`build_index`].
pub const DEFAULT_INDEX_LIMIT: usize = 400;
/// Metadata key that carries the record file name.
pub const SOURCE_FILE_KEY: &str = "source_file";
const EMBED_BATCH: usize = 32;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Vector index has not been built yet ({0})")]
    NotBuilt(PathBuf),

    #[error("No valid resume texts found")]
    NoTexts,

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Embedding dimension mismatch: index has {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index file is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A document to index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// One nearest-neighbor result. Smaller distance is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub text: String,
    pub metadata: Map<String, Value>,
    pub distance: f32,
}

impl IndexHit {
    /// Record id recovered from the `source_file` metadata, extension stripped.
    pub fn record_id(&self) -> Option<String> {
        let source = self.metadata.get(SOURCE_FILE_KEY)?.as_str()?;
        let id = source.strip_suffix(".json").unwrap_or(source);
        (!id.is_empty()).then(|| id.to_string())
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Adds documents, replacing any existing entry with the same id.
    async fn upsert(&self, documents: Vec<IndexDocument>) -> Result<(), IndexError>;

    /// Replaces the whole index with `documents`.
    async fn replace_all(&self, documents: Vec<IndexDocument>) -> Result<(), IndexError>;

    /// Up to `k` nearest documents to `text`, closest first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<IndexHit>, IndexError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    text: String,
    metadata: Map<String, Value>,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredIndex {
    model: String,
    dimensions: usize,
    entries: Vec<StoredEntry>,
}

struct Loaded {
    modified: Option<SystemTime>,
    index: Arc<StoredIndex>,
}

pub struct FileVectorIndex {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    cache: RwLock<Option<Loaded>>,
}

impl FileVectorIndex {
    pub fn new(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            path: path.into(),
            embedder,
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    async fn modified(&self) -> Option<SystemTime> {
        tokio::fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
    }

    /// Returns the on-disk index, reloading it when the file changed since the
    /// last read (another process may have rebuilt it).
    async fn load(&self) -> Result<Arc<StoredIndex>, IndexError> {
        if !self.exists() {
            return Err(IndexError::NotBuilt(self.path.clone()));
        }
        let modified = self.modified().await;
        if let Some(loaded) = self.cache.read().await.as_ref() {
            if loaded.modified == modified {
                return Ok(loaded.index.clone());
            }
        }

        let bytes = tokio::fs::read(&self.path).await?;
        let index: Arc<StoredIndex> = Arc::new(serde_json::from_slice(&bytes)?);
        debug!(path = %self.path.display(), entries = index.entries.len(), "vector index loaded");
        *self.cache.write().await = Some(Loaded {
            modified,
            index: index.clone(),
        });
        Ok(index)
    }

    async fn embed_documents(
        &self,
        documents: Vec<IndexDocument>,
    ) -> Result<Vec<StoredEntry>, IndexError> {
        let mut entries = Vec::with_capacity(documents.len());
        for batch in documents.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(EmbedError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                ))
                .into());
            }
            for (doc, vector) in batch.iter().zip(vectors) {
                entries.push(StoredEntry {
                    id: doc.id.clone(),
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    vector,
                });
            }
        }
        Ok(entries)
    }

    async fn write(&self, entries: Vec<StoredEntry>) -> Result<(), IndexError> {
        let dimensions = entries.first().map(|e| e.vector.len()).unwrap_or(0);
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimensions) {
            return Err(IndexError::DimensionMismatch {
                expected: dimensions,
                got: bad.vector.len(),
            });
        }
        let index = StoredIndex {
            model: self.embedder.model_name().to_string(),
            dimensions,
            entries,
        };
        let body = serde_json::to_vec(&index)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &body))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        *self.cache.write().await = Some(Loaded {
            modified: self.modified().await,
            index: Arc::new(index),
        });
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for FileVectorIndex {
    async fn upsert(&self, documents: Vec<IndexDocument>) -> Result<(), IndexError> {
        let mut entries = match self.load().await {
            Ok(index) => index.entries.clone(),
            Err(IndexError::NotBuilt(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        let fresh = self.embed_documents(documents).await?;
        entries.retain(|existing| !fresh.iter().any(|f| f.id == existing.id));
        entries.extend(fresh);
        self.write(entries).await
    }

    async fn replace_all(&self, documents: Vec<IndexDocument>) -> Result<(), IndexError> {
        let entries = self.embed_documents(documents).await?;
        self.write(entries).await
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<IndexHit>, IndexError> {
        let index = self.load().await?;
        if k == 0 || index.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::InvalidResponse("no query embedding".to_string()))?;
        if query.len() != index.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: index.dimensions,
                got: query.len(),
            });
        }

        let mut scored: Vec<(f32, &StoredEntry)> = index
            .entries
            .iter()
            .map(|entry| (squared_l2(&query, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, entry)| IndexHit {
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                distance,
            })
            .collect())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index build job: composes the first `limit` records and replaces the index.
///
/// Records with empty composed text are skipped. Returns the number indexed.
pub async fn build_index(
    records: &[ResumeRecord],
    index: &dyn VectorIndex,
    limit: usize,
) -> Result<usize, IndexError> {
    let documents: Vec<IndexDocument> = records
        .iter()
        .take(limit)
        .filter_map(|record| {
            let text = compose(&record.sections, ComposeOptions::RETRIEVAL);
            if text.trim().is_empty() {
                return None;
            }
            let mut metadata = Map::new();
            metadata.insert(
                SOURCE_FILE_KEY.to_string(),
                Value::String(format!("{}.json", record.id)),
            );
            Some(IndexDocument {
                id: record.id.clone(),
                text,
                metadata,
            })
        })
        .collect();

    if documents.is_empty() {
        return Err(IndexError::NoTexts);
    }

    let count = documents.len();
    info!(count, "building vector index");
    index.replace_all(documents).await?;
    info!(count, "vector index built");
    Ok(count)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Embeds text as counts of a fixed vocabulary, one axis per word.
    pub struct VocabEmbedder(pub Vec<&'static str>);

    #[async_trait]
    impl Embedder for VocabEmbedder {
        fn model_name(&self) -> &str {
            "vocab"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let lower = text.to_lowercase();
                    self.0
                        .iter()
                        .map(|word| lower.matches(word).count() as f32)
                        .collect()
                })
                .collect())
        }
    }
}
