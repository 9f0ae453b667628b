//! Ingest orchestration: single-document analysis and the bulk jobs.
//!
//! Per-document failures become [`DocumentFailure`] entries in the report and
//! never abort a batch. Only missing source directories and empty batches are
//! returned as errors.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::corpus::{CorpusError, ResumeStore};
use crate::ingest::extract::{extract_bytes, extract_file, scan_sources, SourceKind};
use crate::ingest::llm_segmenter::{default_segment_retry, segment_with_llm};
use crate::ingest::normalize::normalize;
use crate::ingest::segmenter::segment;
use crate::ingest::IngestError;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::Completion;
use crate::models::resume::{ResumeRecord, SectionName, Sections, SegmenterKind};

/// Which segmenter to run, plus what the LLM path needs.
pub struct Segmentation<'a> {
    pub mode: SegmenterKind,
    pub llm: Option<&'a dyn Completion>,
    pub retry: RetryPolicy,
}

impl<'a> Segmentation<'a> {
    pub fn rule_based() -> Self {
        Self {
            mode: SegmenterKind::RuleBased,
            llm: None,
            retry: RetryPolicy::immediate(1),
        }
    }

    pub fn llm(llm: &'a dyn Completion) -> Self {
        Self {
            mode: SegmenterKind::Llm,
            llm: Some(llm),
            retry: default_segment_retry(),
        }
    }
}

/// Record id for an uploaded file: its stem, restricted to `[A-Za-z0-9._-]`.
pub fn document_id(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let id: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let id = id.trim_start_matches('.').to_string();
    (!id.is_empty()).then_some(id)
}

/// Normalizes and segments text with the rule-based segmenter.
pub fn segment_text(raw: &str) -> Sections {
    Sections::from_text_map(&segment(&normalize(raw)))
}

/// Turns raw document text into a record. Does not persist it.
pub async fn analyze_text(
    id: &str,
    source_file: &str,
    raw: &str,
    segmentation: &Segmentation<'_>,
) -> Result<ResumeRecord, IngestError> {
    let text = normalize(raw);
    if text.is_empty() {
        return Err(IngestError::EmptyText);
    }

    let sections = match segmentation.mode {
        SegmenterKind::RuleBased => Sections::from_text_map(&segment(&text)),
        SegmenterKind::Llm => {
            let llm = segmentation.llm.ok_or(IngestError::LlmUnavailable)?;
            segment_with_llm(llm, &text, &segmentation.retry).await?
        }
    };

    Ok(ResumeRecord::new(id, source_file, segmentation.mode, sections))
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub id: String,
    pub error: String,
}

/// Result of analyzing one uploaded document.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Processed {
        record: ResumeRecord,
        sections_found: Vec<SectionName>,
    },
    Failed(DocumentFailure),
}

/// Extracts, segments and persists one uploaded document.
pub async fn analyze_document(
    store: &ResumeStore,
    id: &str,
    source_file: &str,
    bytes: Vec<u8>,
    kind: SourceKind,
    segmentation: &Segmentation<'_>,
) -> DocumentOutcome {
    let failed = |e: IngestError| {
        warn!(id, error = %e, "document analysis failed");
        DocumentOutcome::Failed(DocumentFailure {
            id: id.to_string(),
            error: e.to_string(),
        })
    };

    let raw = match tokio::task::spawn_blocking(move || extract_bytes(&bytes, kind)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => return failed(e.into()),
        Err(e) => return failed(IngestError::Task(e.to_string())),
    };

    let record = match analyze_text(id, source_file, &raw, segmentation).await {
        Ok(record) => record,
        Err(e) => return failed(e),
    };

    let record = match save_record(store, record).await {
        Ok(record) => record,
        Err(e) => return failed(e),
    };

    info!(id, segmenter = ?record.segmenter, "document analyzed");
    let sections_found = record.sections.present();
    DocumentOutcome::Processed {
        record,
        sections_found,
    }
}

/// Persists a record on the blocking pool.
async fn save_record(store: &ResumeStore, record: ResumeRecord) -> Result<ResumeRecord, IngestError> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.save(&record).map(|_| record))
        .await
        .map_err(|e| IngestError::Task(e.to_string()))?
        .map_err(IngestError::from)
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: Vec<DocumentFailure>,
}

/// Extracts text from every source document under `raw_dir` into `text_dir`.
///
/// Documents whose `<stem>.txt` already exists are skipped.
pub async fn extract_all(raw_dir: &Path, text_dir: &Path) -> Result<BatchReport, IngestError> {
    if !raw_dir.is_dir() {
        return Err(IngestError::MissingSource(raw_dir.to_path_buf()));
    }
    let sources = scan_sources(raw_dir);
    if sources.is_empty() {
        return Err(IngestError::NoDocuments(raw_dir.to_path_buf()));
    }
    tokio::fs::create_dir_all(text_dir).await?;
    info!(count = sources.len(), dir = %raw_dir.display(), "extracting source documents");

    let mut report = BatchReport::default();
    for source in sources {
        let Some(stem) = source.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };
        let target = text_dir.join(format!("{stem}.txt"));
        if target.exists() {
            report.skipped += 1;
            continue;
        }

        let path = source.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_file(&path))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))
            .and_then(|r| r.map_err(IngestError::from))
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(IngestError::EmptyText)
                } else {
                    Ok(text)
                }
            });

        let written = match extracted {
            Ok(text) => tokio::fs::write(&target, text).await.map_err(IngestError::from),
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => report.processed += 1,
            Err(e) => {
                warn!(id = %stem, error = %e, "text extraction failed");
                report.failed.push(DocumentFailure {
                    id: stem,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        extracted = report.processed,
        skipped = report.skipped,
        failed = report.failed.len(),
        "extraction finished"
    );
    Ok(report)
}

fn text_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && SourceKind::from_path(&path) == Some(SourceKind::Text) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Segments every extracted text file and persists the records.
///
/// Ids already in the store are skipped unless `reprocess` is set.
pub async fn process_all(
    text_dir: &Path,
    store: &ResumeStore,
    segmentation: &Segmentation<'_>,
    reprocess: bool,
) -> Result<BatchReport, IngestError> {
    if !text_dir.is_dir() {
        return Err(IngestError::MissingSource(text_dir.to_path_buf()));
    }
    let files = text_files(text_dir)?;
    if files.is_empty() {
        return Err(IngestError::NoDocuments(text_dir.to_path_buf()));
    }

    let done: HashSet<String> = if reprocess {
        HashSet::new()
    } else {
        match store.ids() {
            Ok(ids) => ids.into_iter().collect(),
            Err(CorpusError::MissingDirectory(_)) => HashSet::new(),
            Err(e) => return Err(e.into()),
        }
    };
    info!(
        found = files.len(),
        already_processed = done.len(),
        mode = ?segmentation.mode,
        "processing extracted texts"
    );

    let mut report = BatchReport::default();
    for file in files {
        let Some(id) = file.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };
        if done.contains(&id) {
            report.skipped += 1;
            continue;
        }
        let source_file = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = match tokio::fs::read(&file).await {
            Ok(bytes) => {
                let raw = String::from_utf8_lossy(&bytes);
                analyze_text(&id, &source_file, &raw, segmentation).await
            }
            Err(e) => Err(e.into()),
        };

        let saved = match result {
            Ok(record) => save_record(store, record).await,
            Err(e) => Err(e),
        };
        match saved {
            Ok(_) => report.processed += 1,
            Err(e) => {
                warn!(id = %id, error = %e, "document processing failed");
                report.failed.push(DocumentFailure {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed.len(),
        "processing finished"
    );
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub raw_documents: usize,
    pub extracted_texts: usize,
    pub structured_records: usize,
}

/// Counts documents at each stage. Missing directories count as zero.
pub fn dataset_stats(raw_dir: &Path, text_dir: &Path, store: &ResumeStore) -> DatasetStats {
    DatasetStats {
        raw_documents: scan_sources(raw_dir).len(),
        extracted_texts: text_files(text_dir).map(|f| f.len()).unwrap_or(0),
        structured_records: store.count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedCompletion;
    use crate::models::resume::SectionContent;

    const RESUME: &str = "Jane Roe\r\n\r\nSummary\r\nBackend   engineer.\r\n\r\n\r\n\r\nSkills\r\nRust, SQL\r\n";

    #[test]
    fn test_segment_text_normalizes_first() {
        let sections = segment_text(RESUME);
        assert_eq!(
            sections.summary,
            Some(SectionContent::Text("Backend engineer.".to_string()))
        );
        assert_eq!(sections.skills_list(), vec!["Rust", "SQL"]);
        assert_eq!(sections.other, Some(SectionContent::Text("Jane Roe".to_string())));
    }

    #[test]
    fn test_document_id_from_upload_name() {
        assert_eq!(document_id("Jane Doe CV.pdf").as_deref(), Some("Jane_Doe_CV"));
        assert_eq!(document_id("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(document_id("10554236.pdf").as_deref(), Some("10554236"));
        assert_eq!(document_id(""), None);
    }

    #[tokio::test]
    async fn test_analyze_text_rejects_blank_document() {
        let result = analyze_text("x", "x.txt", "  \n\n ", &Segmentation::rule_based()).await;
        assert!(matches!(result, Err(IngestError::EmptyText)));
    }

    #[tokio::test]
    async fn test_llm_mode_without_provider_is_an_error() {
        let segmentation = Segmentation {
            mode: SegmenterKind::Llm,
            llm: None,
            retry: RetryPolicy::immediate(1),
        };
        let result = analyze_text("x", "x.txt", RESUME, &segmentation).await;
        assert!(matches!(result, Err(IngestError::LlmUnavailable)));
    }

    #[tokio::test]
    async fn test_process_all_skips_done_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let text_dir = dir.path().join("text");
        std::fs::create_dir_all(&text_dir).unwrap();
        std::fs::write(text_dir.join("a.txt"), RESUME).unwrap();
        std::fs::write(text_dir.join("b.txt"), "   ").unwrap();
        std::fs::write(text_dir.join("c.txt"), RESUME).unwrap();
        let store = ResumeStore::new(dir.path().join("structured"));

        let first = process_all(&text_dir, &store, &Segmentation::rule_based(), false)
            .await
            .unwrap();
        assert_eq!(first.processed, 2);
        assert_eq!(first.failed.len(), 1);
        assert_eq!(first.failed[0].id, "b");
        assert_eq!(store.ids().unwrap(), vec!["a", "c"]);

        let second = process_all(&text_dir, &store, &Segmentation::rule_based(), false)
            .await
            .unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 2);

        let forced = process_all(&text_dir, &store, &Segmentation::rule_based(), true)
            .await
            .unwrap();
        assert_eq!(forced.processed, 2);
    }

    #[tokio::test]
    async fn test_process_all_llm_failure_is_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let text_dir = dir.path().join("text");
        std::fs::create_dir_all(&text_dir).unwrap();
        std::fs::write(text_dir.join("a.txt"), RESUME).unwrap();
        std::fs::write(text_dir.join("b.txt"), RESUME).unwrap();
        let store = ResumeStore::new(dir.path().join("structured"));

        let llm = ScriptedCompletion::new(vec![
            Ok("not json"),
            Ok("still not json"),
            Ok(r#"{"summary": "ok", "skills": ["Go"]}"#),
        ]);
        let segmentation = Segmentation {
            mode: SegmenterKind::Llm,
            llm: Some(&llm),
            retry: RetryPolicy::immediate(2),
        };
        let report = process_all(&text_dir, &store, &segmentation, false).await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed[0].id, "a");
        assert!(report.failed[0].error.starts_with("LLM processing failed"));
        let saved = store.load("b").unwrap();
        assert_eq!(saved.segmenter, SegmenterKind::Llm);
        assert_eq!(saved.source_file, "b.txt");
    }

    #[tokio::test]
    async fn test_missing_and_empty_source_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path().join("structured"));
        let missing = process_all(&dir.path().join("nope"), &store, &Segmentation::rule_based(), false).await;
        assert!(matches!(missing, Err(IngestError::MissingSource(_))));

        let empty = process_all(dir.path(), &store, &Segmentation::rule_based(), false).await;
        assert!(matches!(empty, Err(IngestError::NoDocuments(_))));
    }

    #[tokio::test]
    async fn test_extract_all_copies_text_and_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        let text = dir.path().join("text");
        std::fs::create_dir_all(raw.join("ENGINEERING")).unwrap();
        std::fs::write(raw.join("ENGINEERING/one.txt"), "Skills\nRust").unwrap();
        std::fs::write(raw.join("blank.txt"), "   ").unwrap();

        let report = extract_all(&raw, &text).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(std::fs::read_to_string(text.join("one.txt")).unwrap(), "Skills\nRust");

        let again = extract_all(&raw, &text).await.unwrap();
        assert_eq!(again.skipped, 1);
        assert_eq!(again.processed, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_all_write_failure_is_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        let text = dir.path().join("text");
        std::fs::create_dir_all(&raw).unwrap();
        std::fs::create_dir_all(&text).unwrap();
        std::fs::write(raw.join("good.txt"), "Skills\nRust").unwrap();
        std::fs::write(raw.join("stuck.txt"), "Skills\nGo").unwrap();
        // Dangling link: not skipped as existing, but the write cannot land.
        std::os::unix::fs::symlink(dir.path().join("gone/stuck.txt"), text.join("stuck.txt"))
            .unwrap();

        let report = extract_all(&raw, &text).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "stuck");
        assert!(text.join("good.txt").is_file());
    }

    #[tokio::test]
    async fn test_process_all_propagates_unlistable_store() {
        let dir = tempfile::tempdir().unwrap();
        let text_dir = dir.path().join("text");
        std::fs::create_dir_all(&text_dir).unwrap();
        std::fs::write(text_dir.join("a.txt"), RESUME).unwrap();
        let not_a_dir = dir.path().join("structured");
        std::fs::write(&not_a_dir, b"").unwrap();
        let store = ResumeStore::new(not_a_dir.clone());

        let result = process_all(&text_dir, &store, &Segmentation::rule_based(), false).await;
        assert!(matches!(result, Err(IngestError::Corpus(CorpusError::Io(_)))));
    }

    #[tokio::test]
    async fn test_analyze_document_persists_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        let outcome = analyze_document(
            &store,
            "upload",
            "upload.txt",
            RESUME.as_bytes().to_vec(),
            SourceKind::Text,
            &Segmentation::rule_based(),
        )
        .await;

        match outcome {
            DocumentOutcome::Processed { sections_found, .. } => {
                assert_eq!(
                    sections_found,
                    vec![SectionName::Summary, SectionName::Skills, SectionName::Other]
                );
            }
            DocumentOutcome::Failed(f) => panic!("unexpected failure: {}", f.error),
        }
        assert!(store.contains("upload"));
    }

    #[tokio::test]
    async fn test_analyze_document_reports_unreadable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        let outcome = analyze_document(
            &store,
            "broken",
            "broken.pdf",
            b"not a pdf".to_vec(),
            SourceKind::Pdf,
            &Segmentation::rule_based(),
        )
        .await;
        assert!(matches!(outcome, DocumentOutcome::Failed(ref f) if f.id == "broken"));
        assert!(!store.contains("broken"));
    }

    #[test]
    fn test_dataset_stats_counts_each_stage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("raw/IT")).unwrap();
        std::fs::write(dir.path().join("raw/IT/a.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("raw/b.txt"), b"x").unwrap();
        let store = ResumeStore::new(dir.path().join("structured"));

        let stats = dataset_stats(&dir.path().join("raw"), &dir.path().join("text"), &store);
        assert_eq!(
            stats,
            DatasetStats {
                raw_documents: 2,
                extracted_texts: 0,
                structured_records: 0
            }
        );
    }
}
