//! The corpus: processed resume records, one JSON file per source document.
//!
//! Canonical order is ascending file name. Record ids are always taken from the
//! file stem on load, never from the file body.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::resume::ResumeRecord;

const RECORD_EXT: &str = "json";

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Corpus directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("No processed resumes found in {0}")]
    Empty(PathBuf),

    #[error("Resume '{0}' not found")]
    NotFound(String),

    #[error("Invalid resume id '{0}'")]
    InvalidId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ResumeStore {
    dir: PathBuf,
}

impl ResumeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_id(id: &str) -> Result<(), CorpusError> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\'])
            && !id.contains("..");
        if valid {
            Ok(())
        } else {
            Err(CorpusError::InvalidId(id.to_string()))
        }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXT}"))
    }

    /// Record ids in canonical order.
    ///
    /// Only an absent directory is [`CorpusError::MissingDirectory`]; a path
    /// that exists but cannot be listed is an I/O error.
    pub fn ids(&self) -> Result<Vec<String>, CorpusError> {
        if !self.dir.exists() {
            return Err(CorpusError::MissingDirectory(self.dir.clone()));
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Number of records on disk; zero when the directory does not exist.
    pub fn count(&self) -> usize {
        self.ids().map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn contains(&self, id: &str) -> bool {
        Self::check_id(id).is_ok() && self.path_for(id).is_file()
    }

    pub fn load(&self, id: &str) -> Result<ResumeRecord, CorpusError> {
        Self::check_id(id)?;
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(CorpusError::NotFound(id.to_string()));
        }
        read_record(&path, id)
    }

    /// Loads every record in canonical order.
    ///
    /// Records that fail to parse are skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<ResumeRecord>, CorpusError> {
        let ids = self.ids()?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match read_record(&self.path_for(&id), &id) {
                Ok(record) => records.push(record),
                Err(e) => warn!(id = %id, error = %e, "skipping unreadable resume record"),
            }
        }
        debug!(dir = %self.dir.display(), count = records.len(), "corpus loaded");
        Ok(records)
    }

    /// Like [`load_all`](Self::load_all), but an empty corpus is an error.
    pub fn load_non_empty(&self) -> Result<Vec<ResumeRecord>, CorpusError> {
        let records = self.load_all()?;
        if records.is_empty() {
            return Err(CorpusError::Empty(self.dir.clone()));
        }
        Ok(records)
    }

    /// Writes a record, replacing any previous version with the same id.
    pub fn save(&self, record: &ResumeRecord) -> Result<PathBuf, CorpusError> {
        Self::check_id(&record.id)?;
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&record.id);
        let body = serde_json::to_vec_pretty(record).map_err(|source| CorpusError::Malformed {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &body)?;
        Ok(path)
    }
}

fn read_record(path: &Path, id: &str) -> Result<ResumeRecord, CorpusError> {
    let bytes = fs::read(path)?;
    let mut record: ResumeRecord =
        serde_json::from_slice(&bytes).map_err(|source| CorpusError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    record.id = id.to_string();
    record.sections = record.sections.prune();
    Ok(record)
}

/// Writes to a uniquely named sibling temp file, then renames over `path`.
///
/// Concurrent writers of the same path never share a temp file; the last
/// rename wins.
pub(crate) fn write_atomic(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{SectionContent, Sections, SegmenterKind};

    fn record(id: &str, skill: &str) -> ResumeRecord {
        ResumeRecord::new(
            id,
            format!("{id}.txt"),
            SegmenterKind::RuleBased,
            Sections {
                skills: Some(SectionContent::Items(vec![skill.to_string()])),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_save_then_load_all_in_canonical_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        for id in ["b", "c", "a"] {
            store.save(&record(id, "Rust")).unwrap();
        }

        let records = store.load_all().unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.count(), 3);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_corrupt_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        store.save(&record("good", "Go")).unwrap();
        fs::write(dir.path().join("bad.json"), b"{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "good");
        assert!(matches!(store.load("bad"), Err(CorpusError::Malformed { .. })));
    }

    #[test]
    fn test_id_comes_from_file_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("10554236.json"),
            br#"{"id": "other", "source_txt": "10554236.txt", "sections": {"summary": ""}}"#,
        )
        .unwrap();
        let store = ResumeStore::new(dir.path());
        let loaded = store.load("10554236").unwrap();
        assert_eq!(loaded.id, "10554236");
        assert!(loaded.sections.summary.is_none());
    }

    #[test]
    fn test_missing_directory_and_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ResumeStore::new(dir.path().join("nope"));
        assert!(matches!(missing.load_all(), Err(CorpusError::MissingDirectory(_))));
        assert_eq!(missing.count(), 0);

        let empty = ResumeStore::new(dir.path());
        assert!(empty.load_all().unwrap().is_empty());
        assert!(matches!(empty.load_non_empty(), Err(CorpusError::Empty(_))));
    }

    #[test]
    fn test_path_traversal_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        assert!(matches!(store.load("../etc/passwd"), Err(CorpusError::InvalidId(_))));
        assert!(matches!(store.load(""), Err(CorpusError::InvalidId(_))));
        assert!(!store.contains("../x"));
        assert!(matches!(store.load("absent"), Err(CorpusError::NotFound(_))));
    }

    #[test]
    fn test_records_with_off_type_fields_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let bodies = [
            ("a", r#"{"sections": {"experience": [{"title": "Dev", "dates": 2020}]}}"#),
            ("b", r#"{"sections": {"experience": [{"responsibilities": "Built APIs"}]}}"#),
            ("c", r#"{"sections": {"summary": {"text": "Analyst"}, "skills": ["SQL"]}}"#),
        ];
        for (id, body) in bodies {
            fs::write(dir.path().join(format!("{id}.json")), body).unwrap();
        }
        let store = ResumeStore::new(dir.path());

        let ids: Vec<_> = store.load_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.load("c").unwrap().sections.skills_list(), vec!["SQL"]);
    }

    #[test]
    fn test_concurrent_saves_of_one_id_never_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        let skills = ["Rust", "Go", "Python", "SQL"];

        std::thread::scope(|scope| {
            for skill in skills {
                let store = &store;
                scope.spawn(move || {
                    for _ in 0..50 {
                        store.save(&record("same", skill)).unwrap();
                        let loaded = store.load("same").unwrap();
                        assert_eq!(loaded.sections.skills_list().len(), 1);
                    }
                });
            }
        });

        let last = store.load("same").unwrap();
        assert!(skills.contains(&last.sections.skills_list()[0].as_str()));
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("same.json")]);
    }
}
