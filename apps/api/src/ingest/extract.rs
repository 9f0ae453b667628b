//! `extractText(file) -> rawText` for the two source formats the corpus accepts.
//!
//! Extraction never panics: every failure comes back as an [`ExtractError`] and
//! the caller reports it against the one document.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source document formats, by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Text,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "txt" => Some(SourceKind::Text),
            _ => None,
        }
    }
}

/// Extracts text from in-memory document bytes.
pub fn extract_bytes(bytes: &[u8], kind: SourceKind) -> Result<String, ExtractError> {
    match kind {
        SourceKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
        SourceKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Extracts text from a file on disk. Blocking; run it off the async runtime.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let kind = SourceKind::from_path(path)
        .ok_or_else(|| ExtractError::Unsupported(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    extract_bytes(&bytes, kind)
}

/// Recursively lists every PDF and TXT document under `root`, sorted by path.
///
/// A missing root yields an empty list.
pub fn scan_sources(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| SourceKind::from_path(path).is_some())
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_from_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a/b.PDF")), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::from_path(Path::new("cv.txt")), Some(SourceKind::Text));
        assert_eq!(SourceKind::from_path(Path::new("cv.docx")), None);
        assert_eq!(SourceKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_text_bytes_are_lossy_decoded() {
        let text = extract_bytes(b"Skills\n\xffRust", SourceKind::Text).unwrap();
        assert!(text.starts_with("Skills\n"));
        assert!(text.ends_with("Rust"));
    }

    #[test]
    fn test_invalid_pdf_is_an_error_not_a_panic() {
        let result = extract_bytes(b"definitely not a pdf", SourceKind::Pdf);
        assert!(matches!(result, Err(ExtractError::Pdf(_))));
    }

    #[test]
    fn test_scan_sources_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("INFORMATION-TECHNOLOGY")).unwrap();
        std::fs::write(dir.path().join("INFORMATION-TECHNOLOGY/b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.md"), b"x").unwrap();

        let found = scan_sources(dir.path());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["INFORMATION-TECHNOLOGY/b.pdf", "a.txt"]);
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        assert!(scan_sources(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_extract_file_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.docx");
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(extract_file(&path), Err(ExtractError::Unsupported(_))));
    }
}
