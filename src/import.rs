//! Workout file import
//!
//! Attaches a watch export to a workout slot as opaque metadata: file name,
//! upload time and a short text excerpt. GPS and heart-rate formats are
//! never parsed.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::models::{WorkoutImport, MAX_EXCERPT_CHARS};

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["csv", "gpx", "tcx", "fit", "txt"];

/// Bytes read from an import file. A UTF-8 char is at most 4 bytes, so this
/// always covers a full excerpt.
const READ_LIMIT: u64 = (4 * MAX_EXCERPT_CHARS) as u64;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Unsupported file type '{0}' (expected .csv, .gpx, .tcx, .fit or .txt)")]
    UnsupportedFormat(String),

    #[error("Path has no file name: {0}")]
    MissingFileName(String),

    #[error("Could not read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Check the extension against the accepted export formats (case-insensitive)
pub fn check_extension(file_name: &str) -> Result<(), ImportError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ImportError::UnsupportedFormat(file_name.to_string()))
    }
}

/// Build an import record from raw file bytes. Binary content (e.g. .fit)
/// is decoded lossily; only the excerpt is kept.
pub fn import_from_bytes(file_name: &str, bytes: &[u8], uploaded_at: DateTime<Utc>) -> Result<WorkoutImport, ImportError> {
    check_extension(file_name)?;
    let text = String::from_utf8_lossy(bytes);
    let excerpt = if text.is_empty() { None } else { Some(&*text) };
    Ok(WorkoutImport::new(file_name, uploaded_at, excerpt))
}

/// Read a file from disk into an import record. Only the prefix needed for
/// the excerpt is read. Nothing is recorded on failure.
pub async fn read_import(path: &Path, uploaded_at: DateTime<Utc>) -> Result<WorkoutImport, ImportError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ImportError::MissingFileName(path.display().to_string()))?;
    check_extension(file_name)?;

    let unreadable = |source| ImportError::Unreadable {
        path: path.display().to_string(),
        source,
    };
    let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
    let mut bytes = Vec::new();
    file.take(READ_LIMIT)
        .read_to_end(&mut bytes)
        .await
        .map_err(unreadable)?;
    debug!(file = file_name, bytes = bytes.len(), "Read import file prefix");

    import_from_bytes(file_name, &bytes, uploaded_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_accepts_supported_extensions() {
        for name in ["a.csv", "b.GPX", "c.tcx", "d.Fit", "e.txt"] {
            assert!(check_extension(name).is_ok(), "{} should be accepted", name);
        }
    }

    #[test]
    fn test_rejects_other_extensions() {
        assert!(matches!(check_extension("run.json"), Err(ImportError::UnsupportedFormat(_))));
        assert!(matches!(check_extension("noext"), Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_binary_content_is_kept_lossily() {
        let import = import_from_bytes("watch.fit", &[0x0e, 0x10, 0xff, 0xfe, b'F', b'I', b'T'], Utc::now())
            .expect("fit accepted");
        let content = import.content.expect("excerpt");
        assert!(content.ends_with("FIT"));
    }

    #[test]
    fn test_empty_file_has_no_excerpt() {
        let import = import_from_bytes("empty.csv", b"", Utc::now()).unwrap();
        assert!(import.content.is_none());
        assert_eq!(import.file_name, "empty.csv");
    }

    #[tokio::test]
    async fn test_read_import_truncates_excerpt() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temp file");
        let body = "time,hr\n".repeat(400);
        file.write_all(body.as_bytes()).expect("write");

        let import = read_import(file.path(), Utc::now()).await.expect("Should import");
        assert_eq!(import.content.map(|c| c.chars().count()), Some(MAX_EXCERPT_CHARS));
    }

    #[tokio::test]
    async fn test_read_import_large_file_keeps_full_excerpt() {
        let mut file = tempfile::Builder::new()
            .suffix(".gpx")
            .tempfile()
            .expect("temp file");
        // Multi-byte chars, far past the read limit
        let body = "ção".repeat(20_000);
        file.write_all(body.as_bytes()).expect("write");

        let import = read_import(file.path(), Utc::now()).await.expect("Should import");
        let content = import.content.expect("excerpt");
        assert_eq!(content.chars().count(), MAX_EXCERPT_CHARS);
        assert!(!content.contains('\u{FFFD}'));
        assert!(body.starts_with(&content));
        assert_eq!(import.file_name, file.path().file_name().unwrap().to_str().unwrap());
    }

    #[tokio::test]
    async fn test_read_import_missing_file() {
        let result = read_import(Path::new("/nonexistent/run.gpx"), Utc::now()).await;
        assert!(matches!(result, Err(ImportError::Unreadable { .. })));
    }
}
