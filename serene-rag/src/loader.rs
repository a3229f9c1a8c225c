//! Plain-text document loading.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Default corpus location, relative to the working directory.
pub const DEFAULT_PATTERN: &str = "documents/*.txt";

fn loader_error(source_path: impl Into<String>, message: impl ToString) -> RagError {
    RagError::LoaderError { source_path: source_path.into(), message: message.to_string() }
}

/// Resolve `pattern` to files, sorted by path.
///
/// Directories matched by the pattern are skipped.
///
/// # Errors
///
/// Returns [`RagError::LoaderError`] for an invalid glob or an unreadable
/// directory entry.
pub fn resolve_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| loader_error(pattern, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| loader_error(pattern, e))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read one file as a [`Document`], using its file stem as ID and its path
/// as source.
///
/// # Errors
///
/// Returns [`RagError::LoaderError`] if the file cannot be read as UTF-8.
pub fn load_document(path: &Path) -> Result<Document> {
    let source = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| loader_error(source.as_str(), e))?;
    let id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.clone());
    debug!(document.id = %id, chars = text.chars().count(), "loaded document");
    Ok(Document { id, text, source })
}

/// Load every file matching `pattern`, in sorted path order.
///
/// A pattern matching nothing is not an error: the corpus is simply empty.
///
/// # Errors
///
/// Returns [`RagError::LoaderError`] on the first file that cannot be read.
pub fn load_documents(pattern: &str) -> Result<Vec<Document>> {
    let files = resolve_files(pattern)?;
    if files.is_empty() {
        warn!(pattern, "no documents matched, index will be empty");
    }
    files.iter().map(|path| load_document(path)).collect()
}
