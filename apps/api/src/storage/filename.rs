//! File name checks shared by the upload boundary and the blob store.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilenameError {
    #[error("File name cannot be empty")]
    Empty,
    #[error("Invalid file name: path separators are not allowed")]
    ContainsPathSeparator,
    #[error("Invalid file name: '..' is not allowed")]
    PathTraversal,
    #[error("Invalid file name: null bytes are not allowed")]
    NullByte,
    #[error("Invalid file name: control characters are not allowed")]
    ControlCharacter,
}

/// Reduces a client-supplied upload name to its last path component.
///
/// Some browsers send the full client path (`C:\Users\me\spec.pdf`).
pub fn client_basename(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim()
}

/// Validates a flat file name (no directory components allowed).
pub fn validate_flat_filename(filename: &str) -> Result<&str, FilenameError> {
    if filename.is_empty() {
        return Err(FilenameError::Empty);
    }

    if filename.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    // CR/LF would also break the Content-Disposition header on download.
    if filename.chars().any(|c| c.is_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if filename.contains('/') || filename.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    if filename == "." || filename == ".." {
        return Err(FilenameError::PathTraversal);
    }

    Ok(filename)
}

/// Lower-cased extension of a file name, if it has one.
pub fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
