//! Filesystem utilities.

use std::path::Path;

use crate::error::UtilError;

fn io_error(path: &Path, source: std::io::Error) -> UtilError {
    UtilError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| io_error(path, source))
}

/// Fail unless `path` is an existing directory.
///
/// # Errors
/// Returns `UtilError::Io` with `NotFound` if the directory is absent or is a file.
pub fn require_dir(path: &Path) -> Result<(), UtilError> {
    if path.is_dir() {
        return Ok(());
    }
    Err(io_error(
        path,
        std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
    ))
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_error(path, source)),
    }
}

/// Read a file into a string.
///
/// # Errors
/// Returns an error if the file cannot be read or is not UTF-8.
pub fn read_to_string(path: &Path) -> Result<String, UtilError> {
    std::fs::read_to_string(path).map_err(|source| io_error(path, source))
}

/// Write `content` to `path` through a sibling temp file and a rename, so a
/// reader never observes a half-written file.
///
/// # Errors
/// Returns an error if the temp file cannot be written or renamed into place.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), UtilError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));
    std::fs::write(&tmp_path, content).map_err(|source| io_error(&tmp_path, source))?;
    std::fs::rename(&tmp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        io_error(path, source)
    })
}
