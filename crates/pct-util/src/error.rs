//! Error types for pct-util.

/// Errors produced by utility functions.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// An I/O operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A command failed to execute.
    #[error("cannot execute `{program}`: {source}")]
    CommandExec {
        program: String,
        source: std::io::Error,
    },

    /// A download failed.
    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    /// A compressed payload could not be decoded.
    #[error("cannot decode compressed payload: {message}")]
    Decode { message: String },
}
