//! Error types for pct-maven.

use std::path::PathBuf;

use crate::invoke::BuildOutcome;

/// Errors produced while resolving or running the build tool.
#[derive(Debug, thiserror::Error)]
pub enum MavenError {
    /// An explicitly configured executable does not exist.
    #[error("build tool not found at {path} — fix `maven.executable` or remove it to use `mvn` from PATH")]
    NotFound { path: PathBuf },

    /// The configured executable exists but cannot be run.
    #[error("build tool at {path} is not executable — check file permissions")]
    NotExecutable { path: PathBuf },

    /// The build log could not be created or written.
    #[error("cannot write build log {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The process could not be started.
    #[error("cannot launch `{command}` in {}: {source}", .directory.display())]
    Launch {
        command: String,
        directory: PathBuf,
        source: std::io::Error,
    },

    /// Waiting on the process or draining its output failed.
    #[error("lost track of `{command}`: {source}")]
    Supervise {
        command: String,
        source: std::io::Error,
    },

    /// The build ran and exited unsuccessfully.
    #[error("`{command}` in {} exited with {}", .directory.display(), describe_exit(.exit_code))]
    BuildFailed {
        command: String,
        directory: PathBuf,
        exit_code: Option<i32>,
        /// What the build got through before failing.
        outcome: Box<BuildOutcome>,
    },

    /// The wait was cancelled and the process killed.
    #[error("`{command}` in {} was interrupted", .directory.display())]
    Interrupted { command: String, directory: PathBuf },
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "no exit code (killed by a signal)".to_owned(), |c| format!("exit code {c}"))
}

impl MavenError {
    /// Modules that completed before the failure, when the build got that far.
    pub fn succeeded_modules(&self) -> &[String] {
        match self {
            MavenError::BuildFailed { outcome, .. } => &outcome.succeeded_plugin_ids,
            _ => &[],
        }
    }
}
