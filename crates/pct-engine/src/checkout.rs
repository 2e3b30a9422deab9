//! Fetching a plugin's source at the commit it was released from.

use std::path::{Path, PathBuf};
use std::process::Command;

use pct_util::process::run_command;

use crate::error::EngineError;
use crate::metadata::PluginMetadata;

/// Places a plugin's source tree in a directory.
pub trait SourceCheckout: Send + Sync {
    /// Populate `destination`, which does not exist yet, with the source of
    /// `metadata` at its recorded commit.
    ///
    /// # Errors
    /// Returns `EngineError::Checkout` if the source cannot be obtained.
    fn checkout(&self, metadata: &PluginMetadata, destination: &Path) -> Result<(), EngineError>;
}

/// Clones with the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCheckout {
    git: PathBuf,
}

impl Default for GitCheckout {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
        }
    }
}

impl GitCheckout {
    fn git(&self, metadata: &PluginMetadata, args: &[&str]) -> Result<(), EngineError> {
        let output = run_command(Command::new(&self.git).args(args))?;
        if output.success {
            return Ok(());
        }
        Err(EngineError::Checkout {
            plugin: metadata.plugin_id().to_owned(),
            scm_url: metadata.scm_url().to_owned(),
            message: format!("git {} failed: {}", args.first().unwrap_or(&""), output.stderr.trim()),
        })
    }
}

impl SourceCheckout for GitCheckout {
    fn checkout(&self, metadata: &PluginMetadata, destination: &Path) -> Result<(), EngineError> {
        let dest = destination.display().to_string();
        log::info!(
            "{}: cloning {} at {}",
            metadata.plugin_id(),
            metadata.scm_url(),
            metadata.git_commit()
        );
        self.git(metadata, &["clone", "--quiet", metadata.scm_url(), &dest])?;
        self.git(
            metadata,
            &["-C", &dest, "checkout", "--quiet", "--detach", metadata.git_commit()],
        )
    }
}
