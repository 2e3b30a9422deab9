//! Error types for pct-engine.

use crate::pom::RewriteError;

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] pct_util::error::UtilError),

    /// The configuration is unusable.
    #[error("{0}")]
    Config(#[from] pct_config::ConfigError),

    /// The catalog feed is unusable. Fatal before any plugin is tested.
    #[error("{0}")]
    Catalog(#[from] pct_config::CatalogError),

    /// Two versions could not be ordered.
    #[error("{0}")]
    Version(#[from] pct_version::VersionError),

    /// Plugin metadata failed validation.
    #[error("{0}")]
    Metadata(#[from] crate::metadata::MetadataError),

    /// No extraction strategy could recover the plugin's source location.
    #[error("cannot determine the source of plugin `{plugin}`: {reason}")]
    MetadataExtraction { plugin: String, reason: String },

    /// A plugin artifact could not be read.
    #[error("cannot read plugin artifact {path}: {message}")]
    Artifact { path: String, message: String },

    /// The plugin's build descriptor could not be rewritten.
    #[error("cannot rewrite build descriptor of `{plugin}`: {source}")]
    Descriptor {
        plugin: String,
        source: RewriteError,
    },

    /// The source checkout failed.
    #[error("cannot check out `{plugin}` from {scm_url}: {message}")]
    Checkout {
        plugin: String,
        scm_url: String,
        message: String,
    },

    /// A hook failed while adjusting the build.
    #[error("hook `{hook}` failed: {message}")]
    Hook { hook: String, message: String },

    /// The build tool failed.
    #[error("{0}")]
    Build(#[from] pct_maven::MavenError),

    /// Fail-fast stopped the run after a build failure.
    #[error("stopping after `{plugin}` failed ({} plugin(s) had succeeded): {source}", .succeeded.len())]
    FailFast {
        plugin: String,
        /// Plugins that had passed before the failure, for resuming the run.
        succeeded: Vec<String>,
        source: Box<pct_maven::MavenError>,
    },

    /// The run was cancelled.
    #[error("run cancelled while testing `{plugin}`")]
    Cancelled { plugin: String },

    /// Report serialization/deserialization failed.
    #[error("cannot process report: {message}")]
    Report { message: String },
}
