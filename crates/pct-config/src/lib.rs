//! Parse and validate `pct.toml` and the update-center catalog feed.

pub mod catalog;
pub mod config;

pub use catalog::{Catalog, CatalogError, DependencyResolution, PluginCatalogEntry};
pub use config::{ConfigError, HookConfig, MavenConfig, TesterConfig};
