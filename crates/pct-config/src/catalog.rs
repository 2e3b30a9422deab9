//! Parsed view of an update-center catalog feed.
//!
//! The feed is a JSON document (optionally wrapped as `updateCenter.post(...)`)
//! with one core entry and a map of plugin entries. Plugin ids are looked up
//! case-insensitively.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use pct_version::Coordinate;

/// A plugin release as published in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCatalogEntry {
    /// Plugin id as spelled in the feed.
    pub id: String,
    pub version: String,
    /// Download URL of the plugin artifact.
    pub url: String,
    pub title: Option<String>,
    /// Published `group:artifact:version`, when the feed carries one.
    pub gav: Option<Coordinate>,
    /// Required dependencies: plugin id → minimum version.
    pub dependencies: BTreeMap<String, String>,
    /// Optional dependencies: plugin id → minimum version.
    pub optional_dependencies: BTreeMap<String, String>,
}

impl PluginCatalogEntry {
    /// Group id of this plugin, falling back to `default_group`.
    pub fn group<'a>(&'a self, default_group: &'a str) -> &'a str {
        self.gav
            .as_ref()
            .map_or(default_group, |gav| gav.group.as_str())
    }

    /// Artifact id of this plugin; the plugin id unless the feed says otherwise.
    pub fn artifact(&self) -> &str {
        self.gav
            .as_ref()
            .map_or(self.id.as_str(), |gav| gav.artifact.as_str())
    }
}

/// Outcome of looking up a dependency id in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyResolution<'a> {
    /// The dependency is published in the same catalog.
    Resolved(&'a PluginCatalogEntry),
    /// The dependency is unknown to the catalog and is left untested.
    External,
}

/// Snapshot of a catalog feed.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// The feed's `id` field (e.g. `"default"`).
    pub source_id: String,
    /// Core release this catalog targets.
    pub core: Coordinate,
    /// Download URL of the core release.
    pub core_url: String,
    /// Keyed by lower-cased plugin id.
    plugins: BTreeMap<String, PluginCatalogEntry>,
}

#[derive(Deserialize)]
struct RawCatalog {
    id: String,
    core: RawCore,
    #[serde(default)]
    plugins: BTreeMap<String, RawPlugin>,
}

#[derive(Deserialize)]
struct RawCore {
    version: String,
    url: String,
}

#[derive(Deserialize)]
struct RawPlugin {
    name: String,
    version: String,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    gav: Option<String>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
}

#[derive(Deserialize)]
struct RawDependency {
    name: String,
    version: String,
    #[serde(default)]
    optional: bool,
}

impl Catalog {
    /// Load a catalog from an `http(s)://` URL or a local file.
    ///
    /// # Errors
    /// Returns an error if the feed cannot be fetched or read, or is malformed.
    pub fn load(source: &str, core_group: &str, core_artifact: &str) -> Result<Self, CatalogError> {
        let text = if source.starts_with("http://") || source.starts_with("https://") {
            pct_util::download::fetch_string(source)?
        } else {
            let path = source.strip_prefix("file://").unwrap_or(source);
            pct_util::fs::read_to_string(Path::new(path))?
        };
        Self::parse(&text, core_group, core_artifact)
    }

    /// Parse a catalog document. `core_group`/`core_artifact` name the core
    /// coordinate, since the feed only publishes its version.
    ///
    /// # Errors
    /// Returns `CatalogError::Parse` for invalid JSON and `CatalogError::Invalid`
    /// for structurally valid documents with unusable content.
    pub fn parse(text: &str, core_group: &str, core_artifact: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog =
            serde_json::from_str(strip_jsonp(text)).map_err(|source| CatalogError::Parse { source })?;

        if raw.core.version.trim().is_empty() {
            return Err(CatalogError::Invalid {
                message: "core entry has an empty version".to_owned(),
            });
        }

        let mut plugins = BTreeMap::new();
        for (key, plugin) in raw.plugins {
            if plugin.version.trim().is_empty() {
                return Err(CatalogError::Invalid {
                    message: format!("plugin `{key}` has an empty version"),
                });
            }
            let gav = plugin
                .gav
                .as_deref()
                .map(Coordinate::parse)
                .transpose()
                .map_err(|e| CatalogError::Invalid {
                    message: format!("plugin `{key}`: {e}"),
                })?;

            let mut dependencies = BTreeMap::new();
            let mut optional_dependencies = BTreeMap::new();
            for dep in plugin.dependencies {
                let target = if dep.optional {
                    &mut optional_dependencies
                } else {
                    &mut dependencies
                };
                target.insert(dep.name, dep.version);
            }

            let entry = PluginCatalogEntry {
                id: plugin.name,
                version: plugin.version,
                url: plugin.url,
                title: plugin.title,
                gav,
                dependencies,
                optional_dependencies,
            };
            if plugins.insert(entry.id.to_lowercase(), entry).is_some() {
                return Err(CatalogError::Invalid {
                    message: format!("plugin `{key}` is listed more than once (ids are case-insensitive)"),
                });
            }
        }

        Ok(Self {
            source_id: raw.id,
            core: Coordinate::new(core_group, core_artifact, &raw.core.version),
            core_url: raw.core.url,
            plugins,
        })
    }

    /// Look up a plugin by id, ignoring case.
    pub fn get(&self, id: &str) -> Option<&PluginCatalogEntry> {
        self.plugins.get(&id.to_lowercase())
    }

    /// All plugins, ordered by lower-cased id.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginCatalogEntry> {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Resolve a dependency id against this catalog.
    pub fn resolve_dependency(&self, id: &str) -> DependencyResolution<'_> {
        self.get(id)
            .map_or(DependencyResolution::External, DependencyResolution::Resolved)
    }
}

/// Remove an `updateCenter.post(...);` wrapper if present.
fn strip_jsonp(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    match (trimmed.find('('), trimmed.rfind(')')) {
        (Some(open), Some(close)) if open < close => trimmed
            .get(open.saturating_add(1)..close)
            .map_or(trimmed, str::trim),
        _ => trimmed,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot load catalog: {0}")]
    Load(#[from] pct_util::error::UtilError),
    #[error("malformed catalog document: {source}")]
    Parse { source: serde_json::Error },
    #[error("invalid catalog: {message}")]
    Invalid { message: String },
}
