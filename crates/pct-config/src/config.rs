use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default `group:artifact` of the core dependency pinned in every descriptor.
pub const DEFAULT_CORE_COORDINATE: &str = "org.jenkins-ci.main:jenkins-core";

/// Group id assumed for catalog plugins that do not publish a `gav`.
pub const DEFAULT_PLUGIN_GROUP: &str = "org.jenkins-ci.plugins";

/// The `pct.toml` tester configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TesterConfig {
    /// Catalog feed location: an `http(s)://` URL or a local path.
    pub catalog_url: String,
    /// Root for per-plugin checkouts and build logs. Must already exist.
    pub working_directory: PathBuf,
    /// Where the compatibility report is read from and written to.
    pub report_file: PathBuf,
    /// `group:artifact` of the core dependency.
    #[serde(default = "default_core_coordinate")]
    pub core_coordinate: String,
    #[serde(default = "default_plugin_group")]
    pub default_plugin_group: String,
    /// Only these plugin ids are tested when set (case-insensitive).
    #[serde(default)]
    pub include_plugins: Option<PluginList>,
    #[serde(default)]
    pub exclude_plugins: Vec<String>,
    /// Abort the run on the first build failure.
    #[serde(default)]
    pub fail_fast: bool,
    /// Number of plugins tested concurrently; 1 runs them one after another.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Register the coverage hook.
    #[serde(default)]
    pub coverage: bool,
    /// Names of registered hooks to drop.
    #[serde(default)]
    pub exclude_hooks: Vec<String>,
    /// Declarative per-plugin argument hooks.
    #[serde(default)]
    pub hooks: Vec<HookConfig>,
    /// Dependency ids moved from runtime scope to test scope.
    #[serde(default)]
    pub convert_to_test: Vec<String>,
    #[serde(default)]
    pub maven: MavenConfig,
}

/// A plugin allow-list written either as `"a,b,c"` or as `["a", "b", "c"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginList {
    Csv(String),
    List(Vec<String>),
}

impl PluginList {
    /// The ids in this list, trimmed, lower-cased, empties dropped.
    pub fn ids(&self) -> Vec<String> {
        match self {
            PluginList::Csv(csv) => parse_plugin_list(csv),
            PluginList::List(ids) => ids
                .iter()
                .map(|id| id.trim().to_lowercase())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }
}

/// Split a comma-separated plugin id list.
pub fn parse_plugin_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|id| id.trim().to_lowercase())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Settings for the external build tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MavenConfig {
    /// Explicit executable; the platform default `mvn` is used when absent.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Settings file passed with `-s`.
    #[serde(default)]
    pub settings_file: Option<PathBuf>,
    /// Arguments appended after the `-D` properties.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Extra `-D` properties for every build.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Tasks run for each plugin before hooks adjust them.
    #[serde(default = "default_test_tasks")]
    pub test_tasks: Vec<String>,
}

impl Default for MavenConfig {
    fn default() -> Self {
        Self {
            executable: None,
            settings_file: None,
            extra_args: Vec::new(),
            properties: BTreeMap::new(),
            test_tasks: default_test_tasks(),
        }
    }
}

/// A `[[hooks]]` entry: append `args` to the build of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    pub name: String,
    pub plugin: String,
    #[serde(default)]
    pub priority: i32,
    pub args: Vec<String>,
}

fn default_core_coordinate() -> String {
    DEFAULT_CORE_COORDINATE.to_owned()
}

fn default_plugin_group() -> String {
    DEFAULT_PLUGIN_GROUP.to_owned()
}

fn default_workers() -> usize {
    1
}

fn default_test_tasks() -> Vec<String> {
    ["hpi:resolve-test-dependencies", "hpi:test-hpl", "surefire:test"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

impl TesterConfig {
    /// A configuration with defaults for everything but the three required locations.
    pub fn new(catalog_url: &str, working_directory: &Path, report_file: &Path) -> Self {
        Self {
            catalog_url: catalog_url.to_owned(),
            working_directory: working_directory.to_path_buf(),
            report_file: report_file.to_path_buf(),
            core_coordinate: default_core_coordinate(),
            default_plugin_group: default_plugin_group(),
            include_plugins: None,
            exclude_plugins: Vec::new(),
            fail_fast: false,
            workers: default_workers(),
            coverage: false,
            exclude_hooks: Vec::new(),
            hooks: Vec::new(),
            convert_to_test: Vec::new(),
            maven: MavenConfig::default(),
        }
    }

    /// Read and parse a `pct.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Check the settings that cannot be expressed in the TOML schema.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the working directory does not exist,
    /// `workers` is zero, or `core_coordinate` is not `group:artifact`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        pct_util::fs::require_dir(&self.working_directory).map_err(|e| ConfigError::Invalid {
            message: format!("working directory: {e}"),
        })?;
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                message: "workers must be at least 1".to_owned(),
            });
        }
        self.core_group_artifact()?;
        Ok(())
    }

    /// Split `core_coordinate` into group and artifact.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` unless it has two non-empty parts.
    pub fn core_group_artifact(&self) -> Result<(&str, &str), ConfigError> {
        match self.core_coordinate.split_once(':') {
            Some((group, artifact))
                if !group.is_empty() && !artifact.is_empty() && !artifact.contains(':') =>
            {
                Ok((group, artifact))
            }
            _ => Err(ConfigError::Invalid {
                message: format!(
                    "core_coordinate \"{}\" must be group:artifact",
                    self.core_coordinate
                ),
            }),
        }
    }

    /// Whether a plugin id passes the include and exclude lists.
    pub fn selects(&self, plugin_id: &str) -> bool {
        let id = plugin_id.to_lowercase();
        if self
            .exclude_plugins
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(&id))
        {
            return false;
        }
        match &self.include_plugins {
            Some(list) => list.ids().contains(&id),
            None => true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid pct.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}
