//! Validated plugin metadata: where a plugin's source lives and which commit built it.

/// Validation failures when building [`PluginMetadata`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("plugin metadata is missing required field `{field}`")]
    MissingField { field: &'static str },
}

/// Source location of one plugin release.
///
/// Construct through [`PluginMetadata::builder`]; once built the value is
/// immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    plugin_id: String,
    scm_url: String,
    git_commit: String,
    module_path: Option<String>,
    version: Option<String>,
}

impl PluginMetadata {
    pub fn builder() -> PluginMetadataBuilder {
        PluginMetadataBuilder::default()
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn scm_url(&self) -> &str {
        &self.scm_url
    }

    pub fn git_commit(&self) -> &str {
        &self.git_commit
    }

    /// Subdirectory of the checkout holding the plugin, for multi-module repositories.
    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Accumulates fields for a [`PluginMetadata`].
#[derive(Debug, Clone, Default)]
pub struct PluginMetadataBuilder {
    plugin_id: Option<String>,
    scm_url: Option<String>,
    git_commit: Option<String>,
    module_path: Option<String>,
    version: Option<String>,
}

impl PluginMetadataBuilder {
    pub fn plugin_id(mut self, id: &str) -> Self {
        self.plugin_id = Some(id.to_owned());
        self
    }

    pub fn scm_url(mut self, url: &str) -> Self {
        self.scm_url = Some(url.to_owned());
        self
    }

    pub fn git_commit(mut self, commit: &str) -> Self {
        self.git_commit = Some(commit.to_owned());
        self
    }

    pub fn module_path(mut self, module: &str) -> Self {
        self.module_path = Some(module.to_owned());
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_owned());
        self
    }

    /// Validate and build.
    ///
    /// Blank values count as missing. A blank module path or version is
    /// treated as absent.
    ///
    /// # Errors
    /// Returns `MetadataError::MissingField` naming the first absent required
    /// field (`plugin_id`, `scm_url`, `git_commit`).
    pub fn build(self) -> Result<PluginMetadata, MetadataError> {
        Ok(PluginMetadata {
            plugin_id: required(self.plugin_id, "plugin_id")?,
            scm_url: required(self.scm_url, "scm_url")?,
            git_commit: required(self.git_commit, "git_commit")?,
            module_path: optional(self.module_path),
            version: optional(self.version),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, MetadataError> {
    optional(value).ok_or(MetadataError::MissingField { field })
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete() -> PluginMetadataBuilder {
        PluginMetadata::builder()
            .plugin_id("credentials")
            .scm_url("https://github.com/jenkinsci/credentials-plugin.git")
            .git_commit("0a1b2c3")
    }

    #[test]
    fn builds_with_required_fields() {
        let meta = complete().build().unwrap();
        assert_eq!(meta.plugin_id(), "credentials");
        assert_eq!(meta.git_commit(), "0a1b2c3");
        assert_eq!(meta.module_path(), None);
        assert_eq!(meta.version(), None);
    }

    #[test]
    fn missing_scm_url_fails() {
        let err = PluginMetadata::builder()
            .plugin_id("credentials")
            .git_commit("0a1b2c3")
            .build()
            .unwrap_err();
        assert_eq!(err, MetadataError::MissingField { field: "scm_url" });
    }

    #[test]
    fn missing_plugin_id_reported_first() {
        let err = PluginMetadata::builder().build().unwrap_err();
        assert_eq!(err, MetadataError::MissingField { field: "plugin_id" });
    }

    #[test]
    fn blank_commit_counts_as_missing() {
        let err = complete().git_commit("  ").build().unwrap_err();
        assert_eq!(err, MetadataError::MissingField { field: "git_commit" });
    }

    #[test]
    fn blank_optional_fields_are_absent() {
        let meta = complete().module_path("").version(" ").build().unwrap();
        assert_eq!(meta.module_path(), None);
        assert_eq!(meta.version(), None);
    }
}
