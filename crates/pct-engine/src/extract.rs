//! Recover plugin source metadata from a packaged plugin artifact.
//!
//! Strategies are tried in priority order (highest first). The first one that
//! produces metadata wins; a strategy that cannot read its input is logged and
//! skipped so the next one gets a chance.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::EngineError;
use crate::metadata::PluginMetadata;
use crate::priority::{rank, Ranked};

/// One way of recovering [`PluginMetadata`] from an artifact.
pub trait MetadataExtractor: Ranked + Send + Sync {
    /// `Ok(None)` when the artifact does not carry what this strategy looks for.
    ///
    /// # Errors
    /// Returns an error if the artifact cannot be read.
    fn extract_metadata(
        &self,
        plugin_id: &str,
        artifact: &Path,
    ) -> Result<Option<PluginMetadata>, EngineError>;
}

/// Ordered set of extraction strategies.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn MetadataExtractor>>,
}

impl ExtractorRegistry {
    pub fn new(mut extractors: Vec<Box<dyn MetadataExtractor>>) -> Self {
        rank(&mut extractors);
        Self { extractors }
    }

    /// The manifest strategy followed by the embedded descriptor strategy.
    pub fn with_builtin() -> Self {
        Self::new(vec![Box::new(ManifestExtractor), Box::new(PomExtractor)])
    }

    pub fn names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Run the strategies until one yields metadata.
    ///
    /// # Errors
    /// Returns `EngineError::MetadataExtraction` when every strategy comes up
    /// empty, listing why each one failed.
    pub fn extract(&self, plugin_id: &str, artifact: &Path) -> Result<PluginMetadata, EngineError> {
        let mut reasons = Vec::new();
        for extractor in &self.extractors {
            match extractor.extract_metadata(plugin_id, artifact) {
                Ok(Some(meta)) => {
                    log::debug!("{plugin_id}: metadata from {}", extractor.name());
                    return Ok(meta);
                }
                Ok(None) => reasons.push(format!("{}: nothing found", extractor.name())),
                Err(e) => {
                    log::warn!("{plugin_id}: {} failed: {e}", extractor.name());
                    reasons.push(format!("{}: {e}", extractor.name()));
                }
            }
        }
        if reasons.is_empty() {
            reasons.push("no extractors registered".to_owned());
        }
        Err(EngineError::MetadataExtraction {
            plugin: plugin_id.to_owned(),
            reason: reasons.join("; "),
        })
    }
}

/// Reads the plugin attributes of `META-INF/MANIFEST.MF`.
pub struct ManifestExtractor;

impl Ranked for ManifestExtractor {
    fn name(&self) -> &str {
        "manifest"
    }

    fn priority(&self) -> i32 {
        100
    }
}

impl MetadataExtractor for ManifestExtractor {
    fn extract_metadata(
        &self,
        plugin_id: &str,
        artifact: &Path,
    ) -> Result<Option<PluginMetadata>, EngineError> {
        let mut archive = open_archive(artifact)?;
        let Some(bytes) = read_entry(&mut archive, artifact, "META-INF/MANIFEST.MF")? else {
            return Ok(None);
        };
        let attributes = parse_manifest(&String::from_utf8_lossy(&bytes));
        let get = |key: &str| {
            attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        };

        let scm = get("Plugin-ScmConnection")
            .map(strip_scm_prefix)
            .or_else(|| get("Plugin-ScmUrl"));
        let commit = get("Plugin-GitHash");
        let (Some(scm), Some(commit)) = (scm, commit) else {
            return Ok(None);
        };

        let mut builder = PluginMetadata::builder()
            .plugin_id(get("Short-Name").unwrap_or(plugin_id))
            .scm_url(scm)
            .git_commit(commit);
        if let Some(module) = get("Plugin-Module") {
            builder = builder.module_path(module);
        }
        if let Some(version) = get("Plugin-Version") {
            builder = builder.version(version);
        }
        Ok(Some(builder.build()?))
    }
}

/// Reads the `<scm>` section of the descriptor embedded under `META-INF/maven/`.
pub struct PomExtractor;

impl Ranked for PomExtractor {
    fn name(&self) -> &str {
        "embedded-pom"
    }
}

impl MetadataExtractor for PomExtractor {
    fn extract_metadata(
        &self,
        plugin_id: &str,
        artifact: &Path,
    ) -> Result<Option<PluginMetadata>, EngineError> {
        let mut archive = open_archive(artifact)?;
        let pom_name = archive
            .file_names()
            .filter(|name| name.starts_with("META-INF/maven/") && name.ends_with("/pom.xml"))
            .min()
            .map(str::to_owned);
        let Some(pom_name) = pom_name else {
            return Ok(None);
        };
        let Some(bytes) = read_entry(&mut archive, artifact, &pom_name)? else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(&bytes);
        let doc = roxmltree::Document::parse(&text).map_err(|e| EngineError::Artifact {
            path: format!("{}!{pom_name}", artifact.display()),
            message: e.to_string(),
        })?;
        let project = doc.root_element();
        let Some(scm) = child(project, "scm") else {
            return Ok(None);
        };

        let url = child_text(scm, "connection")
            .or_else(|| child_text(scm, "developerConnection"))
            .map(strip_scm_prefix)
            .or_else(|| child_text(scm, "url"));
        let artifact_id = child_text(project, "artifactId").unwrap_or(plugin_id);
        let version = child_text(project, "version")
            .or_else(|| child(project, "parent").and_then(|p| child_text(p, "version")));
        // Releases leave `HEAD` in the tag; the release plugin tags `artifactId-version`.
        let tag = child_text(scm, "tag")
            .filter(|tag| *tag != "HEAD")
            .map(str::to_owned)
            .or_else(|| version.map(|v| format!("{artifact_id}-{v}")));

        let (Some(url), Some(tag)) = (url, tag) else {
            return Ok(None);
        };
        let mut builder = PluginMetadata::builder()
            .plugin_id(plugin_id)
            .scm_url(url)
            .git_commit(&tag);
        if let Some(version) = version {
            builder = builder.version(version);
        }
        Ok(Some(builder.build()?))
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, EngineError> {
    let file = File::open(path).map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    ZipArchive::new(file).map_err(|e| EngineError::Artifact {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
    name: &str,
) -> Result<Option<Vec<u8>>, EngineError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(EngineError::Artifact {
                path: path.display().to_string(),
                message: format!("{name}: {e}"),
            })
        }
    };
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| EngineError::Artifact {
            path: path.display().to_string(),
            message: format!("{name}: {e}"),
        })?;
    Ok(Some(bytes))
}

/// Parse manifest main attributes, joining continuation lines.
fn parse_manifest(text: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            // Main section ends at the first blank line.
            break;
        }
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some((_, value)) = attributes.last_mut() {
                value.push_str(rest);
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            attributes.push((key.trim().to_owned(), value.trim_start().to_owned()));
        }
    }
    attributes
}

fn strip_scm_prefix(url: &str) -> &str {
    url.strip_prefix("scm:git:").unwrap_or(url)
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
