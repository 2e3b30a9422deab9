//! The compatibility report: one result per (plugin, core) pair.
//!
//! Everything in the report is kept sorted so that serializing equal reports
//! gives byte-identical output however the results were inserted. Core
//! coordinates sort by version, so inserting a coordinate whose version
//! cannot be ordered against the existing ones fails.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use pct_version::{Coordinate, VersionError};

use crate::error::EngineError;

/// Outcome of testing one plugin against one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Success,
    Failure,
    /// The plugin could not be prepared for testing.
    Skipped,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Success => "SUCCESS",
            TestStatus::Failure => "FAILURE",
            TestStatus::Skipped => "SKIPPED",
        }
    }
}

/// Identity of a tested plugin release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub url: String,
}

impl PluginInfo {
    pub fn new(name: &str, version: &str, url: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
            url: url.to_owned(),
        }
    }

    /// Catalog order: case-insensitive id, then version and URL.
    fn sort_key(&self) -> PluginKey {
        (self.name.to_lowercase(), self.version.clone(), self.url.clone())
    }
}

type PluginKey = (String, String, String);

/// Result of one plugin against one core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatResult {
    #[serde(rename = "core")]
    pub core_coordinate: Coordinate,
    pub status: TestStatus,
    #[serde(rename = "date")]
    pub executed_on: DateTime<Utc>,
    #[serde(rename = "buildLogPath")]
    pub build_log_path: Option<String>,
    #[serde(rename = "err", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "warn", default, skip_serializing_if = "Vec::is_empty")]
    pub warning_messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
    #[serde(rename = "failedTests", default, skip_serializing_if = "Vec::is_empty")]
    pub failed_tests: Vec<String>,
}

impl CompatResult {
    pub fn new(core: &Coordinate, status: TestStatus) -> Self {
        Self {
            core_coordinate: core.clone(),
            status,
            executed_on: Utc::now(),
            build_log_path: None,
            error_message: None,
            warning_messages: Vec::new(),
            tests: Vec::new(),
            failed_tests: Vec::new(),
        }
    }

    /// Report order: core version, then core group and artifact, then status.
    ///
    /// # Errors
    /// Fails when the core versions cannot be ordered.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, VersionError> {
        Ok(coordinate_order(&self.core_coordinate, &other.core_coordinate)?
            .then_with(|| self.status.cmp(&other.status)))
    }
}

fn coordinate_order(a: &Coordinate, b: &Coordinate) -> Result<Ordering, VersionError> {
    Ok(a.version_order(b)?
        .then_with(|| a.group.cmp(&b.group))
        .then_with(|| a.artifact.cmp(&b.artifact)))
}

/// First index at which `item` can be inserted after every element not greater than it.
fn sorted_position<T>(
    items: &[T],
    item: &T,
    cmp: impl Fn(&T, &T) -> Result<Ordering, VersionError>,
) -> Result<usize, VersionError> {
    for (index, existing) in items.iter().enumerate() {
        if cmp(existing, item)? == Ordering::Greater {
            return Ok(index);
        }
    }
    Ok(items.len())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PluginEntry {
    plugin: PluginInfo,
    results: Vec<CompatResult>,
}

/// Accumulated results of one or more runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatReport {
    tested_cores: Vec<Coordinate>,
    plugins: BTreeMap<PluginKey, PluginEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument {
    core_coordinates: Vec<Coordinate>,
    plugins: Vec<PluginInfo>,
    results: Vec<PluginResults>,
}

#[derive(Serialize, Deserialize)]
struct PluginResults {
    plugin: PluginInfo,
    results: Vec<CompatResult>,
}

impl CompatReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.tested_cores.is_empty()
    }

    /// Tested core coordinates, ascending by version.
    pub fn tested_cores(&self) -> &[Coordinate] {
        &self.tested_cores
    }

    /// Plugins with their results, in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = (&PluginInfo, &[CompatResult])> {
        self.plugins
            .values()
            .map(|entry| (&entry.plugin, entry.results.as_slice()))
    }

    /// The result of `plugin` against exactly `core`, if recorded.
    pub fn result(&self, plugin: &PluginInfo, core: &Coordinate) -> Option<&CompatResult> {
        self.plugins
            .get(&plugin.sort_key())?
            .results
            .iter()
            .find(|r| r.core_coordinate == *core)
    }

    /// Record a result, replacing any earlier result for the same plugin and core.
    ///
    /// The report is unchanged when this fails.
    ///
    /// # Errors
    /// Returns `VersionError::Incomparable` if the result's core version cannot
    /// be ordered against the cores already in the report.
    pub fn add_result(&mut self, plugin: &PluginInfo, result: CompatResult) -> Result<(), VersionError> {
        self.add_core(&result.core_coordinate)?;

        let key = plugin.sort_key();
        let mut results: Vec<CompatResult> = self
            .plugins
            .get(&key)
            .map(|entry| {
                entry
                    .results
                    .iter()
                    .filter(|r| r.core_coordinate != result.core_coordinate)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let position = sorted_position(&results, &result, CompatResult::try_cmp)?;
        results.insert(position, result);
        self.plugins.insert(
            key,
            PluginEntry {
                plugin: plugin.clone(),
                results,
            },
        );
        Ok(())
    }

    fn add_core(&mut self, core: &Coordinate) -> Result<(), VersionError> {
        if self.tested_cores.contains(core) {
            return Ok(());
        }
        let position = sorted_position(&self.tested_cores, core, coordinate_order)?;
        self.tested_cores.insert(position, core.clone());
        Ok(())
    }

    /// Fold `other` into this report; `other` wins where both have a result.
    ///
    /// # Errors
    /// Fails like [`CompatReport::add_result`]. Results merged before the
    /// failing one stay merged.
    pub fn merge(&mut self, other: &CompatReport) -> Result<(), VersionError> {
        for core in &other.tested_cores {
            self.add_core(core)?;
        }
        for entry in other.plugins.values() {
            for result in &entry.results {
                self.add_result(&entry.plugin, result.clone())?;
            }
        }
        Ok(())
    }

    fn to_document(&self) -> ReportDocument {
        ReportDocument {
            core_coordinates: self.tested_cores.clone(),
            plugins: self.plugins.values().map(|e| e.plugin.clone()).collect(),
            results: self
                .plugins
                .values()
                .map(|e| PluginResults {
                    plugin: e.plugin.clone(),
                    results: e.results.clone(),
                })
                .collect(),
        }
    }

    fn from_document(doc: ReportDocument) -> Result<Self, EngineError> {
        let mut report = Self::new();
        for core in &doc.core_coordinates {
            report.add_core(core)?;
        }
        for entry in doc.results {
            for result in entry.results {
                report.add_result(&entry.plugin, result)?;
            }
        }
        Ok(report)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `EngineError::Report` if serialization fails.
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(&self.to_document()).map_err(|e| EngineError::Report {
            message: e.to_string(),
        })
    }

    /// Parse a report written by [`CompatReport::to_json`].
    ///
    /// # Errors
    /// Returns `EngineError::Report` on malformed JSON and
    /// `EngineError::Version` if its core versions cannot be ordered.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let doc: ReportDocument = serde_json::from_str(text).map_err(|e| EngineError::Report {
            message: e.to_string(),
        })?;
        Self::from_document(doc)
    }

    /// JSON, gzip-compressed and base64-encoded.
    ///
    /// # Errors
    /// Fails if serialization or compression fails.
    pub fn encode_compressed(&self) -> Result<String, EngineError> {
        Ok(pct_util::compress::compress(&self.to_json()?)?)
    }

    /// # Errors
    /// Fails if `encoded` is not a compressed report.
    pub fn decode_compressed(encoded: &str) -> Result<Self, EngineError> {
        Self::from_json(&pct_util::compress::decompress(encoded)?)
    }

    /// Load a report from disk; a missing file is an empty report.
    ///
    /// # Errors
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        Self::from_json(&pct_util::fs::read_to_string(path)?)
    }

    /// Write the report as JSON, replacing the file atomically.
    ///
    /// # Errors
    /// Fails if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let mut json = self.to_json()?;
        json.push('\n');
        pct_util::fs::write_atomic(path, json.as_bytes())?;
        log::info!("wrote report to {}", path.display());
        Ok(())
    }

    /// An XML rendering of the report.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<report>\n");
        out.push_str("  <testedCoreCoordinates>\n");
        for core in &self.tested_cores {
            out.push_str(&format!(
                "    <coord g=\"{}\" a=\"{}\" v=\"{}\"/>\n",
                xml_escape(&core.group),
                xml_escape(&core.artifact),
                xml_escape(&core.version)
            ));
        }
        out.push_str("  </testedCoreCoordinates>\n  <plugins>\n");
        for entry in self.plugins.values() {
            out.push_str(&format!(
                "    <plugin name=\"{}\" version=\"{}\" url=\"{}\">\n",
                xml_escape(&entry.plugin.name),
                xml_escape(&entry.plugin.version),
                xml_escape(&entry.plugin.url)
            ));
            for result in &entry.results {
                write_result_xml(&mut out, result);
            }
            out.push_str("    </plugin>\n");
        }
        out.push_str("  </plugins>\n</report>\n");
        out
    }
}

fn write_result_xml(out: &mut String, result: &CompatResult) {
    out.push_str(&format!(
        "      <result core=\"{}\" status=\"{}\" date=\"{}\"",
        xml_escape(&result.core_coordinate.to_string()),
        result.status.as_str(),
        result.executed_on.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    if let Some(log) = &result.build_log_path {
        out.push_str(&format!(" buildLogPath=\"{}\"", xml_escape(log)));
    }
    let children = result.error_message.is_some()
        || !result.warning_messages.is_empty()
        || !result.tests.is_empty()
        || !result.failed_tests.is_empty();
    if !children {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    if let Some(err) = &result.error_message {
        out.push_str(&format!("        <error>{}</error>\n", xml_escape(err)));
    }
    for warning in &result.warning_messages {
        out.push_str(&format!("        <warning>{}</warning>\n", xml_escape(warning)));
    }
    for test in &result.tests {
        let failed = result.failed_tests.contains(test);
        out.push_str(&format!(
            "        <test name=\"{}\" failed=\"{failed}\"/>\n",
            xml_escape(test)
        ));
    }
    out.push_str("      </result>\n");
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
