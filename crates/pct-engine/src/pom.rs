//! Build descriptor (`pom.xml`) rewriting.
//!
//! The descriptor is parsed only to locate nodes; edits are spliced into the
//! original text by byte range, so everything outside the edited nodes
//! (comments, ordering, whitespace, unrelated elements) is preserved exactly.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node, ParsingOptions};

use pct_version::Coordinate;

/// Property Jenkins plugin parents use to select the core version.
pub const CORE_VERSION_PROPERTY: &str = "jenkins.version";

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("build descriptor not found at {}", .path.display())]
    Missing { path: PathBuf },
    #[error("{0}")]
    Io(#[from] pct_util::error::UtilError),
    #[error("malformed build descriptor: {message}")]
    Malformed { message: String },
}

/// A `<dependency>` declared directly under `<project><dependencies>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub group_id: String,
    pub artifact_id: String,
    /// `<version>`, with a `${property}` reference resolved against the
    /// descriptor's own `<properties>` when defined there.
    pub version: Option<String>,
    pub scope: Option<String>,
}

impl DeclaredDependency {
    pub fn is_test(&self) -> bool {
        self.scope.as_deref() == Some("test")
    }
}

/// Dependency edits keyed by artifact id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyOverrides {
    /// Added with default scope when not already declared.
    pub add_main: BTreeMap<String, String>,
    /// Added with `test` scope when not already declared.
    pub add_test: BTreeMap<String, String>,
    /// New versions for declared non-test dependencies.
    pub replace_main: BTreeMap<String, String>,
    /// New versions for declared test dependencies.
    pub replace_test: BTreeMap<String, String>,
    /// Declared runtime dependencies moved to test scope.
    pub convert_to_test: BTreeSet<String>,
}

impl DependencyOverrides {
    pub fn is_empty(&self) -> bool {
        self.add_main.is_empty()
            && self.add_test.is_empty()
            && self.replace_main.is_empty()
            && self.replace_test.is_empty()
            && self.convert_to_test.is_empty()
    }
}

/// Everything needed to rewrite one descriptor.
#[derive(Debug, Clone)]
pub struct RewritePlan {
    pub core: Coordinate,
    /// Property pinned to the core version when the descriptor defines it.
    pub core_version_property: Option<String>,
    pub overrides: DependencyOverrides,
    /// Group id per artifact id; missing entries use `default_group`.
    pub group_ids: BTreeMap<String, String>,
    pub default_group: String,
}

impl RewritePlan {
    pub fn new(core: &Coordinate, default_group: &str) -> Self {
        Self {
            core: core.clone(),
            core_version_property: Some(CORE_VERSION_PROPERTY.to_owned()),
            overrides: DependencyOverrides::default(),
            group_ids: BTreeMap::new(),
            default_group: default_group.to_owned(),
        }
    }

    fn group_of(&self, artifact_id: &str) -> &str {
        self.group_ids
            .get(artifact_id)
            .map_or(self.default_group.as_str(), String::as_str)
    }
}

/// What a rewrite changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub core_pinned: bool,
    pub replaced: Vec<String>,
    pub added: Vec<String>,
    pub converted: Vec<String>,
}

/// Read the dependencies declared directly under the project.
///
/// # Errors
/// Returns `RewriteError::Malformed` if the text is not a project descriptor.
pub fn declared_dependencies(text: &str) -> Result<Vec<DeclaredDependency>, RewriteError> {
    let doc = parse(text)?;
    let project = project_element(&doc)?;
    let properties = child(project, "properties");
    let resolve = |value: &'_ str| -> String {
        property_reference(value)
            .and_then(|name| properties.and_then(|p| child(p, name)))
            .and_then(trimmed_text)
            .unwrap_or(value)
            .to_owned()
    };
    Ok(dependency_nodes(project)
        .iter()
        .map(|dep| DeclaredDependency {
            group_id: dep.group.to_owned(),
            artifact_id: dep.artifact.to_owned(),
            version: dep.version.and_then(trimmed_text).map(&resolve),
            scope: dep.scope.and_then(trimmed_text).map(str::to_owned),
        })
        .collect())
}

/// Rewrite the descriptor at `path` in place.
///
/// # Errors
/// Returns `RewriteError::Missing` if there is no file at `path`, and
/// otherwise fails like [`rewrite_str`] or on I/O errors.
pub fn rewrite_descriptor(path: &Path, plan: &RewritePlan) -> Result<RewriteSummary, RewriteError> {
    if !path.is_file() {
        return Err(RewriteError::Missing {
            path: path.to_path_buf(),
        });
    }
    let text = pct_util::fs::read_to_string(path)?;
    let (rewritten, summary) = rewrite_str(&text, plan)?;
    if rewritten != text {
        pct_util::fs::write_atomic(path, rewritten.as_bytes())?;
    }
    log::info!(
        "rewrote {}: core pinned={}, replaced {:?}, added {:?}, converted {:?}",
        path.display(),
        summary.core_pinned,
        summary.replaced,
        summary.added,
        summary.converted
    );
    Ok(summary)
}

/// Apply `plan` to descriptor text.
///
/// 1. The core dependency's version (or the property it references) and the
///    core version property are set to the core version.
/// 2. Declared dependencies in the replace sets get the new version, matching
///    test-scoped dependencies only against `replace_test` and the rest only
///    against `replace_main`.
/// 3. Dependencies in the convert set move to test scope.
/// 4. Add-set entries not declared in any scope are appended to the project's
///    `<dependencies>`, creating it when absent.
///
/// # Errors
/// Returns `RewriteError::Malformed` if the text is not well-formed XML or
/// its root is not `<project>`.
pub fn rewrite_str(text: &str, plan: &RewritePlan) -> Result<(String, RewriteSummary), RewriteError> {
    let doc = parse(text)?;
    let project = project_element(&doc)?;
    let layout = Layout::infer(text, project);
    let properties = child(project, "properties");
    let deps = dependency_nodes(project);

    let mut edits = Edits::default();
    let mut pinned = BTreeMap::new();
    let mut summary = RewriteSummary::default();

    // 1. Core.
    for dep in deps
        .iter()
        .filter(|d| d.group == plan.core.group && d.artifact == plan.core.artifact)
    {
        set_version(&mut edits, text, &layout, properties, dep, &plan.core.version, &mut pinned);
        summary.core_pinned = true;
    }
    if let Some(name) = &plan.core_version_property {
        if let Some(property) = properties.and_then(|p| child(p, name)) {
            let owner = pinned
                .entry(name.clone())
                .or_insert_with(|| plan.core.version.clone());
            if *owner == plan.core.version {
                edits.set_text(property, &plan.core.version);
                summary.core_pinned = true;
            }
        }
    }

    // 2-3. Declared dependencies.
    let overrides = &plan.overrides;
    for dep in &deps {
        if dep.group != plan.group_of(dep.artifact) {
            continue;
        }
        let replacements = if dep.is_test() {
            &overrides.replace_test
        } else {
            &overrides.replace_main
        };
        if let Some(version) = replacements.get(dep.artifact) {
            set_version(&mut edits, text, &layout, properties, dep, version, &mut pinned);
            summary.replaced.push(dep.artifact.to_owned());
        }
        if overrides.convert_to_test.contains(dep.artifact) && !dep.is_test() {
            convert_to_test(&mut edits, text, &layout, dep);
            summary.converted.push(dep.artifact.to_owned());
        }
    }

    // 4. Additions.
    let mut additions = Vec::new();
    let declared = |artifact: &str| {
        deps.iter()
            .any(|d| d.artifact == artifact && d.group == plan.group_of(artifact))
    };
    for (scope, table) in [(None, &overrides.add_main), (Some("test"), &overrides.add_test)] {
        for (artifact, version) in table {
            if declared(artifact) || summary.added.contains(artifact) {
                continue;
            }
            additions.push(NewDependency {
                group: plan.group_of(artifact),
                artifact,
                version,
                scope,
            });
            summary.added.push(artifact.clone());
        }
    }
    if !additions.is_empty() {
        add_dependencies(&mut edits, text, &layout, project, &deps, &additions)?;
    }

    Ok((edits.apply(text)?, summary))
}

fn parse(text: &str) -> Result<Document<'_>, RewriteError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).map_err(|e| RewriteError::Malformed {
        message: e.to_string(),
    })
}

fn project_element<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>, RewriteError> {
    let root = doc.root_element();
    if root.tag_name().name() == "project" {
        Ok(root)
    } else {
        Err(RewriteError::Malformed {
            message: format!("root element is <{}>, expected <project>", root.tag_name().name()),
        })
    }
}

/// Located parts of one `<dependency>`.
struct DependencyNode<'a, 'input> {
    node: Node<'a, 'input>,
    group: &'a str,
    artifact: &'a str,
    artifact_node: Node<'a, 'input>,
    version: Option<Node<'a, 'input>>,
    scope: Option<Node<'a, 'input>>,
    packaging: Option<Node<'a, 'input>>,
}

impl DependencyNode<'_, '_> {
    fn is_test(&self) -> bool {
        self.scope.and_then(trimmed_text) == Some("test")
    }
}

fn dependency_nodes<'a, 'input>(project: Node<'a, 'input>) -> Vec<DependencyNode<'a, 'input>> {
    let Some(dependencies) = child(project, "dependencies") else {
        return Vec::new();
    };
    dependencies
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "dependency")
        .filter_map(|node| {
            let group = child(node, "groupId").and_then(trimmed_text)?;
            let artifact_node = child(node, "artifactId")?;
            let artifact = trimmed_text(artifact_node)?;
            Some(DependencyNode {
                node,
                group,
                artifact,
                artifact_node,
                version: child(node, "version"),
                scope: child(node, "scope"),
                packaging: child(node, "type"),
            })
        })
        .collect()
}

/// Point `dep` at `version`, through its `${property}` when the descriptor
/// defines that property and no other rewrite pinned it to something else.
fn set_version(
    edits: &mut Edits,
    text: &str,
    layout: &Layout,
    properties: Option<Node<'_, '_>>,
    dep: &DependencyNode<'_, '_>,
    version: &str,
    pinned: &mut BTreeMap<String, String>,
) {
    let Some(version_node) = dep.version else {
        let indent = leading_indent(text, dep.artifact_node);
        edits.insert(
            dep.artifact_node.range().end,
            format!("{}{indent}<version>{}</version>", layout.newline, escape(version)),
        );
        return;
    };

    let reference = trimmed_text(version_node).and_then(property_reference);
    if let Some(name) = reference {
        if let Some(property) = properties.and_then(|p| child(p, name)) {
            let owner = pinned
                .entry(name.to_owned())
                .or_insert_with(|| version.to_owned());
            if owner.as_str() == version {
                edits.set_text(property, version);
                return;
            }
            log::warn!(
                "property `{name}` is already pinned to {owner}; setting {} to {version} directly",
                dep.artifact
            );
        }
    }
    edits.set_text(version_node, version);
}

fn convert_to_test(edits: &mut Edits, text: &str, layout: &Layout, dep: &DependencyNode<'_, '_>) {
    match dep.scope {
        Some(scope) => edits.set_text(scope, "test"),
        None => {
            let anchor = dep
                .node
                .children()
                .filter(Node::is_element)
                .last()
                .unwrap_or(dep.artifact_node);
            let indent = leading_indent(text, dep.artifact_node);
            edits.insert(
                anchor.range().end,
                format!("{}{indent}<scope>test</scope>", layout.newline),
            );
        }
    }
    // Runtime plugin packaging has no place on the test classpath.
    if let Some(packaging) = dep.packaging {
        if matches!(trimmed_text(packaging), Some("hpi" | "jpi")) {
            edits.set_text(packaging, "jar");
        }
    }
}

struct NewDependency<'a> {
    group: &'a str,
    artifact: &'a str,
    version: &'a str,
    scope: Option<&'a str>,
}

fn add_dependencies(
    edits: &mut Edits,
    text: &str,
    layout: &Layout,
    project: Node<'_, '_>,
    deps: &[DependencyNode<'_, '_>],
    additions: &[NewDependency<'_>],
) -> Result<(), RewriteError> {
    let render_all = |indent: &str, unit: &str| -> String {
        additions
            .iter()
            .map(|dep| render_dependency(dep, layout.newline, indent, unit))
            .collect()
    };

    if let Some(last) = deps.last() {
        let indent = leading_indent(text, last.node);
        let unit = dependency_unit(text, last, indent).unwrap_or(layout.unit.as_str());
        edits.insert(last.node.range().end, render_all(indent, unit));
        return Ok(());
    }

    let nl = layout.newline;
    let unit = layout.unit.as_str();
    if let Some(block) = child(project, "dependencies") {
        // Declared but holding no usable entries: regenerate the block.
        let indent = leading_indent(text, block);
        let inner = format!("{indent}{unit}");
        edits.replace(
            block.range(),
            format!("<dependencies>{}{nl}{indent}</dependencies>", render_all(&inner, unit)),
        );
        return Ok(());
    }

    let anchor = project
        .children()
        .filter(Node::is_element)
        .last()
        .ok_or_else(|| RewriteError::Malformed {
            message: "<project> has no child elements".to_owned(),
        })?;
    let indent = leading_indent(text, anchor);
    let inner = format!("{indent}{unit}");
    edits.insert(
        anchor.range().end,
        format!(
            "{nl}{nl}{indent}<dependencies>{}{nl}{indent}</dependencies>",
            render_all(&inner, unit)
        ),
    );
    Ok(())
}

fn render_dependency(dep: &NewDependency<'_>, nl: &str, indent: &str, unit: &str) -> String {
    let mut out = format!("{nl}{indent}<dependency>");
    let mut field = |name: &str, value: &str| {
        out.push_str(&format!("{nl}{indent}{unit}<{name}>{}</{name}>", escape(value)));
    };
    field("groupId", dep.group);
    field("artifactId", dep.artifact);
    field("version", dep.version);
    if let Some(scope) = dep.scope {
        field("scope", scope);
    }
    out.push_str(&format!("{nl}{indent}</dependency>"));
    out
}

/// Indentation step used inside an existing `<dependency>`.
fn dependency_unit<'t>(text: &'t str, dep: &DependencyNode<'_, '_>, outer: &str) -> Option<&'t str> {
    leading_indent(text, dep.artifact_node)
        .strip_prefix(outer)
        .filter(|unit| !unit.is_empty())
}

/// Newline and indentation conventions of a descriptor.
struct Layout {
    newline: &'static str,
    unit: String,
}

impl Layout {
    fn infer(text: &str, project: Node<'_, '_>) -> Self {
        let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let unit = project
            .children()
            .find(Node::is_element)
            .map(|first| leading_indent(text, first))
            .filter(|indent| !indent.is_empty())
            .unwrap_or("  ")
            .to_owned();
        Self { newline, unit }
    }
}

/// Whitespace between the start of the line and `node`, or `""` when other
/// content precedes it on that line.
fn leading_indent<'t>(text: &'t str, node: Node<'_, '_>) -> &'t str {
    let before = text.get(..node.range().start).unwrap_or("");
    let line = before.rsplit('\n').next().unwrap_or("");
    if line.chars().all(|c| c == ' ' || c == '\t') {
        line
    } else {
        ""
    }
}

/// Pending replacements keyed by `(start, end)` byte range of the original.
#[derive(Default)]
struct Edits {
    edits: BTreeMap<(usize, usize), String>,
}

impl Edits {
    fn replace(&mut self, range: std::ops::Range<usize>, replacement: String) {
        self.edits.insert((range.start, range.end), replacement);
    }

    fn insert(&mut self, at: usize, addition: String) {
        self.edits.entry((at, at)).or_default().push_str(&addition);
    }

    /// Replace the text content of `element`, keeping its tags when it holds
    /// a single text node.
    fn set_text(&mut self, element: Node<'_, '_>, value: &str) {
        let mut children = element.children();
        match (children.next(), children.next()) {
            (Some(only), None) if only.is_text() => self.replace(only.range(), escape(value)),
            _ => {
                let name = element.tag_name().name();
                self.replace(element.range(), format!("<{name}>{}</{name}>", escape(value)));
            }
        }
    }

    fn apply(self, text: &str) -> Result<String, RewriteError> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for ((start, end), replacement) in self.edits {
            let kept = text.get(cursor..start).ok_or_else(|| RewriteError::Malformed {
                message: format!("overlapping edits at byte {start}"),
            })?;
            out.push_str(kept);
            out.push_str(&replacement);
            cursor = end;
        }
        out.push_str(text.get(cursor..).unwrap_or(""));
        Ok(out)
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn trimmed_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.text().map(str::trim).filter(|t| !t.is_empty())
}

fn property_reference(value: &str) -> Option<&str> {
    value.strip_prefix("${")?.strip_suffix('}')
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.jenkins-ci.plugins</groupId>
    <artifactId>plugin</artifactId>
    <version>3.43</version>
  </parent>
  <artifactId>git-client</artifactId>
  <version>2.7.7</version>
  <properties>
    <jenkins.version>2.138.4</jenkins.version>
    <!-- keep me -->
    <java.level>8</java.level>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>credentials</artifactId>
      <version>2.1.16</version>
    </dependency>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>structs</artifactId>
      <version>1.17</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>
"#;

    fn core() -> Coordinate {
        Coordinate::new("org.jenkins-ci.main", "jenkins-core", "2.164.3")
    }

    fn plan() -> RewritePlan {
        RewritePlan::new(&core(), "org.jenkins-ci.plugins")
    }

    #[test]
    fn pins_core_and_replaces_main_dependency_preserving_everything_else() {
        let mut plan = plan();
        plan.overrides
            .replace_main
            .insert("credentials".to_owned(), "2.3.12".to_owned());

        let (out, summary) = rewrite_str(POM, &plan).unwrap();
        let expected = POM
            .replace("<jenkins.version>2.138.4<", "<jenkins.version>2.164.3<")
            .replace("<version>2.1.16<", "<version>2.3.12<");
        assert_eq!(out, expected);
        assert!(summary.core_pinned);
        assert_eq!(summary.replaced, vec!["credentials"]);
        assert!(summary.added.is_empty());
    }

    #[test]
    fn replacement_is_scope_aware() {
        let mut plan = plan();
        plan.overrides
            .replace_main
            .insert("structs".to_owned(), "1.20".to_owned());
        plan.overrides
            .replace_test
            .insert("credentials".to_owned(), "9.9".to_owned());

        let (out, summary) = rewrite_str(POM, &plan).unwrap();
        assert!(out.contains("<version>1.17</version>"));
        assert!(out.contains("<version>2.1.16</version>"));
        assert!(summary.replaced.is_empty());
    }

    #[test]
    fn adds_missing_dependencies_with_inferred_indentation() {
        let mut plan = plan();
        plan.overrides
            .add_test
            .insert("workflow-step-api".to_owned(), "2.19".to_owned());
        plan.overrides
            .add_main
            .insert("credentials".to_owned(), "2.3.12".to_owned());

        let (out, summary) = rewrite_str(POM, &plan).unwrap();
        assert_eq!(summary.added, vec!["workflow-step-api"]);
        let inserted = "      <scope>test</scope>
    </dependency>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>workflow-step-api</artifactId>
      <version>2.19</version>
      <scope>test</scope>
    </dependency>
  </dependencies>";
        assert!(out.contains(inserted), "{out}");
        assert_eq!(declared_dependencies(&out).unwrap().len(), 3);
    }

    #[test]
    fn creates_dependencies_block_when_absent() {
        let pom = "<project>\n  <artifactId>lonely</artifactId>\n</project>\n";
        let mut plan = plan();
        plan.overrides
            .add_main
            .insert("structs".to_owned(), "1.20".to_owned());
        plan.group_ids
            .insert("structs".to_owned(), "io.example".to_owned());

        let (out, _) = rewrite_str(pom, &plan).unwrap();
        assert_eq!(
            out,
            "<project>\n  <artifactId>lonely</artifactId>\n\n  <dependencies>\n    <dependency>\n      <groupId>io.example</groupId>\n      <artifactId>structs</artifactId>\n      <version>1.20</version>\n    </dependency>\n  </dependencies>\n</project>\n"
        );
    }

    #[test]
    fn core_version_reference_rewrites_property() {
        let pom = r#"<project>
  <properties>
    <core.version>2.100</core.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.jenkins-ci.main</groupId>
      <artifactId>jenkins-core</artifactId>
      <version>${core.version}</version>
    </dependency>
  </dependencies>
</project>"#;
        let (out, summary) = rewrite_str(pom, &plan()).unwrap();
        assert!(summary.core_pinned);
        assert!(out.contains("<core.version>2.164.3</core.version>"));
        assert!(out.contains("<version>${core.version}</version>"));
    }

    #[test]
    fn literal_core_version_is_pinned_in_place() {
        let pom = r#"<project>
  <dependencies>
    <dependency>
      <groupId>org.jenkins-ci.main</groupId>
      <artifactId>jenkins-core</artifactId>
      <version>2.100</version>
      <scope>provided</scope>
    </dependency>
  </dependencies>
</project>"#;
        let (out, summary) = rewrite_str(pom, &plan()).unwrap();
        assert!(summary.core_pinned);
        assert_eq!(out, pom.replace("<version>2.100<", "<version>2.164.3<"));
    }

    #[test]
    fn shared_property_conflict_falls_back_to_literal() {
        let pom = r#"<project>
  <properties>
    <shared.version>1.0</shared.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>a</artifactId>
      <version>${shared.version}</version>
    </dependency>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>b</artifactId>
      <version>${shared.version}</version>
    </dependency>
  </dependencies>
</project>"#;
        let mut plan = plan();
        plan.overrides.replace_main.insert("a".to_owned(), "2.0".to_owned());
        plan.overrides.replace_main.insert("b".to_owned(), "3.0".to_owned());
        let (out, _) = rewrite_str(pom, &plan).unwrap();
        assert!(out.contains("<shared.version>2.0</shared.version>"));
        assert!(out.contains("<version>3.0</version>"));
    }

    #[test]
    fn converts_runtime_dependency_to_test_scope() {
        let pom = r#"<project>
  <dependencies>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>matrix-auth</artifactId>
      <version>2.3</version>
      <type>hpi</type>
    </dependency>
  </dependencies>
</project>"#;
        let mut plan = plan();
        plan.overrides
            .convert_to_test
            .insert("matrix-auth".to_owned());
        let (out, summary) = rewrite_str(pom, &plan).unwrap();
        assert_eq!(summary.converted, vec!["matrix-auth"]);
        assert!(out.contains("      <type>jar</type>\n      <scope>test</scope>\n    </dependency>"), "{out}");
    }

    #[test]
    fn managed_version_gets_explicit_version() {
        let pom = "<project>\n  <dependencies>\n    <dependency>\n      <groupId>org.jenkins-ci.plugins</groupId>\n      <artifactId>structs</artifactId>\n    </dependency>\n  </dependencies>\n</project>";
        let mut plan = plan();
        plan.overrides
            .replace_main
            .insert("structs".to_owned(), "1.20".to_owned());
        let (out, _) = rewrite_str(pom, &plan).unwrap();
        assert!(out.contains(
            "<artifactId>structs</artifactId>\n      <version>1.20</version>\n    </dependency>"
        ));
    }

    #[test]
    fn crlf_descriptor_keeps_crlf() {
        let pom = "<project>\r\n  <artifactId>x</artifactId>\r\n</project>\r\n";
        let mut plan = plan();
        plan.overrides.add_main.insert("y".to_owned(), "1".to_owned());
        let (out, _) = rewrite_str(pom, &plan).unwrap();
        assert!(!out.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn rejects_non_project_root() {
        let err = rewrite_str("<settings/>", &plan()).unwrap_err();
        assert!(matches!(err, RewriteError::Malformed { .. }));
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = rewrite_str("<project><dependencies></project>", &plan()).unwrap_err();
        assert!(matches!(err, RewriteError::Malformed { .. }));
    }

    #[test]
    fn declared_dependencies_reads_scope_and_version() {
        let deps = declared_dependencies(POM).unwrap();
        assert_eq!(deps.len(), 2);
        let credentials = deps.first().unwrap();
        assert_eq!(credentials.artifact_id, "credentials");
        assert_eq!(credentials.version.as_deref(), Some("2.1.16"));
        assert!(!credentials.is_test());
        assert!(deps.get(1).unwrap().is_test());
    }

    #[test]
    fn declared_versions_resolve_local_properties() {
        let pom = r#"<project>
  <properties><structs.version>1.20</structs.version></properties>
  <dependencies>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>structs</artifactId>
      <version>${structs.version}</version>
    </dependency>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>other</artifactId>
      <version>${inherited.version}</version>
    </dependency>
  </dependencies>
</project>"#;
        let deps = declared_dependencies(pom).unwrap();
        assert_eq!(deps.first().unwrap().version.as_deref(), Some("1.20"));
        assert_eq!(
            deps.get(1).unwrap().version.as_deref(),
            Some("${inherited.version}")
        );
    }

    #[test]
    fn rewrite_descriptor_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pom.xml");
        std::fs::write(&path, POM).unwrap();
        let summary = rewrite_descriptor(&path, &plan()).unwrap();
        assert!(summary.core_pinned);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<jenkins.version>2.164.3</jenkins.version>"));
    }

    #[test]
    fn rewrite_descriptor_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = rewrite_descriptor(&dir.path().join("pom.xml"), &plan()).unwrap_err();
        assert!(matches!(err, RewriteError::Missing { .. }));
    }
}
