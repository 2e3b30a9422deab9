//! Resolve which tests ran and which failed from JUnit-style XML reports.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::error::EngineError;

/// Tests found in the reports of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolvedTests {
    /// `Class.method` of every test case found.
    pub executed: BTreeSet<String>,
    /// Subset of `executed` with a failure or error.
    pub failed: BTreeSet<String>,
    /// Missing or inconsistent reports. Never fatal.
    pub warnings: Vec<String>,
}

/// Report directory for a task type, relative to the module directory.
pub fn report_dir(module_dir: &Path, task_type: &str) -> PathBuf {
    module_dir.join("target").join(format!("{task_type}-reports"))
}

/// Collect test names for the given task types.
///
/// With explicit `test_ids` each `TEST-<id>.xml` is read from every report
/// directory; otherwise every `TEST-*.xml` found there is read. Missing files
/// and count mismatches are recorded as warnings.
///
/// # Errors
/// Returns an error only if a discovery pattern cannot be built from
/// `module_dir`.
pub fn solve(
    task_types: &[String],
    test_ids: &[String],
    module_dir: &Path,
) -> Result<SolvedTests, EngineError> {
    let mut solved = SolvedTests::default();
    for task_type in task_types {
        let dir = report_dir(module_dir, task_type);
        let files = if test_ids.is_empty() {
            discover(&dir)?
        } else {
            test_ids
                .iter()
                .map(|id| dir.join(format!("TEST-{id}.xml")))
                .collect()
        };
        for file in files {
            read_report(&file, &mut solved);
        }
    }
    for warning in &solved.warnings {
        log::warn!("{warning}");
    }
    Ok(solved)
}

fn discover(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let base = dir.to_str().ok_or_else(|| EngineError::Io {
        path: dir.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
    })?;
    let pattern = Path::new(&glob::Pattern::escape(base)).join("TEST-*.xml");
    let pattern = pattern.to_string_lossy();
    let paths = glob::glob(&pattern).map_err(|e| EngineError::Io {
        path: dir.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
    })?;
    let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
    files.sort();
    Ok(files)
}

fn read_report(file: &Path, solved: &mut SolvedTests) {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            solved
                .warnings
                .push(format!("test report {} not found", file.display()));
            return;
        }
        Err(e) => {
            solved
                .warnings
                .push(format!("cannot read test report {}: {e}", file.display()));
            return;
        }
    };
    let doc = match Document::parse(&text) {
        Ok(doc) => doc,
        Err(e) => {
            solved
                .warnings
                .push(format!("malformed test report {}: {e}", file.display()));
            return;
        }
    };

    for suite in doc.descendants().filter(|n| is_element(n, "testsuite")) {
        let cases: Vec<Node<'_, '_>> = suite
            .children()
            .filter(|n| is_element(n, "testcase"))
            .collect();
        let declared = suite.attribute("tests").and_then(|t| t.trim().parse::<usize>().ok());
        if let Some(declared) = declared {
            if declared != cases.len() {
                solved.warnings.push(format!(
                    "{}: suite {} declares {declared} test(s) but lists {}",
                    file.display(),
                    suite.attribute("name").unwrap_or("<unnamed>"),
                    cases.len()
                ));
            }
        }
        for case in cases {
            let name = case.attribute("name").unwrap_or("");
            let id = match case.attribute("classname").or_else(|| suite.attribute("name")) {
                Some(class) if !class.is_empty() => format!("{class}.{name}"),
                _ => name.to_owned(),
            };
            let failed = case
                .children()
                .any(|n| is_element(&n, "failure") || is_element(&n, "error"));
            if failed {
                solved.failed.insert(id.clone());
            }
            solved.executed.insert(id);
        }
    }
}

fn is_element(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}
