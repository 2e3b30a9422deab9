//! Test orchestration: run every selected catalog plugin against the core.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use pct_config::{Catalog, ConfigError, DependencyResolution, PluginCatalogEntry, TesterConfig};
use pct_maven::{resolve_executable, CancelToken, MavenError, MavenRunner};
use pct_version::is_newer;

use crate::checkout::{GitCheckout, SourceCheckout};
use crate::error::EngineError;
use crate::extract::ExtractorRegistry;
use crate::hooks::{ExecutionContext, HookRegistry};
use crate::pom::{
    declared_dependencies, rewrite_descriptor, DeclaredDependency, RewriteError, RewritePlan,
    CORE_VERSION_PROPERTY,
};
use crate::report::{CompatReport, CompatResult, PluginInfo, TestStatus};
use crate::surefire;

/// Plugin ids by outcome of one run, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl RunSummary {
    fn record(&mut self, plugin: &str, status: TestStatus) {
        let list = match status {
            TestStatus::Success => &mut self.succeeded,
            TestStatus::Failure => &mut self.failed,
            TestStatus::Skipped => &mut self.skipped,
        };
        list.push(plugin.to_owned());
    }

    fn sort(&mut self) {
        self.succeeded.sort();
        self.failed.sort();
        self.skipped.sort();
    }

    pub fn total(&self) -> usize {
        self.succeeded
            .len()
            .saturating_add(self.failed.len())
            .saturating_add(self.skipped.len())
    }
}

/// Load the catalog named by `config`.
///
/// # Errors
/// Returns an error if the core coordinate is invalid or the catalog cannot
/// be loaded.
pub fn load_catalog(config: &TesterConfig) -> Result<Catalog, EngineError> {
    let (group, artifact) = config.core_group_artifact()?;
    let catalog = Catalog::load(&config.catalog_url, group, artifact)?;
    log::info!(
        "catalog `{}`: core {} with {} plugin(s)",
        catalog.source_id,
        catalog.core,
        catalog.len()
    );
    log::debug!("core {} is published at {}", catalog.core.version, catalog.core_url);
    Ok(catalog)
}

/// Why a run must stop after the current plugin.
enum Abort {
    FailFast(MavenError),
    Cancelled,
}

struct PluginRun {
    result: CompatResult,
    abort: Option<Abort>,
}

/// Drives the per-plugin pipeline for one catalog snapshot.
pub struct PluginCompatTester {
    config: TesterConfig,
    catalog: Catalog,
    extractors: ExtractorRegistry,
    hooks: HookRegistry,
    checkout: Box<dyn SourceCheckout>,
    runner: MavenRunner,
    cancel: CancelToken,
}

impl PluginCompatTester {
    /// A tester with the built-in extractors, the hooks from `config`, and a
    /// git checkout.
    ///
    /// # Errors
    /// Returns an error if `config` does not validate or the configured build
    /// tool cannot be used.
    pub fn new(config: TesterConfig, catalog: Catalog) -> Result<Self, EngineError> {
        config.validate()?;
        let executable = resolve_executable(config.maven.executable.as_deref())?;
        let cancel = CancelToken::new();
        let mut runner = MavenRunner::new(&executable)
            .extra_args(&config.maven.extra_args)
            .cancel_token(cancel.clone());
        if let Some(settings) = &config.maven.settings_file {
            runner = runner.settings_file(settings);
        }
        Ok(Self {
            hooks: HookRegistry::from_config(&config),
            extractors: ExtractorRegistry::with_builtin(),
            checkout: Box::new(GitCheckout::default()),
            config,
            catalog,
            runner,
            cancel,
        })
    }

    pub fn with_checkout(mut self, checkout: Box<dyn SourceCheckout>) -> Self {
        self.checkout = checkout;
        self
    }

    /// Cancelling this token kills the running builds and stops the run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Test every selected plugin, recording results into `report` as they
    /// complete.
    ///
    /// The report stays with the caller, so whatever was recorded before an
    /// abort can still be saved.
    ///
    /// # Errors
    /// - `EngineError::FailFast` after a build failure when `fail_fast` is set
    /// - `EngineError::Cancelled` when the cancel token fires
    /// - `EngineError::Version` if a result cannot be placed in the report
    pub fn run(&self, report: &Mutex<CompatReport>) -> Result<RunSummary, EngineError> {
        let selected: Vec<&PluginCatalogEntry> = self
            .catalog
            .plugins()
            .filter(|entry| self.config.selects(&entry.id))
            .collect();
        if let Some(include) = &self.config.include_plugins {
            for id in include.ids() {
                if self.catalog.get(&id).is_none() {
                    log::warn!("included plugin `{id}` is not in the catalog");
                }
            }
        }
        log::info!(
            "testing {} plugin(s) against {} with {} worker(s)",
            selected.len(),
            self.catalog.core,
            self.config.workers
        );

        let summary = Mutex::new(RunSummary::default());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("cannot start {} worker(s): {e}", self.config.workers),
            })?;
        let outcome = pool.install(|| {
            selected
                .par_iter()
                .try_for_each(|entry| self.test_and_record(entry, report, &summary))
        });

        let mut summary = summary.into_inner().unwrap_or_else(PoisonError::into_inner);
        summary.sort();
        outcome?;
        log::info!(
            "{} succeeded, {} failed, {} skipped",
            summary.succeeded.len(),
            summary.failed.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }

    fn test_and_record(
        &self,
        entry: &PluginCatalogEntry,
        report: &Mutex<CompatReport>,
        summary: &Mutex<RunSummary>,
    ) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled {
                plugin: entry.id.clone(),
            });
        }

        let run = self.test_plugin(entry);
        let status = run.result.status;
        let info = PluginInfo::new(&entry.id, &entry.version, &entry.url);
        lock(report).add_result(&info, run.result)?;

        let mut summary = lock(summary);
        summary.record(&entry.id, status);
        match run.abort {
            None => Ok(()),
            Some(Abort::Cancelled) => Err(EngineError::Cancelled {
                plugin: entry.id.clone(),
            }),
            Some(Abort::FailFast(source)) => {
                let mut succeeded = summary.succeeded.clone();
                succeeded.sort();
                Err(EngineError::FailFast {
                    plugin: entry.id.clone(),
                    succeeded,
                    source: Box::new(source),
                })
            }
        }
    }

    /// Steps:
    /// 1. Download the plugin artifact
    /// 2. Extract its source metadata (skipped when impossible)
    /// 3. Check out the source at the release commit
    /// 4. Plan and apply descriptor overrides
    /// 5. Let hooks adjust the build request
    /// 6. Run the build
    /// 7. Collect executed and failed tests
    fn test_plugin(&self, entry: &PluginCatalogEntry) -> PluginRun {
        let core = &self.catalog.core;
        log::info!("testing {} {} against {core}", entry.id, entry.version);
        let plugin_dir = self.config.working_directory.join(&entry.id);
        let mut result = CompatResult::new(core, TestStatus::Failure);

        let context = match self.prepare(entry, &plugin_dir, &mut result.warning_messages) {
            Ok(context) => context,
            Err(err) => {
                if matches!(err, EngineError::MetadataExtraction { .. }) {
                    log::warn!("{}: skipped: {err}", entry.id);
                    result.status = TestStatus::Skipped;
                } else {
                    log::error!("{}: {err}", entry.id);
                }
                result.error_message = Some(err.to_string());
                return PluginRun {
                    result,
                    abort: None,
                };
            }
        };
        result.build_log_path = context
            .build_log_file
            .as_ref()
            .map(|p| p.display().to_string());

        // 6. Build.
        let mut properties = self.config.maven.properties.clone();
        properties.insert(CORE_VERSION_PROPERTY.to_owned(), core.version.clone());
        let module = context.metadata.module_path();
        let build = self.runner.run(
            &properties,
            &context.working_directory,
            module,
            context.build_log_file.as_deref(),
            &context.arguments,
        );

        let mut abort = None;
        match build {
            Ok(outcome) => {
                log::info!("{}: {}", entry.id, outcome.summary());
                result.status = TestStatus::Success;
            }
            Err(MavenError::Interrupted { .. }) => {
                result.error_message = Some("build interrupted".to_owned());
                abort = Some(Abort::Cancelled);
            }
            Err(err) => {
                log::error!("{}: {err}", entry.id);
                result.error_message = Some(err.to_string());
                let modules = err.succeeded_modules();
                if !modules.is_empty() {
                    result
                        .warning_messages
                        .push(format!("modules built before the failure: {}", modules.join(", ")));
                }
                if self.config.fail_fast {
                    abort = Some(Abort::FailFast(err));
                }
            }
        }

        // 7. Tests.
        let module_dir = module.map_or_else(
            || context.working_directory.clone(),
            |m| context.working_directory.join(m),
        );
        match surefire::solve(&context.task_types, &[], &module_dir) {
            Ok(solved) => {
                result.tests = solved.executed.into_iter().collect();
                result.failed_tests = solved.failed.into_iter().collect();
                result.warning_messages.extend(solved.warnings);
            }
            Err(err) => result.warning_messages.push(err.to_string()),
        }

        PluginRun { result, abort }
    }

    /// Steps 1-5, producing the build request.
    fn prepare(
        &self,
        entry: &PluginCatalogEntry,
        plugin_dir: &Path,
        warnings: &mut Vec<String>,
    ) -> Result<ExecutionContext, EngineError> {
        pct_util::fs::remove_dir_all_if_exists(plugin_dir)?;
        pct_util::fs::ensure_dir(plugin_dir)?;

        // 1. Artifact.
        let artifact = plugin_dir.join(format!("{}.hpi", entry.id));
        fetch_artifact(&entry.url, &artifact)?;

        // 2. Metadata.
        let metadata = self.extractors.extract(&entry.id, &artifact)?;

        // 3. Source.
        let source_dir = plugin_dir.join("source");
        self.checkout.checkout(&metadata, &source_dir)?;
        let module_dir = metadata
            .module_path()
            .map_or_else(|| source_dir.clone(), |m| source_dir.join(m));

        // 4. Descriptor.
        let descriptor = module_dir.join("pom.xml");
        if !descriptor.is_file() {
            return Err(EngineError::Descriptor {
                plugin: entry.id.clone(),
                source: RewriteError::Missing { path: descriptor },
            });
        }
        let text = pct_util::fs::read_to_string(&descriptor).map_err(|e| EngineError::Descriptor {
            plugin: entry.id.clone(),
            source: e.into(),
        })?;
        let declared = declared_dependencies(&text).map_err(|source| EngineError::Descriptor {
            plugin: entry.id.clone(),
            source,
        })?;
        let plan = plan_overrides(&self.catalog, &self.config, entry, &declared, warnings)?;
        rewrite_descriptor(&descriptor, &plan).map_err(|source| EngineError::Descriptor {
            plugin: entry.id.clone(),
            source,
        })?;

        // 5. Hooks.
        let mut context = ExecutionContext {
            metadata,
            working_directory: source_dir,
            build_log_file: Some(plugin_dir.join("build.log")),
            task_types: vec!["surefire".to_owned()],
            arguments: self.config.maven.test_tasks.clone(),
        };
        let applied = self.hooks.run(&mut context)?;
        if !applied.is_empty() {
            log::debug!("{}: hooks applied: {}", entry.id, applied.join(", "));
        }
        Ok(context)
    }
}

/// Work out which dependency versions the descriptor of `entry` must change.
///
/// Declared dependencies published in the catalog are bumped when the catalog
/// has a newer release. Required catalog dependencies missing from the
/// descriptor are added as runtime dependencies, optional ones as test
/// dependencies. Dependencies unknown to the catalog are left alone.
///
/// # Errors
/// Returns `EngineError::Version` if a declared version cannot be compared
/// with the catalog's.
pub fn plan_overrides(
    catalog: &Catalog,
    config: &TesterConfig,
    entry: &PluginCatalogEntry,
    declared: &[DeclaredDependency],
    warnings: &mut Vec<String>,
) -> Result<RewritePlan, EngineError> {
    let default_group = config.default_plugin_group.as_str();
    let mut plan = RewritePlan::new(&catalog.core, default_group);
    let overrides = &mut plan.overrides;
    let mut group_ids = BTreeMap::new();

    for dep in declared {
        let Some(published) = catalog
            .get(&dep.artifact_id)
            .filter(|p| p.group(default_group) == dep.group_id)
        else {
            continue;
        };
        if published.id.eq_ignore_ascii_case(&entry.id) {
            continue;
        }
        let artifact = published.artifact().to_owned();
        group_ids.insert(artifact.clone(), dep.group_id.clone());

        let outdated = match dep.version.as_deref() {
            Some(current) if !current.starts_with("${") => is_newer(&published.version, current)?,
            _ => true,
        };
        if outdated {
            let table = if dep.is_test() {
                &mut overrides.replace_test
            } else {
                &mut overrides.replace_main
            };
            table.insert(artifact.clone(), published.version.clone());
        }
        if config
            .convert_to_test
            .iter()
            .any(|id| id.eq_ignore_ascii_case(&published.id))
        {
            overrides.convert_to_test.insert(artifact);
        }
    }

    let required = entry.dependencies.keys().map(|id| (id, false));
    let optional = entry.optional_dependencies.keys().map(|id| (id, true));
    for (id, is_optional) in required.chain(optional) {
        let published = match catalog.resolve_dependency(id) {
            DependencyResolution::Resolved(published) => published,
            DependencyResolution::External => {
                log::warn!("{}: dependency `{id}` is not in the catalog", entry.id);
                warnings.push(format!("dependency `{id}` is not in the catalog; left as declared"));
                continue;
            }
        };
        let artifact = published.artifact().to_owned();
        let group = published.group(default_group).to_owned();
        let already = declared
            .iter()
            .any(|d| d.artifact_id == artifact && d.group_id == group);
        if already {
            continue;
        }
        group_ids.insert(artifact.clone(), group);
        let table = if is_optional {
            &mut overrides.add_test
        } else {
            &mut overrides.add_main
        };
        table.insert(artifact, published.version.clone());
    }

    plan.group_ids = group_ids;
    Ok(plan)
}

fn fetch_artifact(url: &str, dest: &Path) -> Result<(), EngineError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let bytes = pct_util::download::download_to_file(url, dest)?;
        log::debug!("downloaded {url} ({bytes} bytes)");
        return Ok(());
    }
    let source = url.strip_prefix("file://").unwrap_or(url);
    std::fs::copy(source, dest).map_err(|e| EngineError::Io {
        path: source.to_owned(),
        source: e,
    })?;
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
  "id": "default",
  "core": {"version": "2.164.3", "url": "https://example.org/jenkins.war"},
  "plugins": {
    "git-client": {
      "name": "git-client",
      "version": "2.7.7",
      "url": "https://example.org/git-client.hpi",
      "dependencies": [
        {"name": "credentials", "version": "2.1.16", "optional": false},
        {"name": "structs", "version": "1.17", "optional": false},
        {"name": "workflow-step-api", "version": "2.19", "optional": true},
        {"name": "jsch", "version": "0.1.54", "optional": false}
      ]
    },
    "credentials": {"name": "credentials", "version": "2.3.12", "url": "https://example.org/credentials.hpi"},
    "structs": {"name": "structs", "version": "1.20", "url": "https://example.org/structs.hpi"},
    "workflow-step-api": {"name": "workflow-step-api", "version": "2.22", "url": "https://example.org/wsa.hpi"}
  }
}"#;

    fn catalog() -> Catalog {
        Catalog::parse(CATALOG, "org.jenkins-ci.main", "jenkins-core").unwrap()
    }

    fn config() -> TesterConfig {
        TesterConfig::new("catalog.json", Path::new("/work"), Path::new("report.json"))
    }

    fn declared(artifact: &str, version: &str, scope: Option<&str>) -> DeclaredDependency {
        DeclaredDependency {
            group_id: "org.jenkins-ci.plugins".to_owned(),
            artifact_id: artifact.to_owned(),
            version: Some(version.to_owned()),
            scope: scope.map(str::to_owned),
        }
    }

    #[test]
    fn plan_bumps_outdated_and_adds_missing() {
        let catalog = catalog();
        let entry = catalog.get("git-client").unwrap();
        let deps = vec![
            declared("credentials", "2.1.16", None),
            declared("structs", "1.20", Some("test")),
        ];
        let mut warnings = Vec::new();
        let plan = plan_overrides(&catalog, &config(), entry, &deps, &mut warnings).unwrap();

        assert_eq!(
            plan.overrides.replace_main.get("credentials").map(String::as_str),
            Some("2.3.12")
        );
        assert!(plan.overrides.replace_test.is_empty());
        assert!(plan.overrides.add_main.is_empty());
        assert_eq!(
            plan.overrides.add_test.get("workflow-step-api").map(String::as_str),
            Some("2.22")
        );
        assert_eq!(plan.core.version, "2.164.3");
        assert_eq!(warnings.len(), 1);
        assert!(warnings.first().unwrap().contains("jsch"));
    }

    #[test]
    fn plan_adds_required_dependency_as_runtime() {
        let catalog = catalog();
        let entry = catalog.get("git-client").unwrap();
        let plan = plan_overrides(&catalog, &config(), entry, &[], &mut Vec::new()).unwrap();
        let added: Vec<&str> = plan.overrides.add_main.keys().map(String::as_str).collect();
        assert_eq!(added, vec!["credentials", "structs"]);
        assert_eq!(
            plan.group_ids.get("structs").map(String::as_str),
            Some("org.jenkins-ci.plugins")
        );
    }

    #[test]
    fn plan_marks_conversions() {
        let catalog = catalog();
        let entry = catalog.get("git-client").unwrap();
        let mut config = config();
        config.convert_to_test.push("Credentials".to_owned());
        let deps = vec![declared("credentials", "2.3.12", None)];
        let plan = plan_overrides(&catalog, &config, entry, &deps, &mut Vec::new()).unwrap();
        assert!(plan.overrides.convert_to_test.contains("credentials"));
        assert!(plan.overrides.replace_main.is_empty());
    }

    #[test]
    fn plan_rejects_incomparable_declared_version() {
        let catalog = catalog();
        let entry = catalog.get("git-client").unwrap();
        let deps = vec![declared("credentials", "2.x.1", None)];
        let err = plan_overrides(&catalog, &config(), entry, &deps, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::Version(_)));
    }

    #[test]
    fn planned_rewrite_pins_core_and_bumps_credentials() {
        let pom = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <artifactId>git-client</artifactId>
  <!-- versions below are rewritten -->
  <dependencies>
    <dependency>
      <groupId>org.jenkins-ci.main</groupId>
      <artifactId>jenkins-core</artifactId>
      <version>2.138.4</version>
      <scope>provided</scope>
    </dependency>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>credentials</artifactId>
      <version>2.1.16</version>
    </dependency>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>structs</artifactId>
      <version>1.20</version>
    </dependency>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>workflow-step-api</artifactId>
      <version>2.22</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pom.xml");
        std::fs::write(&path, pom).unwrap();

        let catalog = catalog();
        let entry = catalog.get("git-client").unwrap();
        let declared = declared_dependencies(pom).unwrap();
        let plan = plan_overrides(&catalog, &config(), entry, &declared, &mut Vec::new()).unwrap();
        rewrite_descriptor(&path, &plan).unwrap();

        let expected = pom
            .replace("<version>2.138.4<", "<version>2.164.3<")
            .replace("<version>2.1.16<", "<version>2.3.12<");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);
    }

    #[test]
    fn summary_counts() {
        let mut summary = RunSummary::default();
        summary.record("b", TestStatus::Success);
        summary.record("a", TestStatus::Success);
        summary.record("c", TestStatus::Skipped);
        summary.sort();
        assert_eq!(summary.succeeded, vec!["a", "b"]);
        assert_eq!(summary.total(), 3);
    }

    #[cfg(unix)]
    mod pipeline {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        use zip::write::FileOptions;

        use super::*;
        use crate::metadata::PluginMetadata;

        /// Copies a canned descriptor instead of cloning.
        struct FixtureCheckout;

        impl SourceCheckout for FixtureCheckout {
            fn checkout(&self, metadata: &PluginMetadata, destination: &Path) -> Result<(), EngineError> {
                std::fs::create_dir_all(destination).unwrap();
                let pom = format!(
                    "<project>\n  <artifactId>{}</artifactId>\n  <properties>\n    <jenkins.version>2.100</jenkins.version>\n  </properties>\n</project>\n",
                    metadata.plugin_id()
                );
                std::fs::write(destination.join("pom.xml"), pom).unwrap();
                Ok(())
            }
        }

        fn write_hpi(path: &Path, id: &str) {
            let file = std::fs::File::create(path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("META-INF/MANIFEST.MF", FileOptions::default())
                .unwrap();
            let manifest = format!(
                "Manifest-Version: 1.0\nShort-Name: {id}\nPlugin-ScmConnection: scm:git:https://example.org/{id}.git\nPlugin-GitHash: abc123\n"
            );
            zip.write_all(manifest.as_bytes()).unwrap();
            zip.finish().unwrap();
        }

        /// Fails the build of any plugin whose descriptor mentions `broken`,
        /// and writes one passing test report otherwise.
        fn write_fake_maven(path: &Path) {
            let script = r#"#!/bin/sh
if grep -q broken pom.xml; then
  echo "[INFO] Reactor Summary for broken 1.0:"
  echo "[INFO] broken-api ............................. SUCCESS [  1.0 s]"
  echo "[INFO] broken ................................. FAILURE [  1.0 s]"
  echo "[ERROR] compilation failure"
  exit 1
fi
mkdir -p target/surefire-reports
printf '<testsuite name="T" tests="1"><testcase classname="T" name="ok"/></testsuite>' > target/surefire-reports/TEST-T.xml
echo "[INFO] BUILD SUCCESS"
"#;
            std::fs::write(path, script).unwrap();
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        struct Fixture {
            _dir: tempfile::TempDir,
            config: TesterConfig,
            catalog: Catalog,
        }

        fn fixture(plugins: &[&str], with_manifest: &[&str]) -> Fixture {
            let dir = tempfile::tempdir().unwrap();
            let work = dir.path().join("work");
            std::fs::create_dir(&work).unwrap();
            let artifacts = dir.path().join("artifacts");
            std::fs::create_dir(&artifacts).unwrap();

            let mut entries = Vec::new();
            for id in plugins {
                let hpi = artifacts.join(format!("{id}.hpi"));
                if with_manifest.contains(id) {
                    write_hpi(&hpi, id);
                } else {
                    let file = std::fs::File::create(&hpi).unwrap();
                    zip::ZipWriter::new(file).finish().unwrap();
                }
                entries.push(format!(
                    r#""{id}": {{"name": "{id}", "version": "1.0", "url": "{}"}}"#,
                    hpi.display()
                ));
            }
            let catalog_json = format!(
                r#"{{"id": "test", "core": {{"version": "2.164.3", "url": "x"}}, "plugins": {{{}}}}}"#,
                entries.join(",")
            );
            let catalog =
                Catalog::parse(&catalog_json, "org.jenkins-ci.main", "jenkins-core").unwrap();

            let mvn = dir.path().join("mvn");
            write_fake_maven(&mvn);
            let mut config = TesterConfig::new("unused", &work, &dir.path().join("report.json"));
            config.maven.executable = Some(mvn);
            Fixture {
                _dir: dir,
                config,
                catalog,
            }
        }

        fn tester(fixture: &Fixture) -> PluginCompatTester {
            PluginCompatTester::new(fixture.config.clone(), fixture.catalog.clone())
                .unwrap()
                .with_checkout(Box::new(FixtureCheckout))
        }

        #[test]
        fn records_success_failure_and_skip() {
            let fixture = fixture(&["alpha", "broken", "opaque"], &["alpha", "broken"]);
            let report = Mutex::new(CompatReport::new());
            let summary = tester(&fixture).run(&report).unwrap();

            assert_eq!(summary.succeeded, vec!["alpha"]);
            assert_eq!(summary.failed, vec!["broken"]);
            assert_eq!(summary.skipped, vec!["opaque"]);

            let report = report.into_inner().unwrap();
            let core = &fixture.catalog.core;
            let alpha = PluginInfo::new("alpha", "1.0", &fixture.catalog.get("alpha").unwrap().url);
            let result = report.result(&alpha, core).unwrap();
            assert_eq!(result.status, TestStatus::Success);
            assert_eq!(result.tests, vec!["T.ok"]);
            assert!(result.build_log_path.as_deref().unwrap().ends_with("build.log"));

            let pom: PathBuf = fixture.config.working_directory.join("alpha/source/pom.xml");
            let text = std::fs::read_to_string(pom).unwrap();
            assert!(text.contains("<jenkins.version>2.164.3</jenkins.version>"));

            let broken = PluginInfo::new("broken", "1.0", &fixture.catalog.get("broken").unwrap().url);
            let failed = report.result(&broken, core).unwrap();
            assert_eq!(failed.status, TestStatus::Failure);
            assert!(failed.error_message.as_deref().unwrap().contains("exit code 1"));
            assert!(failed
                .warning_messages
                .iter()
                .any(|w| w == "modules built before the failure: broken-api"));

            let opaque = PluginInfo::new("opaque", "1.0", &fixture.catalog.get("opaque").unwrap().url);
            let skipped = report.result(&opaque, core).unwrap();
            assert_eq!(skipped.status, TestStatus::Skipped);
            assert!(skipped.error_message.is_some());
        }

        #[test]
        fn fail_fast_reports_prior_successes() {
            let mut fixture = fixture(&["alpha", "broken", "zulu"], &["alpha", "broken", "zulu"]);
            fixture.config.fail_fast = true;
            let report = Mutex::new(CompatReport::new());
            let err = tester(&fixture).run(&report).unwrap_err();

            match err {
                EngineError::FailFast {
                    plugin,
                    succeeded,
                    source,
                } => {
                    assert_eq!(plugin, "broken");
                    assert_eq!(succeeded, vec!["alpha"]);
                    assert_eq!(source.succeeded_modules(), ["broken-api".to_owned()]);
                }
                other => panic!("expected fail-fast, got {other}"),
            }
            // Sequential run: nothing after the failure was attempted.
            let report = report.into_inner().unwrap();
            assert_eq!(report.entries().count(), 2);
        }

        #[test]
        fn parallel_workers_record_every_plugin() {
            let ids = ["a1", "a2", "a3", "a4", "a5", "a6"];
            let mut fixture = fixture(&ids, &ids);
            fixture.config.workers = 3;
            let report = Mutex::new(CompatReport::new());
            let summary = tester(&fixture).run(&report).unwrap();
            assert_eq!(summary.succeeded, ids.to_vec());
            assert_eq!(report.into_inner().unwrap().entries().count(), ids.len());
        }

        #[test]
        fn excluded_plugins_are_not_tested() {
            let mut fixture = fixture(&["alpha", "beta"], &["alpha", "beta"]);
            fixture.config.exclude_plugins.push("beta".to_owned());
            let report = Mutex::new(CompatReport::new());
            let summary = tester(&fixture).run(&report).unwrap();
            assert_eq!(summary.succeeded, vec!["alpha"]);
        }

        #[test]
        fn cancelled_run_stops_before_starting() {
            let fixture = fixture(&["alpha"], &["alpha"]);
            let tester = tester(&fixture);
            tester.cancel_token().cancel();
            let report = Mutex::new(CompatReport::new());
            let err = tester.run(&report).unwrap_err();
            assert!(matches!(err, EngineError::Cancelled { .. }));
            assert!(report.into_inner().unwrap().is_empty());
        }
    }
}
