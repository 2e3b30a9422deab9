//! Pre-build hooks that adjust the build request of a plugin.
//!
//! Hooks run in descending priority, ties broken by ascending name. Each one
//! that applies receives the request by mutable reference, so later hooks see
//! every change made by earlier ones.

use std::path::PathBuf;

use pct_config::{HookConfig, TesterConfig};

use crate::error::EngineError;
use crate::metadata::PluginMetadata;
use crate::priority::{rank, Ranked};

/// Tasks that run tests. Hooks position their own tasks relative to these.
pub const TEST_TASKS: &[&str] = &[
    "hpi:resolve-test-dependencies",
    "hpi:test-hpl",
    "surefire:test",
    "test",
];

/// The build request for one plugin as hooks see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub metadata: PluginMetadata,
    /// Root of the plugin's source checkout.
    pub working_directory: PathBuf,
    pub build_log_file: Option<PathBuf>,
    /// Kinds of test reports the build produces (`surefire`, `failsafe`).
    pub task_types: Vec<String>,
    /// Build tasks and arguments, in order.
    pub arguments: Vec<String>,
}

impl ExecutionContext {
    pub fn plugin_id(&self) -> &str {
        self.metadata.plugin_id()
    }

    fn add_task_type(&mut self, kind: &str) {
        if !self.task_types.iter().any(|t| t == kind) {
            self.task_types.push(kind.to_owned());
        }
    }
}

/// A pre-build adjustment.
pub trait Hook: Ranked + Send + Sync {
    fn applies(&self, context: &ExecutionContext) -> bool;

    /// # Errors
    /// Returns `EngineError::Hook` if the adjustment cannot be made.
    fn apply(&self, context: &mut ExecutionContext) -> Result<(), EngineError>;
}

/// Hooks in execution order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in hooks plus the declarative ones from `config`, minus
    /// `config.exclude_hooks`.
    pub fn from_config(config: &TesterConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(IntegrationReportHook::default()));
        if config.coverage {
            registry.register(Box::new(CoverageHook));
        }
        for hook in &config.hooks {
            registry.register(Box::new(ArgumentsHook::new(hook)));
        }
        for name in &config.exclude_hooks {
            if !registry.remove(name) {
                log::warn!("excluded hook `{name}` is not registered");
            }
        }
        registry
    }

    pub fn register(&mut self, hook: Box<dyn Hook>) {
        self.hooks.push(hook);
        rank(&mut self.hooks);
    }

    /// Drop every hook named `name`. Returns whether any was registered.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|hook| hook.name() != name);
        self.hooks.len() != before
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|hook| hook.name()).collect()
    }

    /// Run every applicable hook against `context`, returning the names of
    /// those that ran.
    ///
    /// # Errors
    /// Stops at and returns the first hook failure.
    pub fn run(&self, context: &mut ExecutionContext) -> Result<Vec<String>, EngineError> {
        let mut applied = Vec::new();
        for hook in &self.hooks {
            if !hook.applies(context) {
                continue;
            }
            log::debug!("{}: applying hook {}", context.plugin_id(), hook.name());
            hook.apply(context).map_err(|err| match err {
                EngineError::Hook { .. } => err,
                other => EngineError::Hook {
                    hook: hook.name().to_owned(),
                    message: other.to_string(),
                },
            })?;
            applied.push(hook.name().to_owned());
        }
        Ok(applied)
    }
}

/// Starts the coverage agent before the first test task.
pub struct CoverageHook;

const COVERAGE_AGENT: &str = "jacoco:prepare-agent";

impl Ranked for CoverageHook {
    fn name(&self) -> &str {
        "coverage"
    }
}

impl Hook for CoverageHook {
    fn applies(&self, _context: &ExecutionContext) -> bool {
        true
    }

    fn apply(&self, context: &mut ExecutionContext) -> Result<(), EngineError> {
        if let Some(index) = context
            .arguments
            .iter()
            .position(|arg| TEST_TASKS.contains(&arg.as_str()))
        {
            context.arguments.insert(index, COVERAGE_AGENT.to_owned());
        }
        Ok(())
    }
}

/// Adds the integration-test phase for plugins whose tests live there.
pub struct IntegrationReportHook {
    plugins: Vec<String>,
}

const INTEGRATION_TASK: &str = "failsafe:integration-test";

impl Default for IntegrationReportHook {
    fn default() -> Self {
        Self::new(&["warnings-ng"])
    }
}

impl IntegrationReportHook {
    pub fn new(plugins: &[&str]) -> Self {
        Self {
            plugins: plugins.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

impl Ranked for IntegrationReportHook {
    fn name(&self) -> &str {
        "integration-report"
    }
}

impl Hook for IntegrationReportHook {
    fn applies(&self, context: &ExecutionContext) -> bool {
        self.plugins
            .iter()
            .any(|p| p.eq_ignore_ascii_case(context.plugin_id()))
    }

    fn apply(&self, context: &mut ExecutionContext) -> Result<(), EngineError> {
        if !context.arguments.is_empty() {
            let index = context
                .arguments
                .iter()
                .rposition(|arg| TEST_TASKS.contains(&arg.as_str()))
                .map_or(context.arguments.len(), |last| last.saturating_add(1));
            context.arguments.insert(index, INTEGRATION_TASK.to_owned());
        }
        context.add_task_type("failsafe");
        Ok(())
    }
}

/// Appends configured arguments to one plugin's build.
pub struct ArgumentsHook {
    name: String,
    plugin: String,
    priority: i32,
    args: Vec<String>,
}

impl ArgumentsHook {
    pub fn new(config: &HookConfig) -> Self {
        Self {
            name: config.name.clone(),
            plugin: config.plugin.clone(),
            priority: config.priority,
            args: config.args.clone(),
        }
    }
}

impl Ranked for ArgumentsHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

impl Hook for ArgumentsHook {
    fn applies(&self, context: &ExecutionContext) -> bool {
        self.plugin.eq_ignore_ascii_case(context.plugin_id())
    }

    fn apply(&self, context: &mut ExecutionContext) -> Result<(), EngineError> {
        if self.args.iter().any(|arg| arg.trim().is_empty()) {
            return Err(EngineError::Hook {
                hook: self.name.clone(),
                message: "blank build argument in `args`".to_owned(),
            });
        }
        context.arguments.extend(self.args.iter().cloned());
        Ok(())
    }
}
