#![forbid(unsafe_code)]
//! Plugin compatibility testing: metadata extraction, descriptor rewriting,
//! hooks, test report parsing, and the compatibility report.

pub mod checkout;
pub mod error;
pub mod extract;
pub mod hooks;
pub mod metadata;
pub mod pom;
pub mod priority;
pub mod report;
pub mod surefire;
pub mod tester;

pub use checkout::{GitCheckout, SourceCheckout};
pub use error::EngineError;
pub use extract::{ExtractorRegistry, ManifestExtractor, MetadataExtractor, PomExtractor};
pub use hooks::{ExecutionContext, Hook, HookRegistry};
pub use metadata::{MetadataError, PluginMetadata, PluginMetadataBuilder};
pub use pom::{rewrite_descriptor, DependencyOverrides, RewriteError, RewritePlan};
pub use report::{CompatReport, CompatResult, PluginInfo, TestStatus};
pub use tester::{load_catalog, PluginCompatTester, RunSummary};

pub use pct_maven::CancelToken;
