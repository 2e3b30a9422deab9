//! Supervised invocation of the external build tool.

pub mod detect;
pub mod error;
pub mod invoke;
pub mod scan;

pub use detect::resolve_executable;
pub use error::MavenError;
pub use invoke::{BuildOutcome, CancelToken, MavenRunner};
