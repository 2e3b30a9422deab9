#![forbid(unsafe_code)]
//! Version ordering and `group:artifact:version` coordinates for the plugin compatibility tester.

pub mod coordinate;
pub mod version;

pub use coordinate::Coordinate;
pub use version::{compare_versions, is_newer};

/// Errors produced by version comparison and coordinate parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Two versions hold a number and a word at the same segment index.
    #[error("cannot compare version \"{left}\" with \"{right}\": segment {index} is numeric in one and textual in the other")]
    Incomparable {
        left: String,
        right: String,
        index: usize,
    },

    /// A coordinate string is malformed.
    #[error("invalid coordinate \"{coordinate}\": {reason}")]
    InvalidCoordinate { coordinate: String, reason: String },
}
