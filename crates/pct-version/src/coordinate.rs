//! `group:artifact:version` coordinates.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::compare_versions;
use crate::VersionError;

/// A `group:artifact:version` triple.
///
/// Equality and hashing use all three fields. There is deliberately no `Ord`
/// implementation: reports order coordinates by version alone through
/// [`Coordinate::version_order`], which can fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "g")]
    pub group: String,
    #[serde(rename = "a")]
    pub artifact: String,
    #[serde(rename = "v")]
    pub version: String,
}

impl Coordinate {
    pub fn new(group: &str, artifact: &str, version: &str) -> Self {
        Self {
            group: group.to_owned(),
            artifact: artifact.to_owned(),
            version: version.to_owned(),
        }
    }

    /// Parse `"group:artifact:version"`.
    ///
    /// # Errors
    /// Returns `VersionError::InvalidCoordinate` unless the string has exactly
    /// three non-empty colon-separated parts.
    pub fn parse(coord: &str) -> Result<Self, VersionError> {
        let parts: Vec<&str> = coord.split(':').collect();
        let [group, artifact, version] = parts.as_slice() else {
            return Err(VersionError::InvalidCoordinate {
                coordinate: coord.to_owned(),
                reason: format!(
                    "expected 3 colon-separated parts (group:artifact:version), got {}",
                    parts.len()
                ),
            });
        };

        for (label, part) in [("group", group), ("artifact", artifact), ("version", version)] {
            if part.is_empty() {
                return Err(VersionError::InvalidCoordinate {
                    coordinate: coord.to_owned(),
                    reason: format!("{label} is empty"),
                });
            }
        }

        Ok(Self::new(group, artifact, version))
    }

    /// Order by version only. Used for sorting report entries.
    ///
    /// # Errors
    /// Returns `VersionError::Incomparable` when the versions mix numeric and
    /// textual segments at the same index.
    pub fn version_order(&self, other: &Self) -> Result<Ordering, VersionError> {
        compare_versions(&self.version, &other.version)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}
