//! Segment-wise version comparison.
//!
//! Versions are split on `.` and `-`. Segments made only of ASCII digits compare
//! numerically, all other segments compare lexically. When one version is a
//! strict prefix of the other, the shorter one sorts first, so `1.2 < 1.2.0`;
//! trailing zeros are not treated as equivalent.

use std::cmp::Ordering;

use crate::VersionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// ASCII digits with leading zeros removed.
    Number(&'a str),
    Text(&'a str),
}

impl<'a> Segment<'a> {
    fn parse(raw: &'a str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            Segment::Number(raw.trim_start_matches('0'))
        } else {
            Segment::Text(raw)
        }
    }
}

/// Numeric order of arbitrarily long digit runs without leading zeros.
fn compare_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn segments(version: &str) -> impl Iterator<Item = Segment<'_>> {
    version.split(['.', '-']).map(Segment::parse)
}

/// Compare two version strings.
///
/// # Errors
/// Returns `VersionError::Incomparable` when the same segment index holds a
/// number in one version and a word in the other (e.g. `1.a.2` vs `1.2.2`).
/// Such a pair almost always means one of the strings is malformed.
pub fn compare_versions(left: &str, right: &str) -> Result<Ordering, VersionError> {
    let mut lhs = segments(left);
    let mut rhs = segments(right);
    let mut index = 0usize;

    loop {
        let ordering = match (lhs.next(), rhs.next()) {
            (None, None) => return Ok(Ordering::Equal),
            (None, Some(_)) => return Ok(Ordering::Less),
            (Some(_), None) => return Ok(Ordering::Greater),
            (Some(Segment::Number(a)), Some(Segment::Number(b))) => compare_digits(a, b),
            (Some(Segment::Text(a)), Some(Segment::Text(b))) => a.cmp(b),
            (Some(_), Some(_)) => {
                return Err(VersionError::Incomparable {
                    left: left.to_owned(),
                    right: right.to_owned(),
                    index,
                })
            }
        };
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
        index = index.saturating_add(1);
    }
}

/// Whether `candidate` is strictly newer than `current`.
///
/// # Errors
/// Propagates `VersionError::Incomparable` from [`compare_versions`].
pub fn is_newer(candidate: &str, current: &str) -> Result<bool, VersionError> {
    Ok(compare_versions(candidate, current)? == Ordering::Greater)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segments_compare_as_numbers() {
        assert_eq!(
            compare_versions("1.2.3", "1.2.10").unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_versions("2.164.3", "2.60.1").unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn equal_versions() {
        assert_eq!(compare_versions("1.0", "1.0").unwrap(), Ordering::Equal);
        assert_eq!(
            compare_versions("1.0-beta", "1.0.beta").unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn strict_prefix_sorts_first() {
        assert_eq!(compare_versions("1.2", "1.2.0").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("1.2.0", "1.2").unwrap(), Ordering::Greater);
    }

    #[test]
    fn text_segments_compare_lexically() {
        assert_eq!(
            compare_versions("1.0-alpha", "1.0-beta").unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn mixed_segment_types_are_incomparable() {
        let err = compare_versions("1.a.2", "1.2.2").unwrap_err();
        assert_eq!(
            err,
            VersionError::Incomparable {
                left: "1.a.2".to_owned(),
                right: "1.2.2".to_owned(),
                index: 1,
            }
        );
        assert!(err.to_string().contains("segment 1"), "error was: {err}");
    }

    #[test]
    fn earlier_difference_wins_over_later_mismatch() {
        // The first segment already decides, the mismatch at index 1 is never reached.
        assert_eq!(
            compare_versions("2.a", "1.2").unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn long_digit_runs_compare_numerically() {
        assert_eq!(
            compare_versions("1.99999999999999999999", "1.2").unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            compare_versions("1.99999999999999999999", "1.100000000000000000000").unwrap(),
            Ordering::Less
        );
        assert_eq!(compare_versions("1.007", "1.7").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("1.0", "1.00").unwrap(), Ordering::Equal);
    }

    #[test]
    fn signed_segment_is_text() {
        assert!(compare_versions("1.+5", "1.5").is_err());
    }

    #[test]
    fn is_newer_strict() {
        assert!(is_newer("2.3.12", "2.3.9").unwrap());
        assert!(!is_newer("2.3.12", "2.3.12").unwrap());
        assert!(!is_newer("2.3", "2.3.1").unwrap());
    }

    mod proptests {
        use proptest::prelude::*;

        use super::super::compare_versions;

        proptest! {
            #[test]
            fn numeric_versions_are_antisymmetric(
                a in proptest::collection::vec(0u32..1000, 1..6),
                b in proptest::collection::vec(0u32..1000, 1..6),
            ) {
                let left = a.iter().map(u32::to_string).collect::<Vec<_>>().join(".");
                let right = b.iter().map(u32::to_string).collect::<Vec<_>>().join(".");
                let forward = compare_versions(&left, &right).unwrap();
                let backward = compare_versions(&right, &left).unwrap();
                prop_assert_eq!(forward, backward.reverse());
            }

            #[test]
            fn textual_versions_are_antisymmetric(
                a in "[a-z]{1,4}(\\.[a-z]{1,4}){0,3}",
                b in "[a-z]{1,4}(\\.[a-z]{1,4}){0,3}",
            ) {
                let forward = compare_versions(&a, &b).unwrap();
                let backward = compare_versions(&b, &a).unwrap();
                prop_assert_eq!(forward, backward.reverse());
            }

            #[test]
            fn comparison_never_panics(a in ".*", b in ".*") {
                let _ = compare_versions(&a, &b);
            }
        }
    }
}
