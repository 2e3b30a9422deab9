//! Ordering shared by hooks and metadata extractors.

use std::cmp::Ordering;

/// Something registered with a priority and a stable identity.
pub trait Ranked {
    /// Stable identity used to break priority ties.
    fn name(&self) -> &str;

    /// Higher runs first. Undeclared priorities are 0.
    fn priority(&self) -> i32 {
        0
    }
}

/// Descending priority, then ascending name.
pub fn rank_order<T: Ranked + ?Sized>(a: &T, b: &T) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| a.name().cmp(b.name()))
}

/// Sort in place by [`rank_order`]. The sort is stable, so entries equal in
/// both priority and name keep their registration order.
pub fn rank<T: Ranked + ?Sized>(items: &mut [Box<T>]) {
    items.sort_by(|a, b| rank_order(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Entry {
        name: String,
        priority: i32,
        tag: usize,
    }

    impl Ranked for Entry {
        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    fn entry(name: &str, priority: i32, tag: usize) -> Box<Entry> {
        Box::new(Entry {
            name: name.to_owned(),
            priority,
            tag,
        })
    }

    fn names(items: &[Box<Entry>]) -> Vec<&str> {
        items.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn descending_priority() {
        let mut items = vec![
            entry("ten", 10, 0),
            entry("default", 0, 1),
            entry("thirty", 30, 2),
            entry("twenty", 20, 3),
        ];
        rank(&mut items);
        assert_eq!(names(&items), vec!["thirty", "twenty", "ten", "default"]);
    }

    #[test]
    fn ties_break_by_ascending_name() {
        let mut items = vec![
            entry("GammaHook", 30, 0),
            entry("DeltaHook", 30, 1),
            entry("AlphaHook", 10, 2),
        ];
        rank(&mut items);
        assert_eq!(names(&items), vec!["DeltaHook", "GammaHook", "AlphaHook"]);
    }

    #[test]
    fn identical_name_and_priority_keep_registration_order() {
        let mut items = vec![entry("Same", 5, 0), entry("Same", 5, 1), entry("Same", 5, 2)];
        rank(&mut items);
        let tags: Vec<usize> = items.iter().map(|e| e.tag).collect();
        assert_eq!(tags, vec![0, 1, 2]);
    }

    proptest! {
        #[test]
        fn ranking_is_idempotent_and_ordered(
            specs in proptest::collection::vec(("[A-D][a-z]{0,2}", -3i32..3), 0..12)
        ) {
            let mut items: Vec<Box<Entry>> = specs
                .iter()
                .enumerate()
                .map(|(i, (name, priority))| entry(name, *priority, i))
                .collect();
            rank(&mut items);
            let once = items.clone();
            rank(&mut items);
            prop_assert_eq!(&once, &items);

            for pair in items.windows(2) {
                let [a, b] = pair else { continue };
                prop_assert!(rank_order(a.as_ref(), b.as_ref()) != Ordering::Greater);
            }
        }
    }
}
