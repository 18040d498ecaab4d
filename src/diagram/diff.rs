use std::collections::HashSet;

/// Outcome of matching the keys currently on screen against the keys of a
/// fresh layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedDiff {
    /// New keys with no visual yet, in new-key order.
    pub to_create: Vec<String>,
    /// Keys present on both sides, in new-key order.
    pub to_update: Vec<String>,
    /// Old keys absent from the new set, in old-key order.
    pub to_remove: Vec<String>,
}

impl KeyedDiff {
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_remove.is_empty()
    }
}

/// Three-way split of two key sequences. Duplicate keys are reported once.
pub fn keyed_diff<'a, O, N>(old_keys: O, new_keys: N) -> KeyedDiff
where
    O: IntoIterator<Item = &'a str>,
    N: IntoIterator<Item = &'a str>,
{
    let old: Vec<&str> = old_keys.into_iter().collect();
    let old_set: HashSet<&str> = old.iter().copied().collect();

    let mut diff = KeyedDiff::default();
    let mut seen: HashSet<&str> = HashSet::new();
    for key in new_keys {
        if !seen.insert(key) {
            continue;
        }
        if old_set.contains(key) {
            diff.to_update.push(key.to_string());
        } else {
            diff.to_create.push(key.to_string());
        }
    }

    let mut removed: HashSet<&str> = HashSet::new();
    for key in old {
        if !seen.contains(key) && removed.insert(key) {
            diff.to_remove.push(key.to_string());
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_keys_three_ways() {
        let diff = keyed_diff(["a", "b", "c"], ["b", "d", "a"]);
        assert_eq!(diff.to_create, vec!["d"]);
        assert_eq!(diff.to_update, vec!["b", "a"]);
        assert_eq!(diff.to_remove, vec!["c"]);
        assert!(!diff.is_noop());
    }

    #[test]
    fn identical_sets_only_update() {
        let diff = keyed_diff(["x", "y"], ["x", "y"]);
        assert!(diff.is_noop());
        assert_eq!(diff.to_update.len(), 2);
    }

    #[test]
    fn empty_sides() {
        let diff = keyed_diff(std::iter::empty(), ["a", "a"]);
        assert_eq!(diff.to_create, vec!["a"]);
        let diff = keyed_diff(["a"], std::iter::empty());
        assert_eq!(diff.to_remove, vec!["a"]);
        assert!(diff.to_update.is_empty());
    }
}
