//! Small integer set used by aggregates to track link collections.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A set of 64-bit integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Int64Set {
    set: HashSet<i64>,
}

impl Int64Set {
    /// Creates a set holding `values`.
    pub fn new(values: impl IntoIterator<Item = i64>) -> Self {
        Self {
            set: values.into_iter().collect(),
        }
    }

    /// Inserts a value; returns false when it was already present.
    pub fn add(&mut self, value: i64) -> bool {
        self.set.insert(value)
    }

    /// Removes a value; returns false when it was not present.
    pub fn remove(&mut self, value: i64) -> bool {
        self.set.remove(&value)
    }

    /// Returns true if every one of `values` is present.
    ///
    /// This is a containment check, not set equality.
    pub fn equals(&self, values: &[i64]) -> bool {
        values.iter().all(|v| self.set.contains(v))
    }

    /// Returns true if every member of `other` is present.
    pub fn equals_set(&self, other: &Int64Set) -> bool {
        other.set.iter().all(|v| self.set.contains(v))
    }

    pub fn contains(&self, value: i64) -> bool {
        self.set.contains(&value)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Returns the members in unspecified order.
    pub fn to_vec(&self) -> Vec<i64> {
        self.set.iter().copied().collect()
    }

    /// Splits the receiver and `others` into `(left, common, right)`.
    ///
    /// `left` holds members of the receiver outside the intersection,
    /// `common` the intersection, and `right` members of `others` missing
    /// from the receiver.
    pub fn diff_set(&self, others: &[i64]) -> (Int64Set, Int64Set, Int64Set) {
        let mut left = Int64Set::default();
        let mut common = Int64Set::default();
        let mut right = Int64Set::default();

        for &value in others {
            if self.set.contains(&value) {
                common.add(value);
            } else {
                right.add(value);
            }
        }
        for &value in &self.set {
            if !common.contains(value) {
                left.add(value);
            }
        }

        (left, common, right)
    }

    /// Same as [`diff_set`](Self::diff_set) but returns plain vectors.
    pub fn diff(&self, others: &[i64]) -> (Vec<i64>, Vec<i64>, Vec<i64>) {
        let (left, common, right) = self.diff_set(others);
        (left.to_vec(), common.to_vec(), right.to_vec())
    }
}

impl FromIterator<i64> for Int64Set {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_reports_new_insertions() {
        let cases: [(&[i64], i64, &[i64], bool); 4] = [
            (&[], 10, &[10], true),
            (&[], 20, &[20], true),
            (&[20, 30], 40, &[20, 30, 40], true),
            (&[20, 30], 30, &[20, 30], false),
        ];

        for (i, (initial, value, expected, inserted)) in cases.into_iter().enumerate() {
            let mut set = Int64Set::new(initial.iter().copied());
            assert_eq!(set.add(value), inserted, "case {i}");
            assert!(set.equals(expected), "case {i}");
            assert_eq!(set.len(), expected.len(), "case {i}");
        }
    }

    #[test]
    fn remove_reports_presence() {
        let cases: [(&[i64], i64, &[i64], bool); 4] = [
            (&[10], 10, &[], true),
            (&[10], 20, &[10], false),
            (&[10, 20], 20, &[10], true),
            (&[10, 20, 30], 20, &[10, 30], true),
        ];

        for (i, (initial, value, expected, removed)) in cases.into_iter().enumerate() {
            let mut set = Int64Set::new(initial.iter().copied());
            assert_eq!(set.remove(value), removed, "case {i}");
            assert!(set.equals(expected), "case {i}");
            assert!(!set.contains(value), "case {i}");
        }
    }

    #[test]
    fn equals_is_containment_only() {
        let set = Int64Set::new([10, 20, 30]);
        assert!(set.equals(&[10, 20]));
        assert!(set.equals(&[]));
        assert!(!set.equals(&[10, 40]));
        assert!(set.equals_set(&Int64Set::new([30])));
    }

    #[test]
    fn diff_set_partitions_members() {
        let set = Int64Set::new([10, 20]);
        let (left, common, right) = set.diff_set(&[10, 30]);
        assert_eq!(left, Int64Set::new([20]));
        assert_eq!(common, Int64Set::new([10]));
        assert_eq!(right, Int64Set::new([30]));

        let set = Int64Set::new([10, 20, 30]);
        let (left, common, right) = set.diff_set(&[]);
        assert_eq!(left, Int64Set::new([10, 20, 30]));
        assert!(common.is_empty());
        assert!(right.is_empty());

        let (left, common, right) = Int64Set::default().diff_set(&[]);
        assert!(left.is_empty() && common.is_empty() && right.is_empty());
    }

    #[test]
    fn diff_returns_vectors() {
        let set = Int64Set::new([10]);
        let (left, mut common, right) = set.diff(&[10]);
        common.sort_unstable();
        assert!(left.is_empty());
        assert_eq!(common, vec![10]);
        assert!(right.is_empty());
    }
}
