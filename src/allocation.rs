//! Allocation resolver: nested weighting tree → flat target table.
//!
//! A weighting tree is a list of sibling `(percent, node)` pairs. Leaves name a
//! ticker; groups split their parent's share among their own children. The
//! percentages of every sibling group must add up to exactly 100.
//!
//! ```
//! use allotment::allocation::{resolve, Weight};
//!
//! let tree = vec![
//!     Weight::group(60, vec![Weight::leaf(50, "VTI"), Weight::leaf(50, "VXUS")]),
//!     Weight::leaf(40, "BND"),
//! ];
//! let table = resolve(&tree).unwrap();
//! assert_eq!(table.get("VTI"), Some(30));
//! assert_eq!(table.get("VXUS"), Some(30));
//! assert_eq!(table.get("BND"), Some(40));
//! ```

use std::cmp::Reverse;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::types::{Percent, Ticker};

/// Deepest nesting the exact multiplier is guaranteed to represent.
pub const MAX_DEPTH: usize = 16;

/// One node of a weighting tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WeightingNode {
    /// A single instrument.
    Leaf(Ticker),
    /// A sub-allocation whose children share the parent's percentage.
    Group(Vec<Weight>),
}

/// A node together with its percentage among its siblings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Weight {
    pub percent: Percent,
    pub node: WeightingNode,
}

impl Weight {
    pub fn leaf(percent: Percent, ticker: impl Into<Ticker>) -> Self {
        Self {
            percent,
            node: WeightingNode::Leaf(ticker.into()),
        }
    }

    pub fn group(percent: Percent, children: Vec<Weight>) -> Self {
        Self {
            percent,
            node: WeightingNode::Group(children),
        }
    }
}

/// Ticker → target percent, in display order.
///
/// Inserting a ticker that is already present overwrites its value but keeps
/// the position where it was first seen.
#[derive(Clone, Debug, Default)]
pub struct TargetAllocation {
    entries: Vec<(Ticker, Percent)>,
    index: FxHashMap<Ticker, usize>,
}

impl TargetAllocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the target for `ticker`.
    pub fn insert(&mut self, ticker: Ticker, percent: Percent) {
        match self.index.get(&ticker) {
            Some(&i) => self.entries[i].1 = percent,
            None => {
                self.index.insert(ticker.clone(), self.entries.len());
                self.entries.push((ticker, percent));
            }
        }
    }

    /// Target percent for `ticker`, if it is part of the allocation.
    pub fn get(&self, ticker: &str) -> Option<Percent> {
        self.index.get(ticker).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.index.contains_key(ticker)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ticker, Percent)> {
        self.entries.iter().map(|(t, p)| (t, *p))
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.entries.iter().map(|(t, _)| t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all target percentages.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, p)| u64::from(*p)).sum()
    }

    /// Stable sort by descending percent; ties keep their current order.
    fn sort_descending(&mut self) {
        self.entries.sort_by_key(|(_, p)| Reverse(*p));
        for (i, (ticker, _)) in self.entries.iter().enumerate() {
            self.index.insert(ticker.clone(), i);
        }
    }

    fn merge(&mut self, other: TargetAllocation) {
        for (ticker, percent) in other.entries {
            self.insert(ticker, percent);
        }
    }
}

impl PartialEq for TargetAllocation {
    /// Order-sensitive: two tables are equal only if they list the same
    /// entries in the same order.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for TargetAllocation {}

impl FromIterator<(Ticker, Percent)> for TargetAllocation {
    fn from_iter<I: IntoIterator<Item = (Ticker, Percent)>>(iter: I) -> Self {
        let mut table = TargetAllocation::new();
        for (ticker, percent) in iter {
            table.insert(ticker, percent);
        }
        table
    }
}

impl<'a> FromIterator<(&'a str, Percent)> for TargetAllocation {
    fn from_iter<I: IntoIterator<Item = (&'a str, Percent)>>(iter: I) -> Self {
        iter.into_iter().map(|(t, p)| (Ticker::from(t), p)).collect()
    }
}

impl fmt::Display for TargetAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (ticker, percent)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ticker}: {percent}")?;
        }
        write!(f, "}}")
    }
}

/// A weighting tree that cannot be resolved.
///
/// Both variants carry the table built so far at the failing level, to help
/// locate the unbalanced branch.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WeightingError {
    #[error("weights don't add up to 100 (got {total}): {partial}")]
    Unbalanced {
        total: u64,
        partial: TargetAllocation,
    },

    #[error("weighting tree nests deeper than {MAX_DEPTH} levels: {partial}")]
    TooDeep { partial: TargetAllocation },
}

impl WeightingError {
    /// Allocation accumulated before the failure was detected.
    pub fn partial(&self) -> &TargetAllocation {
        match self {
            WeightingError::Unbalanced { partial, .. } | WeightingError::TooDeep { partial } => {
                partial
            }
        }
    }
}

/// Exact fraction of the whole account a sibling group is splitting.
///
/// Kept as a reduced ratio so `percent * share` truncates exactly like
/// integer arithmetic on the real value would.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Share {
    num: u128,
    den: u128,
}

impl Share {
    const WHOLE: Share = Share { num: 1, den: 1 };

    /// The share a child group receives when it is given `percent` of `self`.
    fn scaled(self, percent: Percent) -> Option<Share> {
        let num = self.num.checked_mul(u128::from(percent))?;
        let den = self.den.checked_mul(100)?;
        let g = gcd(num, den);
        Some(if g > 1 {
            Share {
                num: num / g,
                den: den / g,
            }
        } else {
            Share { num, den }
        })
    }

    /// `floor(percent * self)`, saturating at `Percent::MAX`.
    fn apply(self, percent: Percent) -> Percent {
        u128::from(percent)
            .checked_mul(self.num)
            .and_then(|n| Percent::try_from(n / self.den).ok())
            .unwrap_or(Percent::MAX)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Flatten a weighting tree into a validated target table.
///
/// Leaves receive `floor(percent * multiplier)` where the multiplier is the
/// product of their ancestors' fractions. Duplicate tickers in different
/// branches overwrite each other (last write wins). The result is ordered by
/// descending percent; ties keep traversal order.
///
/// Fails if any sibling group, at any depth, does not add up to exactly 100;
/// an empty tree therefore always fails.
pub fn resolve(tree: &[Weight]) -> Result<TargetAllocation, WeightingError> {
    resolve_group(tree, Share::WHOLE, 0)
}

fn resolve_group(
    group: &[Weight],
    share: Share,
    depth: usize,
) -> Result<TargetAllocation, WeightingError> {
    let mut table = TargetAllocation::new();
    let mut running_total: u64 = 0;

    for weight in group {
        running_total += u64::from(weight.percent);
        match &weight.node {
            WeightingNode::Leaf(ticker) => {
                table.insert(ticker.clone(), share.apply(weight.percent));
            }
            WeightingNode::Group(children) => {
                let child_share = match share.scaled(weight.percent) {
                    Some(s) if depth < MAX_DEPTH => s,
                    _ => return Err(WeightingError::TooDeep { partial: table }),
                };
                table.merge(resolve_group(children, child_share, depth + 1)?);
            }
        }
    }

    if running_total != 100 {
        return Err(WeightingError::Unbalanced {
            total: running_total,
            partial: table,
        });
    }

    table.sort_descending();
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(table: &TargetAllocation) -> Vec<(&str, Percent)> {
        table.iter().map(|(t, p)| (t.as_str(), p)).collect()
    }

    #[test]
    fn empty_tree_fails() {
        let err = resolve(&[]).unwrap_err();
        assert!(matches!(err, WeightingError::Unbalanced { total: 0, .. }));
        assert!(err.partial().is_empty());
    }

    #[test]
    fn one_fund() {
        let table = resolve(&[Weight::leaf(100, "VFIFX")]).unwrap();
        assert_eq!(entries(&table), vec![("VFIFX", 100)]);
    }

    #[test]
    fn sorted_descending_regardless_of_input_order() {
        let a = resolve(&[Weight::leaf(60, "VT"), Weight::leaf(40, "BND")]).unwrap();
        let b = resolve(&[Weight::leaf(40, "BND"), Weight::leaf(60, "VT")]).unwrap();
        assert_eq!(entries(&a), vec![("VT", 60), ("BND", 40)]);
        assert_eq!(a, b);
    }

    #[test]
    fn ties_keep_traversal_order() {
        let table = resolve(&[
            Weight::leaf(25, "D"),
            Weight::leaf(50, "A"),
            Weight::leaf(25, "C"),
        ])
        .unwrap();
        assert_eq!(entries(&table), vec![("A", 50), ("D", 25), ("C", 25)]);
    }

    #[test]
    fn nested_multiplier_is_cumulative() {
        // 50% of 50% of 40% = 10%
        let tree = vec![
            Weight::group(
                40,
                vec![
                    Weight::group(50, vec![Weight::leaf(50, "A"), Weight::leaf(50, "B")]),
                    Weight::leaf(50, "C"),
                ],
            ),
            Weight::leaf(60, "D"),
        ];
        let table = resolve(&tree).unwrap();
        assert_eq!(
            entries(&table),
            vec![("D", 60), ("C", 20), ("A", 10), ("B", 10)]
        );
    }

    #[test]
    fn leaf_values_truncate() {
        // 33% of 50% = 16.5 -> 16
        let tree = vec![
            Weight::group(
                50,
                vec![
                    Weight::leaf(33, "A"),
                    Weight::leaf(33, "B"),
                    Weight::leaf(34, "C"),
                ],
            ),
            Weight::leaf(50, "D"),
        ];
        let table = resolve(&tree).unwrap();
        assert_eq!(table.get("A"), Some(16));
        assert_eq!(table.get("B"), Some(16));
        assert_eq!(table.get("C"), Some(17));
        assert_eq!(table.total(), 99);
    }

    #[test]
    fn duplicate_ticker_last_write_wins_in_first_position() {
        let tree = vec![
            Weight::leaf(30, "VTI"),
            Weight::group(70, vec![Weight::leaf(50, "VTI"), Weight::leaf(50, "BND")]),
        ];
        let table = resolve(&tree).unwrap();
        assert_eq!(entries(&table), vec![("VTI", 35), ("BND", 35)]);
    }

    #[test]
    fn inner_group_imbalance_fails_with_inner_partial() {
        let tree = vec![
            Weight::group(60, vec![Weight::leaf(50, "VTI"), Weight::leaf(49, "VXUS")]),
            Weight::leaf(40, "BND"),
        ];
        let err = resolve(&tree).unwrap_err();
        match &err {
            WeightingError::Unbalanced { total, partial } => {
                assert_eq!(*total, 99);
                assert_eq!(partial.get("VTI"), Some(30));
                assert!(!partial.contains("BND"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn outer_imbalance_fails_with_everything_so_far() {
        let err = resolve(&[Weight::leaf(90, "VTI"), Weight::leaf(90, "VXUS")]).unwrap_err();
        assert!(matches!(err, WeightingError::Unbalanced { total: 180, .. }));
        assert_eq!(err.partial().len(), 2);
        assert!(err.to_string().contains("180"));
    }

    #[test]
    fn empty_nested_group_fails() {
        let err = resolve(&[Weight::group(100, vec![])]).unwrap_err();
        assert!(matches!(err, WeightingError::Unbalanced { total: 0, .. }));
    }

    #[test]
    fn too_deep_is_reported() {
        let mut node = Weight::leaf(100, "DEEP");
        for _ in 0..=MAX_DEPTH {
            node = Weight::group(100, vec![node]);
        }
        let err = resolve(&[node]).unwrap_err();
        assert!(matches!(err, WeightingError::TooDeep { .. }));
    }

    #[test]
    fn max_depth_resolves() {
        let mut node = Weight::leaf(100, "DEEP");
        for _ in 0..MAX_DEPTH {
            node = Weight::group(100, vec![node]);
        }
        let table = resolve(&[node]).unwrap();
        assert_eq!(table.get("DEEP"), Some(100));
    }

    #[test]
    fn huge_percents_fail_without_overflow() {
        for m in [u32::MAX, 4_000_000_000, 2_147_483_647, 999_999_999] {
            let mut node = Weight::leaf(m, "X");
            for _ in 0..4 {
                node = Weight::group(m, vec![node]);
            }
            let err = resolve(&[node]).unwrap_err();
            assert!(matches!(
                err,
                WeightingError::Unbalanced { .. } | WeightingError::TooDeep { .. }
            ));
        }
    }

    #[test]
    fn leaf_share_saturates() {
        let share = Share {
            num: u128::MAX / 2,
            den: 1,
        };
        assert_eq!(share.apply(3), Percent::MAX);
        assert_eq!(Share::WHOLE.apply(40), 40);
    }

    #[test]
    fn display_lists_entries_in_order() {
        let table: TargetAllocation = [("VT", 60), ("BND", 40)].into_iter().collect();
        assert_eq!(table.to_string(), "{VT: 60, BND: 40}");
    }
}
