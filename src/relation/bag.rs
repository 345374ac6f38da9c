//! Multiset of tuples.

use std::collections::btree_map::{self, BTreeMap};
use std::iter;

use super::tuple::Tuple;

/// Multiset of tuples keyed by value with a positive multiplicity each.
///
/// Entries never carry a zero count, so two bags are equal exactly when every
/// tuple has the same multiplicity in both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bag {
    counts: BTreeMap<Tuple, usize>,
}

impl Bag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one occurrence of `tuple`.
    pub fn insert(&mut self, tuple: Tuple) {
        self.insert_n(tuple, 1);
    }

    /// Adds `n` occurrences of `tuple`.
    pub fn insert_n(&mut self, tuple: Tuple, n: usize) {
        if n > 0 {
            *self.counts.entry(tuple).or_insert(0) += n;
        }
    }

    /// Multiplicity of `tuple`.
    pub fn count(&self, tuple: &Tuple) -> usize {
        self.counts.get(tuple).copied().unwrap_or(0)
    }

    /// Total number of occurrences.
    pub fn len(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of distinct tuples.
    pub fn distinct_len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the bag holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Distinct tuples with their multiplicities.
    pub fn iter(&self) -> btree_map::Iter<'_, Tuple, usize> {
        self.counts.iter()
    }

    /// Every occurrence, repeating each tuple by its multiplicity.
    pub fn elements(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.counts
            .iter()
            .flat_map(|(tuple, &n)| iter::repeat(tuple).take(n))
    }

    /// Consumes the bag into its occurrences.
    pub fn into_elements(self) -> Vec<Tuple> {
        let mut out = Vec::with_capacity(self.len());
        for (tuple, n) in self.counts {
            out.extend(iter::repeat(tuple).take(n));
        }
        out
    }

    /// Multiset sum in place: multiplicities add.
    pub fn merge(&mut self, other: Bag) {
        for (tuple, n) in other.counts {
            self.insert_n(tuple, n);
        }
    }

    /// Multiset sum.
    pub fn union(&self, other: &Bag) -> Bag {
        let mut out = self.clone();
        out.merge(other.clone());
        out
    }

    /// Multiplicity of each tuple is the minimum of both operands.
    pub fn intersection(&self, other: &Bag) -> Bag {
        let counts = self
            .counts
            .iter()
            .filter_map(|(tuple, &n)| {
                let m = n.min(other.count(tuple));
                (m > 0).then(|| (tuple.clone(), m))
            })
            .collect();
        Bag { counts }
    }

    /// Multiplicity of each tuple is `max(0, self - other)`.
    pub fn difference(&self, other: &Bag) -> Bag {
        let counts = self
            .counts
            .iter()
            .filter_map(|(tuple, &n)| {
                let m = n.saturating_sub(other.count(tuple));
                (m > 0).then(|| (tuple.clone(), m))
            })
            .collect();
        Bag { counts }
    }

    /// Caps every multiplicity at one.
    pub fn distinct(&self) -> Bag {
        let counts = self.counts.keys().map(|t| (t.clone(), 1)).collect();
        Bag { counts }
    }
}

impl FromIterator<Tuple> for Bag {
    fn from_iter<I: IntoIterator<Item = Tuple>>(iter: I) -> Self {
        let mut bag = Bag::new();
        bag.extend(iter);
        bag
    }
}

impl Extend<Tuple> for Bag {
    fn extend<I: IntoIterator<Item = Tuple>>(&mut self, iter: I) {
        for tuple in iter {
            self.insert(tuple);
        }
    }
}

impl<'a> IntoIterator for &'a Bag {
    type Item = (&'a Tuple, &'a usize);
    type IntoIter = btree_map::Iter<'a, Tuple, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
