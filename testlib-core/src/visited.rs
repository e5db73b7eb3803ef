//! Visited-pair tracking for cyclic and shared structures.

use std::collections::HashSet;

/// Outcome of entering a pointer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Both sides point at the same referent.
    Identical,
    /// The pair is already being (or has been) compared.
    Seen,
    /// First time this pair is compared; it is now recorded.
    First,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VisitedPair {
    low: usize,
    high: usize,
    shape: &'static str,
}

/// Set of referent-address pairs already compared during one top-level call.
///
/// Pairs are canonicalized so `(a, b)` and `(b, a)` are the same entry.
#[derive(Debug, Default)]
pub struct Visited {
    pairs: HashSet<VisitedPair>,
}

impl Visited {
    /// Create an empty visited set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the pair `(a, b)` of type `shape` is being compared.
    pub fn enter(&mut self, a: usize, b: usize, shape: &'static str) -> Visit {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        if low == high {
            return Visit::Identical;
        }
        if self.pairs.insert(VisitedPair { low, high, shape }) {
            Visit::First
        } else {
            Visit::Seen
        }
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no pair has been recorded.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
