//! Rule dependency relation
//!
//! A dependency `depends(a, b)` states that rules `a` and `b` overlap such
//! that swapping their relative order would change which rule reports a
//! match for some packet. The relation is keyed by rule identity, never by
//! list position, because positions move as the engine reorders rules.
//!
//! # Example
//!
//! ```
//! use acl_reorder::rules::DependencySet;
//!
//! let deps = DependencySet::builder()
//!     .add(1, 2)
//!     .build();
//!
//! assert!(deps.depends(1, 2));
//! assert!(!deps.depends(2, 1));
//! assert!(!deps.may_swap(1, 2));
//! assert!(!deps.may_swap(2, 1));
//! assert!(deps.may_swap(1, 3));
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::types::RuleId;
use crate::error::EngineError;

/// A single dependency edge: `rule` depends on `depends_on`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Rule whose match region overlaps `depends_on`
    pub rule: RuleId,

    /// Rule that must keep its relative order with `rule`
    pub depends_on: RuleId,
}

impl Dependency {
    /// Create a new dependency edge
    #[must_use]
    pub const fn new(rule: RuleId, depends_on: RuleId) -> Self {
        Self { rule, depends_on }
    }
}

/// Immutable dependency relation over rule identities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    edges: HashSet<(RuleId, RuleId)>,
}

impl DependencySet {
    /// Create an empty relation (every pair may be swapped)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a builder
    #[must_use]
    pub fn builder() -> DependencySetBuilder {
        DependencySetBuilder::new()
    }

    /// Build a relation from explicit `(rule, depends_on)` pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (RuleId, RuleId)>) -> Self {
        Self {
            edges: pairs.into_iter().collect(),
        }
    }

    /// Build a relation from a square 0/1 matrix indexed by initial order
    ///
    /// `matrix[i][j] != 0` means the rule initially at position `i` depends
    /// on the rule initially at position `j`. Positions are translated to
    /// identities once, here, so the relation stays correct after swaps.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the matrix is not
    /// `ids.len() x ids.len()`.
    ///
    /// # Example
    ///
    /// ```
    /// use acl_reorder::rules::DependencySet;
    ///
    /// let ids = [10, 20, 30];
    /// let matrix = vec![vec![0, 1, 0], vec![0, 0, 0], vec![0, 0, 0]];
    /// let deps = DependencySet::from_matrix(&ids, &matrix).unwrap();
    /// assert!(deps.depends(10, 20));
    /// assert!(deps.may_swap(20, 30));
    /// ```
    pub fn from_matrix(ids: &[RuleId], matrix: &[Vec<u8>]) -> Result<Self, EngineError> {
        if matrix.len() != ids.len() {
            return Err(EngineError::configuration(format!(
                "dependency matrix has {} rows, expected {}",
                matrix.len(),
                ids.len()
            )));
        }

        let mut edges = HashSet::new();
        for (i, row) in matrix.iter().enumerate() {
            if row.len() != ids.len() {
                return Err(EngineError::configuration(format!(
                    "dependency matrix row {i} has {} columns, expected {}",
                    row.len(),
                    ids.len()
                )));
            }
            for (j, &cell) in row.iter().enumerate() {
                if cell != 0 {
                    edges.insert((ids[i], ids[j]));
                }
            }
        }

        Ok(Self { edges })
    }

    /// Check whether `a` depends on `b`
    #[must_use]
    pub fn depends(&self, a: RuleId, b: RuleId) -> bool {
        self.edges.contains(&(a, b))
    }

    /// Check whether two rules may exchange their relative order
    ///
    /// True iff neither `depends(a, b)` nor `depends(b, a)` holds.
    #[must_use]
    pub fn may_swap(&self, a: RuleId, b: RuleId) -> bool {
        !self.depends(a, b) && !self.depends(b, a)
    }

    /// Number of dependency edges
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if the relation is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterate over all edges in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = Dependency> + '_ {
        self.edges.iter().map(|&(rule, depends_on)| Dependency::new(rule, depends_on))
    }

    /// All edges sorted by `(rule, depends_on)`, for stable output
    #[must_use]
    pub fn sorted(&self) -> Vec<Dependency> {
        let mut edges: Vec<_> = self.iter().collect();
        edges.sort_by_key(|d| (d.rule, d.depends_on));
        edges
    }

    /// Verify that every edge references a known rule
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` naming the first unknown id.
    pub fn validate_against(&self, known: &HashSet<RuleId>) -> Result<(), EngineError> {
        for dep in self.sorted() {
            for id in [dep.rule, dep.depends_on] {
                if !known.contains(&id) {
                    return Err(EngineError::configuration(format!(
                        "dependency {} -> {} references unknown rule {id}",
                        dep.rule, dep.depends_on
                    )));
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<Dependency> for DependencySet {
    fn from_iter<T: IntoIterator<Item = Dependency>>(iter: T) -> Self {
        Self::from_pairs(iter.into_iter().map(|d| (d.rule, d.depends_on)))
    }
}

/// Builder for [`DependencySet`]
#[derive(Debug, Default)]
pub struct DependencySetBuilder {
    edges: HashSet<(RuleId, RuleId)>,
}

impl DependencySetBuilder {
    /// Create a new empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `rule` depends on `depends_on`
    #[must_use]
    pub fn add(mut self, rule: RuleId, depends_on: RuleId) -> Self {
        self.edges.insert((rule, depends_on));
        self
    }

    /// Freeze the relation
    #[must_use]
    pub fn build(self) -> DependencySet {
        DependencySet { edges: self.edges }
    }
}
