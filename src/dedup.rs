//! Request deduplication.
//!
//! Consecutive trajectory points often fall in the same grid cells. Rows computed for a set of
//! [ResolvedIndices] are remembered, and a point resolving to remembered indices reuses the row
//! without fetching.

use crate::axes::ResolvedIndices;
use crate::models::ResultRow;

use cached::{Cached, SizedCache};
use serde::{Deserialize, Serialize};

/// Which rows are remembered.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Deduplication {
    /// Only the row of the immediately preceding point
    #[default]
    Previous,
    /// The rows of the `capacity` most recently used index sets
    Lru { capacity: usize },
}

impl Deduplication {
    fn capacity(&self) -> usize {
        match self {
            Deduplication::Previous => 1,
            Deduplication::Lru { capacity } => (*capacity).max(1),
        }
    }
}

/// Remembers rows by the indices they were computed from.
///
/// State is scoped to a single extraction.
pub struct RequestDeduplicator {
    strategy: Deduplication,
    rows: SizedCache<ResolvedIndices, ResultRow>,
}

impl RequestDeduplicator {
    /// Returns a new RequestDeduplicator
    pub fn new(strategy: Deduplication) -> Self {
        Self {
            strategy,
            rows: SizedCache::with_size(strategy.capacity()),
        }
    }

    /// Return a copy of the row remembered for `indices`, if any.
    pub fn lookup(&mut self, indices: &ResolvedIndices) -> Option<ResultRow> {
        self.rows.cache_get(indices).cloned()
    }

    /// Remember the row computed for `indices`.
    pub fn remember(&mut self, indices: ResolvedIndices, row: &ResultRow) {
        self.rows.cache_set(indices, row.clone());
    }

    /// Record that the current point produced no row.
    pub fn on_failure(&mut self) {
        // The next point has no preceding row to reuse.
        if self.strategy == Deduplication::Previous {
            self.rows.cache_clear();
        }
    }

    /// Number of remembered rows.
    pub fn len(&self) -> usize {
        self.rows.cache_size()
    }

    /// Whether no rows are remembered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
