//! Published index snapshots.
//!
//! # Invariants
//! - Exactly one snapshot is published at any time.
//! - Publishing replaces the pointer; readers holding an older `Arc` keep a
//!   complete, consistent view.
//! - Generations increase by one per publication.

use crate::index::Index;
use crate::service::cycle_service::CycleReport;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// One published index with the report of the cycle that built it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub generation: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub index: Index,
    pub report: CycleReport,
}

impl IndexSnapshot {
    /// Generation zero: nothing loaded yet.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            published_at: None,
            index: Index::default(),
            report: CycleReport::default(),
        }
    }
}

/// Holder of the current snapshot.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexHandle {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(IndexSnapshot::empty())),
        }
    }

    /// Current snapshot. Queries on it need no further locking.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the current snapshot and returns the new one.
    pub fn publish(&self, index: Index, report: CycleReport) -> Arc<IndexSnapshot> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(IndexSnapshot {
            generation: current.generation + 1,
            published_at: Some(Utc::now()),
            index,
            report,
        });
        *current = Arc::clone(&next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::IndexHandle;
    use crate::index::Index;
    use crate::service::cycle_service::CycleReport;

    #[test]
    fn readers_keep_their_snapshot_across_publish() {
        let handle = IndexHandle::new();
        let before = handle.snapshot();
        assert_eq!(before.generation, 0);

        let published = handle.publish(Index::default(), CycleReport::default());
        assert_eq!(published.generation, 1);
        assert_eq!(before.generation, 0);
        assert_eq!(handle.snapshot().generation, 1);
    }
}
