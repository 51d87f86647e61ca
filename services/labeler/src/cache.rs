//! Cache of the latest fact record per worker.

use std::sync::Arc;

use dashmap::DashMap;
use plabel_facts::FactRecord;
use tracing::debug;

use crate::worker::WorkerId;

/// Latest successfully collected facts, keyed by worker identity.
///
/// Entries only appear after a successful collection. Nothing is evicted
/// except by [`FactCache::invalidate_all`] or [`FactCache::remove`].
#[derive(Debug, Default)]
pub struct FactCache {
    entries: DashMap<WorkerId, Arc<FactRecord>>,
}

impl FactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &WorkerId) -> Option<Arc<FactRecord>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Store a record, replacing any previous one for the worker.
    pub fn put(&self, id: WorkerId, record: FactRecord) -> Arc<FactRecord> {
        let record = Arc::new(record);
        self.entries.insert(id, Arc::clone(&record));
        record
    }

    pub fn remove(&self, id: &WorkerId) -> Option<Arc<FactRecord>> {
        self.entries.remove(id).map(|(_, record)| record)
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count, "Fact cache invalidated");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
