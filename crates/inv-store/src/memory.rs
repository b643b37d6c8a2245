//! In-memory statistics store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use inv_common::InventoryStatistics;
use tracing::warn;

use crate::StatisticsStore;

/// Keeps saved records in memory. Can be switched to reject saves.
#[derive(Debug, Default)]
pub struct MemoryStatisticsStore {
    records: Mutex<Vec<InventoryStatistics>>,
    reject: AtomicBool,
    attempts: AtomicUsize,
}

impl MemoryStatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every save reports failure.
    pub fn rejecting() -> Self {
        let store = Self::default();
        store.set_reject(true);
        store
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Snapshot of the saved records, in save order.
    pub fn records(&self) -> Vec<InventoryStatistics> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of `save` calls, successful or not.
    pub fn save_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl StatisticsStore for MemoryStatisticsStore {
    fn save(&self, statistics: &InventoryStatistics) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            warn!("in-memory store rejected statistics record");
            return false;
        }
        match self.records.lock() {
            Ok(mut records) => records.push(statistics.clone()),
            Err(poisoned) => poisoned.into_inner().push(statistics.clone()),
        }
        true
    }
}
