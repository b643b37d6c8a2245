//! Storage inventory statistics store.
//!
//! This crate provides:
//! - The `StatisticsStore` trait the manifest service persists through
//! - Arrow schema for persisted statistics records
//! - An append-only Parquet store with atomic writes and read-back
//! - An in-memory store for tests and dry runs

pub mod memory;
pub mod schema;
pub mod writer;

pub use memory::MemoryStatisticsStore;
pub use schema::{statistics_schema, PARTITION_KEY, TABLE_NAME};
pub use writer::{ParquetStatisticsStore, StoreConfig, StoreError, StoredStatistics};

use inv_common::InventoryStatistics;

/// Append-only sink for computed statistics.
///
/// `save` reports success as a boolean; adapters log their own failure
/// detail. Every call appends a new record, nothing is updated in place.
pub trait StatisticsStore: Send + Sync {
    fn save(&self, statistics: &InventoryStatistics) -> bool;
}

impl<S: StatisticsStore + ?Sized> StatisticsStore for std::sync::Arc<S> {
    fn save(&self, statistics: &InventoryStatistics) -> bool {
        (**self).save(statistics)
    }
}
