//! Aggregated inventory statistics.
//!
//! `InventoryStatistics` is built per file (or per worker) and combined with
//! [`InventoryStatistics::merge`]. Merging is a field-wise sum plus a map union
//! that adds counters, so it is associative and commutative: partial results
//! can be computed independently and combined in any grouping.
//!
//! Counters never wrap: an addition past `u64::MAX` is reported as
//! [`CounterOverflow`] and leaves the aggregate unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A counter or byte total would exceed `u64::MAX`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("statistics counter overflow")]
pub struct CounterOverflow;

fn add(a: u64, b: u64) -> Result<u64, CounterOverflow> {
    a.checked_add(b).ok_or(CounterOverflow)
}

/// Storage access tier of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Hot,
    Cool,
    Cold,
    Archive,
}

impl AccessTier {
    /// All known tiers.
    pub const ALL: [AccessTier; 4] = [
        AccessTier::Hot,
        AccessTier::Cool,
        AccessTier::Cold,
        AccessTier::Archive,
    ];

    /// Match a tier name case-insensitively. Returns `None` for names outside
    /// the known set, including the empty string.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        AccessTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Hot => "hot",
            AccessTier::Cool => "cool",
            AccessTier::Cold => "cold",
            AccessTier::Archive => "archive",
        }
    }
}

impl std::fmt::Display for AccessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value frequencies observed for one tracked metadata field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Field name the counters belong to.
    pub label: String,

    /// Observed value -> number of rows carrying it.
    #[serde(default)]
    pub counters: BTreeMap<String, u64>,
}

impl Metadata {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            counters: BTreeMap::new(),
        }
    }

    /// Number of rows that carried this field.
    pub fn total(&self) -> u64 {
        self.counters.values().sum()
    }
}

/// Aggregate statistics for one inventory run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStatistics {
    pub inventory_start_time: DateTime<Utc>,
    pub inventory_completion_time: DateTime<Utc>,

    /// Objects accounted across all tiers and files.
    pub object_count: u64,
    /// Bytes accounted across all tiers and files.
    pub total_object_size: u64,

    pub object_in_hot_count: u64,
    pub total_object_in_hot_size: u64,
    pub object_in_cool_count: u64,
    pub total_object_in_cool_size: u64,
    pub object_in_cold_count: u64,
    pub total_object_in_cold_size: u64,
    pub object_in_archive_count: u64,
    pub total_object_in_archive_size: u64,

    /// Tracked metadata field -> value frequencies.
    #[serde(default)]
    pub metadata_list: BTreeMap<String, Metadata>,
}

impl InventoryStatistics {
    /// Create an empty aggregate for a run with the given timing.
    pub fn new(
        inventory_start_time: DateTime<Utc>,
        inventory_completion_time: DateTime<Utc>,
    ) -> Self {
        Self {
            inventory_start_time,
            inventory_completion_time,
            object_count: 0,
            total_object_size: 0,
            object_in_hot_count: 0,
            total_object_in_hot_size: 0,
            object_in_cool_count: 0,
            total_object_in_cool_size: 0,
            object_in_cold_count: 0,
            total_object_in_cold_size: 0,
            object_in_archive_count: 0,
            total_object_in_archive_size: 0,
            metadata_list: BTreeMap::new(),
        }
    }

    /// Create an empty aggregate carrying the manifest's timing.
    pub fn for_manifest(manifest: &crate::Manifest) -> Self {
        Self::new(
            manifest.inventory_start_time,
            manifest.inventory_completion_time,
        )
    }

    /// Account one object. Objects with an unrecognized tier count towards
    /// the totals only.
    pub fn record_object(
        &mut self,
        size: u64,
        tier: Option<AccessTier>,
    ) -> Result<(), CounterOverflow> {
        let object_count = add(self.object_count, 1)?;
        let total_object_size = add(self.total_object_size, size)?;
        if let Some(tier) = tier {
            let (count, bytes) = self.tier_counters_mut(tier);
            let (next_count, next_bytes) = (add(*count, 1)?, add(*bytes, size)?);
            *count = next_count;
            *bytes = next_bytes;
        }
        self.object_count = object_count;
        self.total_object_size = total_object_size;
        Ok(())
    }

    /// Count one occurrence of `value` for the metadata field `name`.
    pub fn record_metadata(&mut self, name: &str, value: &str) {
        let metadata = self
            .metadata_list
            .entry(name.to_string())
            .or_insert_with(|| Metadata::new(name));
        // Per-value counts are bounded by the checked object count.
        let count = metadata.counters.entry(value.to_string()).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Object count for one tier.
    pub fn tier_count(&self, tier: AccessTier) -> u64 {
        match tier {
            AccessTier::Hot => self.object_in_hot_count,
            AccessTier::Cool => self.object_in_cool_count,
            AccessTier::Cold => self.object_in_cold_count,
            AccessTier::Archive => self.object_in_archive_count,
        }
    }

    /// Total bytes for one tier.
    pub fn tier_size(&self, tier: AccessTier) -> u64 {
        match tier {
            AccessTier::Hot => self.total_object_in_hot_size,
            AccessTier::Cool => self.total_object_in_cool_size,
            AccessTier::Cold => self.total_object_in_cold_size,
            AccessTier::Archive => self.total_object_in_archive_size,
        }
    }

    /// Sum of the four per-tier object counts.
    pub fn tiered_object_count(&self) -> u64 {
        AccessTier::ALL.iter().map(|t| self.tier_count(*t)).sum()
    }

    /// Objects whose tier matched none of the known tiers.
    pub fn untiered_object_count(&self) -> u64 {
        self.object_count - self.tiered_object_count()
    }

    /// Fold another partial aggregate into this one.
    ///
    /// Timing fields are left untouched: every partial of one run carries the
    /// same manifest timing. On overflow nothing is merged.
    pub fn merge(&mut self, other: InventoryStatistics) -> Result<(), CounterOverflow> {
        let mut sums = self.counters();
        for (sum, value) in sums.iter_mut().zip(other.counters()) {
            *sum = add(*sum, value)?;
        }
        for (name, metadata) in &other.metadata_list {
            if let Some(target) = self.metadata_list.get(name) {
                for (value, count) in &metadata.counters {
                    add(target.counters.get(value).copied().unwrap_or(0), *count)?;
                }
            }
        }

        self.set_counters(sums);
        for (name, metadata) in other.metadata_list {
            let target = self
                .metadata_list
                .entry(name)
                .or_insert_with(|| Metadata::new(metadata.label.clone()));
            for (value, count) in metadata.counters {
                *target.counters.entry(value).or_insert(0) += count;
            }
        }
        Ok(())
    }

    fn counters(&self) -> [u64; 10] {
        [
            self.object_count,
            self.total_object_size,
            self.object_in_hot_count,
            self.total_object_in_hot_size,
            self.object_in_cool_count,
            self.total_object_in_cool_size,
            self.object_in_cold_count,
            self.total_object_in_cold_size,
            self.object_in_archive_count,
            self.total_object_in_archive_size,
        ]
    }

    fn set_counters(&mut self, counters: [u64; 10]) {
        [
            self.object_count,
            self.total_object_size,
            self.object_in_hot_count,
            self.total_object_in_hot_size,
            self.object_in_cool_count,
            self.total_object_in_cool_size,
            self.object_in_cold_count,
            self.total_object_in_cold_size,
            self.object_in_archive_count,
            self.total_object_in_archive_size,
        ] = counters;
    }

    fn tier_counters_mut(&mut self, tier: AccessTier) -> (&mut u64, &mut u64) {
        match tier {
            AccessTier::Hot => (
                &mut self.object_in_hot_count,
                &mut self.total_object_in_hot_size,
            ),
            AccessTier::Cool => (
                &mut self.object_in_cool_count,
                &mut self.total_object_in_cool_size,
            ),
            AccessTier::Cold => (
                &mut self.object_in_cold_count,
                &mut self.total_object_in_cold_size,
            ),
            AccessTier::Archive => (
                &mut self.object_in_archive_count,
                &mut self.total_object_in_archive_size,
            ),
        }
    }
}
