//! Storage inventory common types and errors.
//!
//! This crate provides the types shared by every other crate in the workspace:
//! - The inventory manifest as produced by a storage-inventory run
//! - Aggregated inventory statistics with an associative merge
//! - The processing result returned at the orchestration boundary
//! - Manifest locator parsing
//! - The common error type with stable codes

pub mod error;
pub mod locator;
pub mod manifest;
pub mod result;
pub mod statistics;

pub use error::{Error, ErrorCategory, ErrorScope, Result, StructuredError};
pub use locator::ManifestLocator;
pub use manifest::{Filters, Manifest, ManifestFile, ManifestSummary, RuleDefinition};
pub use result::ManifestProcessingResult;
pub use statistics::{AccessTier, CounterOverflow, InventoryStatistics, Metadata};

/// Schema version for serialized statistics records.
pub const SCHEMA_VERSION: &str = "1.0.0";
