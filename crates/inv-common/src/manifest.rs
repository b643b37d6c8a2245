//! Inventory manifest types.
//!
//! A manifest describes one completed storage-inventory run: the container the
//! tabular export files were written to, the list of those files, and the run
//! timing. Keys are camelCase in the documents written by the inventory
//! service; PascalCase keys are accepted as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Manifest of one completed inventory run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Container holding the tabular export files.
    #[serde(alias = "DestinationContainer")]
    pub destination_container: String,

    /// Storage account endpoint the inventory ran against.
    #[serde(default, alias = "Endpoint", skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Tabular export files, in the order they are analyzed.
    #[serde(default, alias = "Files")]
    pub files: Vec<ManifestFile>,

    #[serde(alias = "InventoryStartTime")]
    pub inventory_start_time: DateTime<Utc>,

    #[serde(alias = "InventoryCompletionTime")]
    pub inventory_completion_time: DateTime<Utc>,

    #[serde(default, alias = "RuleDefinition", skip_serializing_if = "Option::is_none")]
    pub rule_definition: Option<RuleDefinition>,

    #[serde(default, alias = "RuleName", skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,

    #[serde(default, alias = "Status", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, alias = "Summary", skip_serializing_if = "Option::is_none")]
    pub summary: Option<ManifestSummary>,

    #[serde(default, alias = "Version", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a manifest from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize to JSON with consistent formatting.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether the manifest references no tabular files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of the declared sizes of all referenced files.
    pub fn total_file_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// One tabular export file referenced by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    /// Path of the file inside the destination container.
    #[serde(alias = "Blob")]
    pub blob: String,

    /// Declared size in bytes.
    #[serde(default, alias = "Size")]
    pub size: u64,
}

impl ManifestFile {
    pub fn new(blob: impl Into<String>, size: u64) -> Self {
        Self {
            blob: blob.into(),
            size,
        }
    }
}

/// Rule that produced the inventory run. Passed through, not interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    #[serde(default, alias = "Filters", skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,

    #[serde(default, alias = "Format", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, alias = "ObjectType", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    #[serde(default, alias = "Schedule", skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    #[serde(default, alias = "SchemaFields")]
    pub schema_fields: Vec<String>,
}

/// Object filters of an inventory rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default, alias = "BlobTypes")]
    pub blob_types: Vec<String>,

    #[serde(default, alias = "IncludeBlobVersions")]
    pub include_blob_versions: bool,

    #[serde(default, alias = "IncludeSnapshots")]
    pub include_snapshots: bool,

    #[serde(default, alias = "PrefixMatch")]
    pub prefix_match: Vec<String>,
}

/// Summary reported by the inventory service itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSummary {
    #[serde(default, alias = "ObjectCount")]
    pub object_count: u64,

    #[serde(default, alias = "TotalObjectSize")]
    pub total_object_size: u64,
}
