//! Typed configuration for the inventory pipeline.
//!
//! The on-disk form is a single `config.json`:
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "metadata_fields": ["documentType", "department"],
//!   "analyzer": { "batch_size": 1024, "max_parallel_files": 4, "file_error_policy": "skip" },
//!   "store": { "dir": "/var/lib/storage_inventory/statistics" },
//!   "storage_root": "/srv/blob-mirror"
//! }
//! ```
//!
//! Every section is optional; missing values take the defaults below.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Rows decoded per batch when streaming a tabular file.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Upper bound on concurrently analyzed files.
pub const MAX_PARALLEL_FILES: usize = 64;

/// Upper bound for `analyzer.timeout_secs` (one week).
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Directory name used under the platform data directory.
const DATA_DIR_NAME: &str = "storage_inventory";

/// Top-level inventory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub schema_version: String,

    /// Metadata fields whose value frequencies are counted. Accepts either a
    /// JSON array or a single delimiter-separated string.
    #[serde(deserialize_with = "deserialize_fields")]
    pub metadata_fields: Vec<String>,

    pub analyzer: AnalyzerSettings,

    pub store: StoreSettings,

    /// Local directory standing in for object storage: one subdirectory per
    /// container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_root: Option<PathBuf>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            metadata_fields: Vec::new(),
            analyzer: AnalyzerSettings::default(),
            store: StoreSettings::default(),
            storage_root: None,
        }
    }
}

impl InventoryConfig {
    /// Parse from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// What to do when one tabular file cannot be analyzed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorPolicy {
    /// Any file-level failure fails the whole analysis.
    #[default]
    #[serde(alias = "abort")]
    AbortRun,
    /// Record the failed file and keep aggregating the others.
    #[serde(alias = "skip")]
    SkipFile,
}

impl FileErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileErrorPolicy::AbortRun => "abort",
            FileErrorPolicy::SkipFile => "skip",
        }
    }
}

impl std::fmt::Display for FileErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "abort_run" => Ok(FileErrorPolicy::AbortRun),
            "skip" | "skip_file" => Ok(FileErrorPolicy::SkipFile),
            other => Err(format!("unknown file error policy '{other}' (expected abort or skip)")),
        }
    }
}

/// Inventory analyzer tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    /// Rows decoded per batch.
    pub batch_size: usize,

    /// Files analyzed concurrently. 1 keeps strict manifest order.
    pub max_parallel_files: usize,

    pub file_error_policy: FileErrorPolicy,

    /// Wall-clock budget for one analysis, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_parallel_files: 1,
            file_error_policy: FileErrorPolicy::AbortRun,
            timeout_secs: None,
        }
    }
}

/// Statistics store location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl StoreSettings {
    /// Configured directory, or the platform default.
    pub fn effective_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_store_dir)
    }
}

/// Default statistics directory: `<data_local_dir>/storage_inventory/statistics`.
pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join("statistics")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldList {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_fields<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let joined = match FieldList::deserialize(deserializer)? {
        FieldList::Joined(raw) => raw,
        FieldList::List(items) => items.join(","),
    };
    Ok(crate::parse_metadata_fields(&joined))
}
