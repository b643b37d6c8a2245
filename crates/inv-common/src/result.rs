//! Outcome returned at the manifest processing boundary.

use crate::InventoryStatistics;
use serde::{Deserialize, Serialize};

/// Outcome of processing one manifest: either the persisted statistics or a
/// human-readable failure message, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ManifestProcessingResult {
    Success { statistics: InventoryStatistics },
    Failure { error_message: String },
}

impl ManifestProcessingResult {
    pub fn success(statistics: InventoryStatistics) -> Self {
        ManifestProcessingResult::Success { statistics }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        ManifestProcessingResult::Failure {
            error_message: error_message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ManifestProcessingResult::Success { .. })
    }

    pub fn statistics(&self) -> Option<&InventoryStatistics> {
        match self {
            ManifestProcessingResult::Success { statistics } => Some(statistics),
            ManifestProcessingResult::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ManifestProcessingResult::Success { .. } => None,
            ManifestProcessingResult::Failure { error_message } => Some(error_message),
        }
    }

    /// Consume the result, yielding the statistics on success.
    pub fn into_statistics(self) -> Option<InventoryStatistics> {
        match self {
            ManifestProcessingResult::Success { statistics } => Some(statistics),
            ManifestProcessingResult::Failure { .. } => None,
        }
    }
}
