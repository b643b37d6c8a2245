//! Error types for storage inventory processing.
//!
//! Errors carry:
//! - Stable error codes for machine parsing
//! - A category for grouping
//! - The scope the failure applies to (row, file or whole run)
//! - A recoverability hint
//!
//! Errors serialize to structured JSON for CLI output:
//! ```json
//! {
//!   "code": 30,
//!   "category": "analysis",
//!   "scope": "file",
//!   "message": "column 'AccessTier' not found in inventory file 'inv/part-1.csv'",
//!   "recoverable": false,
//!   "context": { "blob": "inv/part-1.csv", "column": "AccessTier" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for storage inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file and argument errors.
    Config,
    /// Manifest and tabular file retrieval errors.
    Source,
    /// Tabular parsing and aggregation errors.
    Analysis,
    /// Statistics persistence errors.
    Store,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Source => write!(f, "source"),
            ErrorCategory::Analysis => write!(f, "analysis"),
            ErrorCategory::Store => write!(f, "store"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// How far a failure reaches.
///
/// Row-scoped failures skip part of a single row and processing continues.
/// File-scoped failures stop one tabular file. Run-scoped failures end the
/// whole invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    Row,
    File,
    Run,
}

impl std::fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorScope::Row => write!(f, "row"),
            ErrorScope::File => write!(f, "file"),
            ErrorScope::Run => write!(f, "run"),
        }
    }
}

/// Unified error type for storage inventory processing.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    // Source errors (20-29)
    #[error("inventory manifest not found at {locator}")]
    ManifestNotFound { locator: String },

    #[error("invalid manifest locator: {0}")]
    InvalidLocator(String),

    #[error("failed to read inventory file '{blob}': {message}")]
    Source { blob: String, message: String },

    // Analysis errors (30-39)
    #[error("column '{column}' not found in inventory file '{blob}'")]
    ColumnNotFound { blob: String, column: String },

    #[error("manifest contains no files to analyze")]
    NoData,

    #[error("inventory analysis failed: {0}")]
    Analysis(String),

    #[error("inventory analysis cancelled")]
    Cancelled,

    // Store errors (40-49)
    #[error("failed to persist statistics: {0}")]
    Store(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Source errors
    /// - 30-39: Analysis errors
    /// - 40-49: Store errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig { .. } => 11,
            Error::ManifestNotFound { .. } => 20,
            Error::InvalidLocator(_) => 21,
            Error::Source { .. } => 22,
            Error::ColumnNotFound { .. } => 30,
            Error::NoData => 31,
            Error::Analysis(_) => 32,
            Error::Cancelled => 33,
            Error::Store(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig { .. } => ErrorCategory::Config,

            Error::ManifestNotFound { .. } | Error::InvalidLocator(_) | Error::Source { .. } => {
                ErrorCategory::Source
            }

            Error::ColumnNotFound { .. } | Error::NoData | Error::Analysis(_) | Error::Cancelled => {
                ErrorCategory::Analysis
            }

            Error::Store(_) => ErrorCategory::Store,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns the scope this error applies to.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Error::ColumnNotFound { .. } | Error::Source { .. } => ErrorScope::File,
            _ => ErrorScope::Run,
        }
    }

    /// Returns whether this error is potentially recoverable by retrying
    /// the invocation later.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidConfig { .. } => true,

            // The manifest may not have been written yet
            Error::ManifestNotFound { .. } => true,
            Error::InvalidLocator(_) => false,
            Error::Source { .. } => true,

            // Header shape and empty manifests do not change between retries
            Error::ColumnNotFound { .. } => false,
            Error::NoData => false,
            Error::Analysis(_) => false,
            Error::Cancelled => true,

            Error::Store(_) => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Scope of the failure.
    pub scope: ErrorScope,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., blob, column).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::ManifestNotFound { locator } => {
                context.insert("locator".to_string(), serde_json::json!(locator));
            }
            Error::Source { blob, .. } => {
                context.insert("blob".to_string(), serde_json::json!(blob));
            }
            Error::ColumnNotFound { blob, column } => {
                context.insert("blob".to_string(), serde_json::json!(blob));
                context.insert("column".to_string(), serde_json::json!(column));
            }
            Error::InvalidConfig { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            scope: err.scope(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}
