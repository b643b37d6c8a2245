//! Structured event vocabulary.
//!
//! Every event carries the run correlation ID and the pipeline stage it was
//! emitted from, so JSONL output can be grouped per manifest run.

use serde::{Deserialize, Serialize};

/// Stages of one manifest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Manifest retrieval.
    Manifest,
    /// Tabular file analysis.
    Analyze,
    /// Statistics persistence.
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Manifest => "manifest",
            Stage::Analyze => "analyze",
            Stage::Persist => "persist",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const MANIFEST_LOADED: &str = "manifest.loaded";
    pub const MANIFEST_MISSING: &str = "manifest.missing";
    pub const MANIFEST_EMPTY: &str = "manifest.empty";

    pub const ANALYZE_STARTED: &str = "analyze.started";
    pub const ANALYZE_FAILED: &str = "analyze.failed";
    pub const ANALYZE_FINISHED: &str = "analyze.finished";

    pub const PERSIST_SAVED: &str = "persist.saved";
    pub const PERSIST_REJECTED: &str = "persist.rejected";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation context shared by every event of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    pub run_id: String,
    /// Manifest locator once known.
    pub manifest: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            manifest: None,
        }
    }

    pub fn with_manifest(mut self, locator: impl Into<String>) -> Self {
        self.manifest = Some(locator.into());
        self
    }
}
