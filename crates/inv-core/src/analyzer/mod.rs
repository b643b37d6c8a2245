//! Inventory analysis: manifest + tracked metadata fields → statistics.
//!
//! Each file referenced by the manifest is streamed from the tabular source,
//! its header resolved by column name, and every data row accounted into a
//! per-file partial [`InventoryStatistics`]. Partials are merged in manifest
//! order. Because merging is associative and commutative, files may be
//! analyzed concurrently (`max_parallel_files > 1`) with identical results.
//!
//! Failure scopes:
//! - row: unparseable content length (row skipped), malformed metadata JSON
//!   (metadata skipped for that row)
//! - file: missing column, stream open/read failure, undecodable content,
//!   byte totals past `u64::MAX`
//! - run: no files, cancellation, deadline, or every file failed

pub mod columns;
mod tabular;

pub use columns::{ColumnIndex, RequiredColumns, REQUIRED_COLUMNS};
pub use inv_config::FileErrorPolicy;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use inv_common::{
    AccessTier, CounterOverflow, ErrorScope, InventoryStatistics, Manifest, ManifestFile,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::{CancellationToken, Interrupted};
use crate::source::{SourceError, TabularFileSource};
use tabular::{InventoryRows, OpenError, RawRow};

/// Errors from inventory analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("manifest contains no files to analyze")]
    NoData,

    #[error("column '{column}' not found in inventory file '{blob}'")]
    ColumnNotFound { blob: String, column: String },

    #[error("failed to open inventory file '{blob}': {source}")]
    Source {
        blob: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to decode inventory file '{blob}': {message}")]
    Decode { blob: String, message: String },

    #[error("statistics overflow while accounting inventory file '{blob}'")]
    CounterOverflow { blob: String },

    #[error("inventory analysis cancelled")]
    Cancelled,

    #[error("inventory analysis exceeded its deadline")]
    DeadlineExceeded,

    #[error("all {failed} inventory files failed; first error: {first}")]
    AllFilesFailed { failed: usize, first: String },
}

impl AnalysisError {
    /// How far this failure reaches.
    pub fn scope(&self) -> ErrorScope {
        match self {
            AnalysisError::ColumnNotFound { .. }
            | AnalysisError::Source { .. }
            | AnalysisError::Decode { .. }
            | AnalysisError::CounterOverflow { .. } => ErrorScope::File,
            AnalysisError::NoData
            | AnalysisError::Cancelled
            | AnalysisError::DeadlineExceeded
            | AnalysisError::AllFilesFailed { .. } => ErrorScope::Run,
        }
    }

    /// The file the error belongs to, for file-scoped errors.
    pub fn blob(&self) -> Option<&str> {
        match self {
            AnalysisError::ColumnNotFound { blob, .. }
            | AnalysisError::Source { blob, .. }
            | AnalysisError::Decode { blob, .. }
            | AnalysisError::CounterOverflow { blob } => Some(blob),
            _ => None,
        }
    }
}

impl From<Interrupted> for AnalysisError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => AnalysisError::Cancelled,
            Interrupted::DeadlineExceeded => AnalysisError::DeadlineExceeded,
        }
    }
}

impl From<AnalysisError> for inv_common::Error {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::NoData => inv_common::Error::NoData,
            AnalysisError::ColumnNotFound { blob, column } => {
                inv_common::Error::ColumnNotFound { blob, column }
            }
            AnalysisError::Source { blob, source } => inv_common::Error::Source {
                blob,
                message: source.to_string(),
            },
            AnalysisError::Cancelled | AnalysisError::DeadlineExceeded => {
                inv_common::Error::Cancelled
            }
            other => inv_common::Error::Analysis(other.to_string()),
        }
    }
}

/// Analyzer tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Rows decoded per batch.
    pub batch_size: usize,
    /// Files analyzed concurrently; 1 is strictly sequential.
    pub max_parallel_files: usize,
    pub file_error_policy: FileErrorPolicy,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self::from(&inv_config::AnalyzerSettings::default())
    }
}

impl From<&inv_config::AnalyzerSettings> for AnalyzerOptions {
    fn from(settings: &inv_config::AnalyzerSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            max_parallel_files: settings.max_parallel_files,
            file_error_policy: settings.file_error_policy,
        }
    }
}

/// Per-file accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub blob: String,
    /// Non-blank data rows seen.
    pub rows_read: u64,
    /// Rows counted into the statistics.
    pub rows_accounted: u64,
    /// Rows dropped because their content length did not parse.
    pub rows_skipped: u64,
    /// Rows whose metadata JSON did not parse.
    pub metadata_errors: u64,
    /// Set when the file failed and was left out of the aggregate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    fn new(blob: &str) -> Self {
        Self {
            blob: blob.to_string(),
            ..Self::default()
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub statistics: InventoryStatistics,
    /// One entry per analyzed file, in manifest order.
    pub files: Vec<FileOutcome>,
    /// Rows skipped across all files.
    pub rows_skipped: u64,
}

impl AnalysisReport {
    pub fn failed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.failed())
    }

    pub fn metadata_errors(&self) -> u64 {
        self.files.iter().map(|f| f.metadata_errors).sum()
    }
}

/// Partial result for one file.
struct FileRun {
    outcome: FileOutcome,
    result: Result<InventoryStatistics, AnalysisError>,
}

/// Turns a manifest plus tracked metadata fields into inventory statistics.
pub struct InventoryAnalyzer {
    source: Arc<dyn TabularFileSource>,
    options: AnalyzerOptions,
}

impl InventoryAnalyzer {
    pub fn new(source: Arc<dyn TabularFileSource>, options: AnalyzerOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Analyze and return only the statistics.
    pub fn analyze_statistics(
        &self,
        manifest: &Manifest,
        tracked: &[String],
        token: &CancellationToken,
    ) -> Result<InventoryStatistics, AnalysisError> {
        self.analyze(manifest, tracked, token).map(|r| r.statistics)
    }

    /// Analyze every file of `manifest`.
    #[instrument(skip_all, fields(container = %manifest.destination_container, files = manifest.files.len()))]
    pub fn analyze(
        &self,
        manifest: &Manifest,
        tracked: &[String],
        token: &CancellationToken,
    ) -> Result<AnalysisReport, AnalysisError> {
        if manifest.is_empty() {
            return Err(AnalysisError::NoData);
        }
        token.check()?;

        let tracked = dedup_tracked(tracked);
        let runs = if self.options.max_parallel_files <= 1 {
            self.run_sequential(manifest, &tracked, token)
        } else {
            self.run_parallel(manifest, &tracked, token)
        };

        self.fold(manifest, runs)
    }

    fn run_sequential(
        &self,
        manifest: &Manifest,
        tracked: &[String],
        token: &CancellationToken,
    ) -> Vec<FileRun> {
        let mut runs = Vec::with_capacity(manifest.files.len());
        for file in &manifest.files {
            let run = self.analyze_file(manifest, file, tracked, token);
            let stop = run.result.as_ref().err().is_some_and(|e| self.stops_run(e));
            runs.push(run);
            if stop {
                break;
            }
        }
        runs
    }

    /// Process files in chunks of `max_parallel_files` on scoped threads.
    /// Results keep manifest order.
    fn run_parallel(
        &self,
        manifest: &Manifest,
        tracked: &[String],
        token: &CancellationToken,
    ) -> Vec<FileRun> {
        let max_parallel = self.options.max_parallel_files;
        info!(
            files = manifest.files.len(),
            max_parallel, "analyzing inventory files in parallel"
        );

        let mut runs = Vec::with_capacity(manifest.files.len());
        for chunk in manifest.files.chunks(max_parallel) {
            let chunk_runs: Vec<FileRun> = thread::scope(|s| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|file| s.spawn(move || self.analyze_file(manifest, file, tracked, token)))
                    .collect();

                handles
                    .into_iter()
                    .zip(chunk)
                    .map(|(handle, file)| {
                        handle.join().unwrap_or_else(|_| {
                            error!(blob = %file.blob, "inventory file worker panicked");
                            FileRun {
                                outcome: FileOutcome::new(&file.blob),
                                result: Err(AnalysisError::Decode {
                                    blob: file.blob.clone(),
                                    message: "worker thread panicked".to_string(),
                                }),
                            }
                        })
                    })
                    .collect()
            });

            let stop = chunk_runs
                .iter()
                .any(|run| run.result.as_ref().err().is_some_and(|e| self.stops_run(e)));
            runs.extend(chunk_runs);
            if stop {
                break;
            }
        }
        runs
    }

    /// Whether an error ends the analysis under the configured policy.
    fn stops_run(&self, err: &AnalysisError) -> bool {
        err.scope() == ErrorScope::Run || self.options.file_error_policy == FileErrorPolicy::AbortRun
    }

    /// Merge per-file partials in manifest order and apply the failure policy.
    fn fold(&self, manifest: &Manifest, runs: Vec<FileRun>) -> Result<AnalysisReport, AnalysisError> {
        let mut statistics = InventoryStatistics::for_manifest(manifest);
        let mut files = Vec::with_capacity(runs.len());
        let mut first_failure: Option<String> = None;
        let mut failed = 0usize;

        for FileRun { mut outcome, result } in runs {
            let merged = result.and_then(|partial| {
                statistics
                    .merge(partial)
                    .map_err(|_| AnalysisError::CounterOverflow {
                        blob: outcome.blob.clone(),
                    })
            });
            match merged {
                Ok(()) => {}
                Err(e) if self.stops_run(&e) => return Err(e),
                Err(e) => {
                    warn!(blob = %outcome.blob, error = %e, "inventory file skipped");
                    failed += 1;
                    first_failure.get_or_insert_with(|| e.to_string());
                    outcome.error = Some(e.to_string());
                }
            }
            files.push(outcome);
        }

        if failed == files.len() {
            return Err(AnalysisError::AllFilesFailed {
                failed,
                first: first_failure.unwrap_or_default(),
            });
        }

        let rows_skipped = files.iter().map(|f| f.rows_skipped).sum();
        info!(
            objects = statistics.object_count,
            bytes = statistics.total_object_size,
            files = files.len(),
            failed_files = failed,
            rows_skipped,
            "inventory analysis complete"
        );
        Ok(AnalysisReport {
            statistics,
            files,
            rows_skipped,
        })
    }

    fn analyze_file(
        &self,
        manifest: &Manifest,
        file: &ManifestFile,
        tracked: &[String],
        token: &CancellationToken,
    ) -> FileRun {
        let mut outcome = FileOutcome::new(&file.blob);
        let result = self.account_file(manifest, file, tracked, token, &mut outcome);
        match &result {
            Ok(_) => debug!(
                blob = %file.blob,
                rows = outcome.rows_accounted,
                skipped = outcome.rows_skipped,
                metadata_errors = outcome.metadata_errors,
                "inventory file analyzed"
            ),
            Err(e) => debug!(blob = %file.blob, error = %e, "inventory file failed"),
        }
        FileRun { outcome, result }
    }

    fn account_file(
        &self,
        manifest: &Manifest,
        file: &ManifestFile,
        tracked: &[String],
        token: &CancellationToken,
        outcome: &mut FileOutcome,
    ) -> Result<InventoryStatistics, AnalysisError> {
        token.check()?;

        let stream = self
            .source
            .open_stream(&manifest.destination_container, &file.blob)
            .map_err(|source| AnalysisError::Source {
                blob: file.blob.clone(),
                source,
            })?;

        let mut rows = InventoryRows::open(stream, self.options.batch_size).map_err(|e| match e {
            OpenError::MissingColumn(column) => AnalysisError::ColumnNotFound {
                blob: file.blob.clone(),
                column: column.to_string(),
            },
            OpenError::Decode(message) => AnalysisError::Decode {
                blob: file.blob.clone(),
                message,
            },
        })?;

        let mut partial = InventoryStatistics::for_manifest(manifest);
        let mut row_number = 0u64;
        while let Some(batch) = rows.next_batch() {
            let batch = batch.map_err(|message| AnalysisError::Decode {
                blob: file.blob.clone(),
                message,
            })?;
            for idx in 0..batch.len() {
                row_number += 1;
                account_row(&mut partial, outcome, batch.row(idx), tracked, row_number)
                    .map_err(|_| AnalysisError::CounterOverflow {
                        blob: file.blob.clone(),
                    })?;
            }
            token.check()?;
        }
        Ok(partial)
    }
}

/// Account one data row into `partial`.
fn account_row(
    partial: &mut InventoryStatistics,
    outcome: &mut FileOutcome,
    row: RawRow<'_>,
    tracked: &[String],
    row_number: u64,
) -> Result<(), CounterOverflow> {
    if row.is_blank() {
        return Ok(());
    }
    outcome.rows_read += 1;

    let size = match row.content_length.trim().parse::<u64>() {
        Ok(size) => size,
        Err(_) => {
            warn!(
                blob = %outcome.blob,
                row = row_number,
                value = row.content_length,
                "unparseable content length; row skipped"
            );
            outcome.rows_skipped += 1;
            return Ok(());
        }
    };

    partial.record_object(size, AccessTier::parse(row.access_tier))?;
    outcome.rows_accounted += 1;

    let metadata = row.metadata.trim();
    if metadata.is_empty() || tracked.is_empty() {
        return Ok(());
    }
    // A JSON `null` cell carries no metadata.
    match serde_json::from_str::<Option<HashMap<String, String>>>(metadata) {
        Ok(None) => {}
        Ok(Some(values)) => {
            for name in tracked {
                if let Some(value) = values.get(name) {
                    partial.record_metadata(name, value);
                }
            }
        }
        Err(e) => {
            warn!(
                blob = %outcome.blob,
                row = row_number,
                error = %e,
                "malformed metadata; metadata skipped for row"
            );
            outcome.metadata_errors += 1;
        }
    }
    Ok(())
}

fn dedup_tracked(tracked: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tracked.len());
    for name in tracked {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}
