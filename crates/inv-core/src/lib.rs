//! Storage inventory core library.
//!
//! - [`analyzer`]: streams tabular inventory files and aggregates statistics
//! - [`service`]: read manifest → analyze → persist, reported as a result value
//! - [`source`]: manifest and tabular file access, with filesystem adapters
//! - [`cancel`]: cooperative cancellation and deadlines
//! - [`logging`]: tracing setup and the run event vocabulary
//! - [`exit_codes`]: CLI exit code contract

pub mod analyzer;
pub mod cancel;
pub mod exit_codes;
pub mod logging;
pub mod service;
pub mod source;

pub use analyzer::{
    AnalysisError, AnalysisReport, AnalyzerOptions, FileOutcome, InventoryAnalyzer,
};
pub use cancel::{CancellationToken, Interrupted};
pub use service::ManifestManagementService;
pub use source::{FsManifestReader, FsTabularSource, ManifestReader, SourceError, TabularFileSource};

use std::sync::Arc;
use std::time::Duration;

use inv_config::InventoryConfig;
use inv_store::{ParquetStatisticsStore, StatisticsStore};

/// Wire a service over the filesystem adapters and the Parquet store described
/// by `config`. Storage paths resolve against `storage_root`.
pub fn filesystem_service(
    config: &InventoryConfig,
    storage_root: &std::path::Path,
) -> ManifestManagementService {
    let store: Arc<dyn StatisticsStore> =
        Arc::new(ParquetStatisticsStore::open(config.store.effective_dir()));
    let analyzer = InventoryAnalyzer::new(
        Arc::new(FsTabularSource::new(storage_root)),
        AnalyzerOptions::from(&config.analyzer),
    );
    ManifestManagementService::new(
        Arc::new(FsManifestReader::new(storage_root)),
        analyzer,
        store,
        config.metadata_fields.clone(),
    )
    .with_timeout(config.analyzer.timeout_secs.map(Duration::from_secs))
}
