//! Manifest management service.
//!
//! Orchestrates one manifest run: read manifest → analyze → persist. Every
//! outcome, including panics in a collaborator, is reported as a
//! [`ManifestProcessingResult`]; nothing escapes as an error or unwind.
//! There are no retries.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use inv_common::{Manifest, ManifestProcessingResult};
use inv_store::StatisticsStore;

use crate::analyzer::{AnalysisError, InventoryAnalyzer};
use crate::cancel::CancellationToken;
use crate::log_event;
use crate::logging::{event_names, generate_run_id, LogContext, Stage};
use crate::source::ManifestReader;

pub struct ManifestManagementService {
    reader: Arc<dyn ManifestReader>,
    analyzer: InventoryAnalyzer,
    store: Arc<dyn StatisticsStore>,
    metadata_fields: Vec<String>,
    timeout: Option<Duration>,
}

impl ManifestManagementService {
    pub fn new(
        reader: Arc<dyn ManifestReader>,
        analyzer: InventoryAnalyzer,
        store: Arc<dyn StatisticsStore>,
        metadata_fields: Vec<String>,
    ) -> Self {
        Self {
            reader,
            analyzer,
            store,
            metadata_fields,
            timeout: None,
        }
    }

    /// Bound each run started by [`process_manifest`](Self::process_manifest).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn metadata_fields(&self) -> &[String] {
        &self.metadata_fields
    }

    /// Process the manifest at `locator` with the configured timeout, if any.
    pub fn process_manifest(&self, locator: &str) -> ManifestProcessingResult {
        let token = match self.timeout {
            Some(timeout) => CancellationToken::with_timeout(timeout),
            None => CancellationToken::new(),
        };
        self.process_manifest_with_cancel(locator, &token)
    }

    /// Process the manifest at `locator`, stopping early once `token` fires.
    pub fn process_manifest_with_cancel(
        &self,
        locator: &str,
        token: &CancellationToken,
    ) -> ManifestProcessingResult {
        if locator.trim().is_empty() {
            return ManifestProcessingResult::failure("ManifestBlobUrl is null or empty");
        }

        let ctx = LogContext::new(generate_run_id()).with_manifest(locator);
        log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "processing manifest");

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(locator, token, &ctx)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                log_event!(
                    ctx,
                    ERROR,
                    event_names::INTERNAL_ERROR,
                    Stage::Init,
                    "manifest processing panicked",
                    panic = %message
                );
                ManifestProcessingResult::failure(format!("Error processing manifest: {message}"))
            });

        log_event!(
            ctx,
            INFO,
            event_names::RUN_FINISHED,
            Stage::Init,
            "manifest run finished",
            success = result.is_success()
        );
        result
    }

    fn run(
        &self,
        locator: &str,
        token: &CancellationToken,
        ctx: &LogContext,
    ) -> ManifestProcessingResult {
        let Some(manifest) = self.read(locator, ctx) else {
            return ManifestProcessingResult::failure(format!(
                "Inventory manifest not found at {locator}"
            ));
        };

        log_event!(
            ctx,
            INFO,
            event_names::ANALYZE_STARTED,
            Stage::Analyze,
            "analyzing inventory",
            files = manifest.files.len()
        );
        let report = match self.analyzer.analyze(&manifest, &self.metadata_fields, token) {
            Ok(report) => report,
            Err(AnalysisError::NoData) => {
                log_event!(ctx, WARN, event_names::MANIFEST_EMPTY, Stage::Manifest, "manifest lists no files");
                return ManifestProcessingResult::failure(format!(
                    "Inventory manifest {locator} contains no files to analyze"
                ));
            }
            Err(e) => {
                log_event!(
                    ctx,
                    ERROR,
                    event_names::ANALYZE_FAILED,
                    Stage::Analyze,
                    "inventory analysis failed",
                    error = %e,
                    scope = %e.scope()
                );
                return ManifestProcessingResult::failure(format!(
                    "Failed to analyze inventory {locator}: {e}"
                ));
            }
        };

        let failed_files = report.failed_files().count();
        log_event!(
            ctx,
            INFO,
            event_names::ANALYZE_FINISHED,
            Stage::Analyze,
            "inventory analyzed",
            objects = report.statistics.object_count,
            bytes = report.statistics.total_object_size,
            rows_skipped = report.rows_skipped,
            failed_files = failed_files
        );

        let statistics = report.statistics;
        if !self.store.save(&statistics) {
            log_event!(ctx, ERROR, event_names::PERSIST_REJECTED, Stage::Persist, "statistics not saved");
            return ManifestProcessingResult::failure(format!(
                "Failed to save statistics for {locator}"
            ));
        }
        log_event!(ctx, INFO, event_names::PERSIST_SAVED, Stage::Persist, "statistics saved");

        ManifestProcessingResult::success(statistics)
    }

    fn read(&self, locator: &str, ctx: &LogContext) -> Option<Manifest> {
        match self.reader.read_manifest(locator) {
            Ok(Some(manifest)) => {
                log_event!(
                    ctx,
                    DEBUG,
                    event_names::MANIFEST_LOADED,
                    Stage::Manifest,
                    "manifest loaded",
                    container = %manifest.destination_container
                );
                Some(manifest)
            }
            Ok(None) => {
                log_event!(ctx, WARN, event_names::MANIFEST_MISSING, Stage::Manifest, "manifest not found");
                None
            }
            Err(e) => {
                log_event!(
                    ctx,
                    WARN,
                    event_names::MANIFEST_MISSING,
                    Stage::Manifest,
                    "manifest could not be read",
                    error = %e
                );
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerOptions;
    use crate::source::{SourceError, TabularFileSource};
    use chrono::{TimeZone, Utc};
    use inv_common::ManifestFile;
    use inv_store::MemoryStatisticsStore;
    use std::io::{Cursor, Read};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BODY: &str =
        "Content-Length,AccessTier,Metadata\n100,Hot,{}\n200,Cool,\"{\"\"documentType\"\":\"\"invoice\"\"}\"\n";

    enum Reply {
        Found(Vec<&'static str>),
        Missing,
        Broken,
        Panic,
    }

    struct StubReader {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl StubReader {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ManifestReader for StubReader {
        fn read_manifest(&self, locator: &str) -> Result<Option<Manifest>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Found(blobs) => Ok(Some(Manifest {
                    destination_container: "dest".into(),
                    endpoint: None,
                    files: blobs.iter().map(|b| ManifestFile::new(*b, 0)).collect(),
                    inventory_start_time: Utc.with_ymd_and_hms(2024, 5, 26, 13, 25, 36).unwrap(),
                    inventory_completion_time: Utc
                        .with_ymd_and_hms(2024, 5, 26, 13, 35, 56)
                        .unwrap(),
                    rule_definition: None,
                    rule_name: None,
                    status: None,
                    summary: None,
                    version: None,
                })),
                Reply::Missing => Ok(None),
                Reply::Broken => Err(SourceError::InvalidLocator {
                    locator: locator.into(),
                    message: "no blob path".into(),
                }),
                Reply::Panic => panic!("reader exploded"),
            }
        }
    }

    struct CountingSource {
        opens: AtomicUsize,
    }

    impl TabularFileSource for CountingSource {
        fn open_stream(
            &self,
            container: &str,
            path: &str,
        ) -> Result<Box<dyn Read + Send>, SourceError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if path == "bad.csv" {
                return Ok(Box::new(Cursor::new(b"Content-Length,Metadata\n1,{}\n".to_vec())));
            }
            if path == "missing.csv" {
                return Err(SourceError::NotFound {
                    container: container.into(),
                    path: path.into(),
                });
            }
            Ok(Box::new(Cursor::new(BODY.as_bytes().to_vec())))
        }
    }

    struct Fixture {
        reader: Arc<StubReader>,
        source: Arc<CountingSource>,
        store: Arc<MemoryStatisticsStore>,
        service: ManifestManagementService,
    }

    fn fixture(reply: Reply) -> Fixture {
        let reader = StubReader::new(reply);
        let source = Arc::new(CountingSource {
            opens: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStatisticsStore::new());
        let service = ManifestManagementService::new(
            reader.clone(),
            InventoryAnalyzer::new(source.clone(), AnalyzerOptions::default()),
            store.clone(),
            vec!["documentType".to_string()],
        );
        Fixture {
            reader,
            source,
            store,
            service,
        }
    }

    #[test]
    fn test_success_persists_and_returns_statistics() {
        let f = fixture(Reply::Found(vec!["a.csv"]));
        let result = f.service.process_manifest("inv/run/manifest.json");
        let stats = result.statistics().expect("success");
        assert_eq!(stats.object_count, 2);
        assert_eq!(stats.total_object_size, 300);
        assert_eq!(stats.metadata_list["documentType"].counters["invoice"], 1);
        assert_eq!(f.store.records(), vec![stats.clone()]);
    }

    #[test]
    fn test_blank_locator_does_no_io() {
        let f = fixture(Reply::Found(vec!["a.csv"]));
        for locator in ["", "   "] {
            let result = f.service.process_manifest(locator);
            assert_eq!(result.error_message(), Some("ManifestBlobUrl is null or empty"));
        }
        assert_eq!(f.reader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.source.opens.load(Ordering::SeqCst), 0);
        assert_eq!(f.store.save_attempts(), 0);
    }

    #[test]
    fn test_missing_manifest_skips_analysis() {
        for reply in [Reply::Missing, Reply::Broken] {
            let f = fixture(reply);
            let result = f.service.process_manifest("inv/run/manifest.json");
            assert_eq!(
                result.error_message(),
                Some("Inventory manifest not found at inv/run/manifest.json")
            );
            assert_eq!(f.source.opens.load(Ordering::SeqCst), 0);
            assert_eq!(f.store.save_attempts(), 0);
        }
    }

    #[test]
    fn test_empty_manifest_is_failure() {
        let f = fixture(Reply::Found(vec![]));
        let result = f.service.process_manifest("inv/m.json");
        assert_eq!(
            result.error_message(),
            Some("Inventory manifest inv/m.json contains no files to analyze")
        );
        assert_eq!(f.store.save_attempts(), 0);
    }

    #[test]
    fn test_analysis_error_is_failure() {
        let f = fixture(Reply::Found(vec!["bad.csv"]));
        let result = f.service.process_manifest("inv/m.json");
        let message = result.error_message().unwrap();
        assert!(message.starts_with("Failed to analyze inventory inv/m.json: "));
        assert!(message.contains("AccessTier"));
        assert_eq!(f.store.save_attempts(), 0);
    }

    #[test]
    fn test_store_rejection_is_failure() {
        let f = fixture(Reply::Found(vec!["a.csv"]));
        f.store.set_reject(true);
        let result = f.service.process_manifest("inv/m.json");
        assert_eq!(
            result.error_message(),
            Some("Failed to save statistics for inv/m.json")
        );
        assert_eq!(f.store.save_attempts(), 1);
        assert!(f.store.records().is_empty());
    }

    #[test]
    fn test_panic_becomes_failure() {
        let f = fixture(Reply::Panic);
        let result = f.service.process_manifest("inv/m.json");
        assert_eq!(
            result.error_message(),
            Some("Error processing manifest: reader exploded")
        );
    }

    #[test]
    fn test_cancelled_run_is_analysis_failure() {
        let f = fixture(Reply::Found(vec!["a.csv"]));
        let token = CancellationToken::new();
        token.cancel();
        let result = f.service.process_manifest_with_cancel("inv/m.json", &token);
        assert!(result.error_message().unwrap().contains("cancelled"));
        assert_eq!(f.source.opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_timeout_applies_to_process_manifest() {
        let f = fixture(Reply::Found(vec!["a.csv"]));
        let service = f.service.with_timeout(Some(Duration::ZERO));
        let result = service.process_manifest("inv/m.json");
        assert!(result.error_message().unwrap().contains("deadline"));
    }

    #[test]
    fn test_huge_timeout_runs_without_deadline() {
        let f = fixture(Reply::Found(vec!["a.csv"]));
        let service = f.service.with_timeout(Some(Duration::from_secs(u64::MAX)));
        let result = panic::catch_unwind(AssertUnwindSafe(|| service.process_manifest("inv/m.json")))
            .expect("process_manifest must not unwind");
        assert!(result.is_success(), "{:?}", result.error_message());
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
