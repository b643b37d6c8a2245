//! No-mock analyzer tests over real inventory fixtures and generated files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use inv_common::{AccessTier, Manifest, ManifestFile};
use inv_core::{
    AnalysisError, AnalyzerOptions, CancellationToken, FsManifestReader, FsTabularSource,
    InventoryAnalyzer, ManifestReader,
};
use inv_config::FileErrorPolicy;
use proptest::prelude::*;
use tempfile::TempDir;

const MANIFEST: &str = "inventory/2024/05/26/13-25-36/Rule_1/Rule_1-manifest.json";

fn storage_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("test")
        .join("fixtures")
        .join("inventory")
        .join("storage")
}

fn tracked() -> Vec<String> {
    vec!["documentType".to_string(), "department".to_string()]
}

fn fixture_manifest() -> Manifest {
    FsManifestReader::new(storage_dir())
        .read_manifest(MANIFEST)
        .unwrap()
        .expect("fixture manifest")
}

fn analyzer(root: &Path, options: AnalyzerOptions) -> InventoryAnalyzer {
    InventoryAnalyzer::new(Arc::new(FsTabularSource::new(root)), options)
}

#[test]
fn test_fixture_totals() {
    let report = analyzer(&storage_dir(), AnalyzerOptions::default())
        .analyze(&fixture_manifest(), &tracked(), &CancellationToken::new())
        .unwrap();
    let stats = &report.statistics;

    assert_eq!(stats.object_count, 7);
    assert_eq!(stats.total_object_size, 5600);
    assert_eq!(stats.tier_count(AccessTier::Hot), 2);
    assert_eq!(stats.tier_size(AccessTier::Hot), 1700);
    assert_eq!(stats.tier_count(AccessTier::Cool), 2);
    assert_eq!(stats.tier_size(AccessTier::Cool), 2200);
    assert_eq!(stats.tier_count(AccessTier::Cold), 1);
    assert_eq!(stats.tier_size(AccessTier::Cold), 1000);
    assert_eq!(stats.tier_count(AccessTier::Archive), 1);
    assert_eq!(stats.tier_size(AccessTier::Archive), 300);
    assert_eq!(stats.untiered_object_count(), 1);

    let doc = &stats.metadata_list["documentType"].counters;
    assert_eq!(doc["invoice"], 2);
    assert_eq!(doc["receipt"], 1);
    assert_eq!(doc["contract"], 1);
    let dept = &stats.metadata_list["department"].counters;
    assert_eq!(dept["finance"], 1);
    assert_eq!(dept["legal"], 1);

    assert_eq!(report.metadata_errors(), 1);
    assert_eq!(report.rows_skipped, 0);
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].rows_accounted, 4);
    assert_eq!(report.files[1].rows_accounted, 3);
}

#[test]
fn test_fixture_matches_manifest_summary() {
    let manifest = fixture_manifest();
    let summary = manifest.summary.unwrap();
    let stats = analyzer(&storage_dir(), AnalyzerOptions::default())
        .analyze_statistics(&manifest, &[], &CancellationToken::new())
        .unwrap();
    assert_eq!(stats.object_count, summary.object_count);
    assert_eq!(stats.total_object_size, summary.total_object_size);
    assert!(stats.metadata_list.is_empty());
}

#[test]
fn test_fixture_parallel_equals_sequential() {
    let manifest = fixture_manifest();
    let sequential = analyzer(&storage_dir(), AnalyzerOptions::default())
        .analyze(&manifest, &tracked(), &CancellationToken::new())
        .unwrap();
    let parallel = analyzer(
        &storage_dir(),
        AnalyzerOptions {
            max_parallel_files: 4,
            batch_size: 1,
            ..AnalyzerOptions::default()
        },
    )
    .analyze(&manifest, &tracked(), &CancellationToken::new())
    .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_empty_manifest_fixture_is_no_data() {
    let manifest = FsManifestReader::new(storage_dir())
        .read_manifest("inventory/empty-manifest.json")
        .unwrap()
        .unwrap();
    let err = analyzer(&storage_dir(), AnalyzerOptions::default())
        .analyze(&manifest, &tracked(), &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, AnalysisError::NoData));
}

// ============================================================================
// Generated inventories
// ============================================================================

#[derive(Debug)]
struct Row {
    size: u64,
    tier: &'static str,
    doc: Option<&'static str>,
}

const TIERS: [&str; 6] = ["Hot", "cool", "COLD", "Archive", "Premium", ""];
const DOCS: [&str; 3] = ["invoice", "receipt", "memo"];

fn row_strategy() -> impl Strategy<Value = Row> {
    (0u64..1_000_000, 0usize..TIERS.len(), prop::option::of(0usize..DOCS.len())).prop_map(
        |(size, tier, doc)| Row {
            size,
            tier: TIERS[tier],
            doc: doc.map(|d| DOCS[d]),
        },
    )
}

fn metadata_cell(row: &Row) -> String {
    match row.doc {
        Some(doc) => format!("\"{{\"\"documentType\"\":\"\"{doc}\"\"}}\""),
        None => String::new(),
    }
}

/// Write `rows` with columns in the given order.
fn write_file(dir: &Path, name: &str, rows: &[Row], reordered: bool) {
    let mut body = if reordered {
        String::from("Metadata,Name,AccessTier,Content-Length\n")
    } else {
        String::from("Name,Content-Length,AccessTier,Metadata\n")
    };
    for (i, row) in rows.iter().enumerate() {
        let meta = metadata_cell(row);
        if reordered {
            body.push_str(&format!("{meta},obj-{i},{},{}\n", row.tier, row.size));
        } else {
            body.push_str(&format!("obj-{i},{},{},{meta}\n", row.size, row.tier));
        }
    }
    std::fs::create_dir_all(dir.join("dest")).unwrap();
    std::fs::write(dir.join("dest").join(name), body).unwrap();
}

fn manifest(blobs: &[&str]) -> Manifest {
    let json = serde_json::json!({
        "destinationContainer": "dest",
        "files": blobs.iter().map(|b| ManifestFile::new(*b, 0)).collect::<Vec<_>>(),
        "inventoryStartTime": "2024-01-01T00:00:00Z",
        "inventoryCompletionTime": "2024-01-01T01:00:00Z"
    });
    serde_json::from_value(json).unwrap()
}

fn doc_tracked() -> Vec<String> {
    vec!["documentType".to_string()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_counts_match_rows(rows in prop::collection::vec(row_strategy(), 1..40)) {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", &rows, false);
        let stats = analyzer(dir.path(), AnalyzerOptions::default())
            .analyze_statistics(&manifest(&["a.csv"]), &doc_tracked(), &CancellationToken::new())
            .unwrap();

        prop_assert_eq!(stats.object_count, rows.len() as u64);
        prop_assert_eq!(stats.total_object_size, rows.iter().map(|r| r.size).sum::<u64>());
        prop_assert!(stats.tiered_object_count() <= stats.object_count);
        let all_recognized = rows.iter().all(|r| AccessTier::parse(r.tier).is_some());
        prop_assert_eq!(stats.tiered_object_count() == stats.object_count, all_recognized);

        let with_doc = rows.iter().filter(|r| r.doc.is_some()).count() as u64;
        let counted = stats.metadata_list.get("documentType").map(|m| m.total()).unwrap_or(0);
        prop_assert_eq!(counted, with_doc);
    }

    #[test]
    fn prop_header_order_is_irrelevant(rows in prop::collection::vec(row_strategy(), 1..30)) {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "plain.csv", &rows, false);
        write_file(dir.path(), "shuffled.csv", &rows, true);
        let a = analyzer(dir.path(), AnalyzerOptions::default());
        let plain = a
            .analyze_statistics(&manifest(&["plain.csv"]), &doc_tracked(), &CancellationToken::new())
            .unwrap();
        let shuffled = a
            .analyze_statistics(&manifest(&["shuffled.csv"]), &doc_tracked(), &CancellationToken::new())
            .unwrap();
        prop_assert_eq!(plain, shuffled);
    }

    #[test]
    fn prop_two_files_merge(
        first in prop::collection::vec(row_strategy(), 1..20),
        second in prop::collection::vec(row_strategy(), 1..20),
    ) {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", &first, false);
        write_file(dir.path(), "b.csv", &second, true);
        let a = analyzer(dir.path(), AnalyzerOptions::default());
        let token = CancellationToken::new();

        let both = a.analyze_statistics(&manifest(&["a.csv", "b.csv"]), &doc_tracked(), &token).unwrap();
        let mut merged = a.analyze_statistics(&manifest(&["a.csv"]), &doc_tracked(), &token).unwrap();
        merged
            .merge(a.analyze_statistics(&manifest(&["b.csv"]), &doc_tracked(), &token).unwrap())
            .unwrap();
        prop_assert_eq!(both, merged);
    }
}

#[test]
fn test_untracked_fields_are_ignored() {
    let dir = TempDir::new().unwrap();
    let rows = [
        Row { size: 1, tier: "Hot", doc: Some("invoice") },
        Row { size: 2, tier: "Hot", doc: Some("memo") },
    ];
    write_file(dir.path(), "a.csv", &rows, false);
    let stats = analyzer(dir.path(), AnalyzerOptions::default())
        .analyze_statistics(
            &manifest(&["a.csv"]),
            &["department".to_string()],
            &CancellationToken::new(),
        )
        .unwrap();
    assert!(!stats.metadata_list.contains_key("documentType"));
    assert_eq!(stats.object_count, 2);
}

#[test]
fn test_skip_policy_with_missing_blob() {
    let dir = TempDir::new().unwrap();
    let rows = [Row { size: 10, tier: "Cool", doc: None }];
    write_file(dir.path(), "a.csv", &rows, false);
    let options = AnalyzerOptions {
        file_error_policy: FileErrorPolicy::SkipFile,
        max_parallel_files: 2,
        ..AnalyzerOptions::default()
    };
    let report = analyzer(dir.path(), options)
        .analyze(&manifest(&["gone.csv", "a.csv"]), &[], &CancellationToken::new())
        .unwrap();
    assert_eq!(report.statistics.object_count, 1);
    assert_eq!(report.files.len(), 2);
    assert!(report.files[0].error.as_deref().unwrap().contains("gone.csv"));
}

#[test]
fn test_abort_policy_with_missing_blob() {
    let dir = TempDir::new().unwrap();
    let rows = [Row { size: 10, tier: "Cool", doc: None }];
    write_file(dir.path(), "a.csv", &rows, false);
    let err = analyzer(dir.path(), AnalyzerOptions::default())
        .analyze(&manifest(&["a.csv", "gone.csv"]), &[], &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Source { ref blob, .. } if blob == "gone.csv"));
}

#[test]
fn test_large_file_streams_in_batches() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<Row> = (0..5_000)
        .map(|i| Row {
            size: i,
            tier: TIERS[(i % 4) as usize],
            doc: Some(DOCS[(i % 3) as usize]),
        })
        .collect();
    write_file(dir.path(), "big.csv", &rows, false);
    let stats = analyzer(
        dir.path(),
        AnalyzerOptions {
            batch_size: 64,
            ..AnalyzerOptions::default()
        },
    )
    .analyze_statistics(&manifest(&["big.csv"]), &doc_tracked(), &CancellationToken::new())
    .unwrap();
    assert_eq!(stats.object_count, 5_000);
    assert_eq!(stats.total_object_size, (0..5_000u64).sum::<u64>());
    assert_eq!(stats.tier_count(AccessTier::Hot), 1_250);
    assert_eq!(stats.metadata_list["documentType"].total(), 5_000);
}
