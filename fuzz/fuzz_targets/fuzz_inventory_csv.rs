//! Fuzz target for inventory file decoding and row accounting.
//!
//! Arbitrary bytes are served as a single inventory file. Analysis may fail
//! with a file-level error but must never panic, and accounted objects can
//! never exceed the non-blank lines of the input.

#![no_main]

use std::io::{Cursor, Read};
use std::sync::Arc;

use arbitrary::Arbitrary;
use inv_common::{Manifest, ManifestFile};
use inv_core::{
    AnalyzerOptions, CancellationToken, InventoryAnalyzer, SourceError, TabularFileSource,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    batch_size: u8,
    tracked: Vec<String>,
    body: Vec<u8>,
}

struct BytesSource(Vec<u8>);

impl TabularFileSource for BytesSource {
    fn open_stream(&self, _: &str, _: &str) -> Result<Box<dyn Read + Send>, SourceError> {
        Ok(Box::new(Cursor::new(self.0.clone())))
    }
}

fuzz_target!(|input: Input| {
    // `\r` also ends a record
    let lines = input.body.split(|b| *b == b'\n' || *b == b'\r').count() as u64;
    let manifest: Manifest = match serde_json::from_value(serde_json::json!({
        "destinationContainer": "fuzz",
        "files": [ManifestFile::new("fuzz.csv", input.body.len() as u64)],
        "inventoryStartTime": "2024-01-01T00:00:00Z",
        "inventoryCompletionTime": "2024-01-01T00:00:00Z"
    })) {
        Ok(manifest) => manifest,
        Err(_) => return,
    };

    let analyzer = InventoryAnalyzer::new(
        Arc::new(BytesSource(input.body)),
        AnalyzerOptions {
            batch_size: usize::from(input.batch_size).max(1),
            ..AnalyzerOptions::default()
        },
    );
    if let Ok(stats) = analyzer.analyze_statistics(&manifest, &input.tracked, &CancellationToken::new()) {
        assert!(stats.object_count <= lines);
        assert!(stats.tiered_object_count() <= stats.object_count);
    }
});
