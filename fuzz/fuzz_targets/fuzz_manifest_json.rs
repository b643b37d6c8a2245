//! Fuzz target for manifest JSON parsing.

#![no_main]

use inv_common::Manifest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parse errors are expected; panics are not
    if let Ok(manifest) = Manifest::from_slice(data) {
        let _ = manifest.total_file_bytes();
        let json = manifest.to_json().expect("parsed manifest serializes");
        let again = Manifest::from_json(&json).expect("serialized manifest parses");
        assert_eq!(manifest, again);
    }
});
