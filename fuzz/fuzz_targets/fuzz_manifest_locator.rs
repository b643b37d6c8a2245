//! Fuzz target for manifest locator parsing.

#![no_main]

use inv_common::ManifestLocator;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(locator) = ManifestLocator::parse(data) {
        assert!(!locator.container().is_empty());
        assert!(!locator.blob_path().is_empty());

        // URL segments are percent-decoded and may carry any character.
        if !data.contains("://") {
            assert!(!locator.container().contains('/'));
            assert!(!locator.blob_path().contains(['?', '#']));
            assert!(!locator.blob_path().starts_with('/'));
        }
    }
});
