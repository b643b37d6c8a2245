//! Fuzz target for config.json parsing and validation.

#![no_main]

use inv_config::{validate_config, InventoryConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = InventoryConfig::from_json(text) {
        let _ = validate_config(&config);
    }
});
