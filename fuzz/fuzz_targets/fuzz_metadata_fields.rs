//! Fuzz target for tracked metadata field list parsing.

#![no_main]

use inv_config::fields::{parse_metadata_fields, FIELD_SEPARATORS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let fields = parse_metadata_fields(data);
    for (i, field) in fields.iter().enumerate() {
        assert!(!field.is_empty());
        assert_eq!(field.trim(), field);
        assert!(!field.contains(FIELD_SEPARATORS));
        assert!(!fields[..i].contains(field));
    }
});
