//! Storage inventory configuration loading and validation.
//!
//! This crate provides:
//! - Parsing of the tracked metadata field list (`a|b;c,d`)
//! - Typed settings for the analyzer and the statistics store
//! - Config resolution (CLI → env → config dir → XDG → defaults)
//! - Semantic validation

pub mod fields;
pub mod load;
pub mod resolve;
pub mod settings;
pub mod validate;

pub use fields::parse_metadata_fields;
pub use load::{load_config, ConfigError, ConfigOptions, ResolvedConfig};
pub use resolve::{resolve_config_path, ConfigSource};
pub use settings::{
    AnalyzerSettings, FileErrorPolicy, InventoryConfig, StoreSettings, MAX_PARALLEL_FILES,
    MAX_TIMEOUT_SECS,
};
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
