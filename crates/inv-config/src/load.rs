//! Configuration loading.
//!
//! Values are layered, highest priority first:
//! 1. Explicit overrides in [`ConfigOptions`] (CLI flags)
//! 2. Environment variables (`INV_METADATA_FIELDS`, `INV_STORAGE_ROOT`, `INV_STORE_DIR`)
//! 3. The resolved config file
//! 4. Built-in defaults

use crate::resolve::{
    resolve_config_path, ConfigSource, ENV_METADATA_FIELDS, ENV_STORAGE_ROOT, ENV_STORE_DIR,
};
use crate::validate::{validate_config, ValidationError};
use crate::{parse_metadata_fields, FileErrorPolicy, InventoryConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::NotFound { .. } => 10,
            ConfigError::ParseError { .. } => 10,
            ConfigError::ValidationError(e) => e.code(),
            ConfigError::IoError { .. } => 60,
        }
    }
}

/// Configuration resolution options and explicit overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Explicit config file path (highest priority).
    pub config_path: Option<PathBuf>,
    /// Delimiter-separated tracked metadata fields.
    pub metadata_fields: Option<String>,
    pub storage_root: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
    pub max_parallel_files: Option<usize>,
    pub batch_size: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub file_error_policy: Option<FileErrorPolicy>,
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: InventoryConfig,
    /// Path of the config file used (None if using defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Load, override and validate the configuration.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let (path, source) = resolve_config_path(options.config_path.as_deref());

    let mut config = match &path {
        Some(path) => load_config_file(path)?,
        None => InventoryConfig::default(),
    };

    apply_env_overrides(&mut config);
    apply_option_overrides(&mut config, options);
    validate_config(&config)?;

    Ok(ResolvedConfig {
        config,
        path,
        source,
    })
}

/// Read and parse one config file without applying overrides.
pub fn load_config_file(path: &Path) -> Result<InventoryConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    InventoryConfig::from_json(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn apply_env_overrides(config: &mut InventoryConfig) {
    if let Ok(raw) = std::env::var(ENV_METADATA_FIELDS) {
        config.metadata_fields = parse_metadata_fields(&raw);
    }
    if let Some(root) = non_empty_env(ENV_STORAGE_ROOT) {
        config.storage_root = Some(PathBuf::from(root));
    }
    if let Some(dir) = non_empty_env(ENV_STORE_DIR) {
        config.store.dir = Some(PathBuf::from(dir));
    }
}

fn apply_option_overrides(config: &mut InventoryConfig, options: &ConfigOptions) {
    if let Some(raw) = &options.metadata_fields {
        config.metadata_fields = parse_metadata_fields(raw);
    }
    if let Some(root) = &options.storage_root {
        config.storage_root = Some(root.clone());
    }
    if let Some(dir) = &options.store_dir {
        config.store.dir = Some(dir.clone());
    }
    if let Some(parallel) = options.max_parallel_files {
        config.analyzer.max_parallel_files = parallel;
    }
    if let Some(batch) = options.batch_size {
        config.analyzer.batch_size = batch;
    }
    if let Some(timeout) = options.timeout_secs {
        config.analyzer.timeout_secs = Some(timeout);
    }
    if let Some(policy) = options.file_error_policy {
        config.analyzer.file_error_policy = policy;
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
