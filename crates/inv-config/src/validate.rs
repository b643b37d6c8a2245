//! Configuration validation errors and semantic validation.

use crate::settings::{MAX_PARALLEL_FILES, MAX_TIMEOUT_SECS};
use crate::InventoryConfig;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 11,
            ValidationError::VersionMismatch { .. } => 12,
        }
    }

    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a loaded configuration semantically.
pub fn validate_config(config: &InventoryConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    let analyzer = &config.analyzer;
    if analyzer.batch_size == 0 {
        return Err(ValidationError::invalid(
            "analyzer.batch_size",
            "must be greater than 0",
        ));
    }

    if !(1..=MAX_PARALLEL_FILES).contains(&analyzer.max_parallel_files) {
        return Err(ValidationError::invalid(
            "analyzer.max_parallel_files",
            format!(
                "must be in [1, {MAX_PARALLEL_FILES}], got {}",
                analyzer.max_parallel_files
            ),
        ));
    }

    if let Some(secs) = analyzer.timeout_secs {
        if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
            return Err(ValidationError::invalid(
                "analyzer.timeout_secs",
                format!("must be in [1, {MAX_TIMEOUT_SECS}] when set, got {secs}"),
            ));
        }
    }

    if let Some(dir) = &config.store.dir {
        if dir.as_os_str().is_empty() {
            return Err(ValidationError::invalid("store.dir", "must not be empty"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&InventoryConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = InventoryConfig::default();
        config.analyzer.batch_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidValue { ref field, .. } if field == "analyzer.batch_size"
        ));
        assert_eq!(err.code(), 11);
    }

    #[test]
    fn test_parallel_bounds() {
        let mut config = InventoryConfig::default();
        config.analyzer.max_parallel_files = 0;
        assert!(validate_config(&config).is_err());
        config.analyzer.max_parallel_files = MAX_PARALLEL_FILES + 1;
        assert!(validate_config(&config).is_err());
        config.analyzer.max_parallel_files = MAX_PARALLEL_FILES;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = InventoryConfig::default();
        config.analyzer.timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
        config.analyzer.timeout_secs = Some(30);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_timeout_upper_bound() {
        let mut config = InventoryConfig::default();
        config.analyzer.timeout_secs = Some(u64::MAX);
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidValue { ref field, .. } if field == "analyzer.timeout_secs"
        ));
        config.analyzer.timeout_secs = Some(MAX_TIMEOUT_SECS);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_version_mismatch() {
        let config = InventoryConfig {
            schema_version: "0.9.0".to_string(),
            ..InventoryConfig::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(
            err,
            ValidationError::VersionMismatch {
                expected: "1.0.0".to_string(),
                actual: "0.9.0".to_string(),
            }
        );
    }
}
