//! Error types for sw-core

use thiserror::Error;

/// Core error type for scanwatch
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config {path}: {message}")]
    ConfigParseError { path: String, message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: IO error with file path context
    #[error("[E004] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E005: YAML serialization error
    #[error("[E005] YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// E006: JSON serialization error
    #[error("[E006] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
