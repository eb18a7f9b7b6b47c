//! Error types for sw-script

use thiserror::Error;

/// Script rendering and emission errors
#[derive(Error, Debug)]
pub enum ScriptError {
    /// Template render error (J001)
    #[error("[J001] Script render error: {0}")]
    RenderError(String),

    /// Artifact could not be written (J002)
    #[error("[J002] Failed to write artifact '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Blocking write task failed (J003)
    #[error("[J003] Internal artifact error: {0}")]
    Internal(String),
}

/// Result type alias for ScriptError
pub type ScriptResult<T> = Result<T, ScriptError>;

impl From<minijinja::Error> for ScriptError {
    fn from(err: minijinja::Error) -> Self {
        ScriptError::RenderError(err.to_string())
    }
}
