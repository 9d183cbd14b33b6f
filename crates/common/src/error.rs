//! Error types shared across Pitchcast crates.

use std::path::PathBuf;

/// Errors from loading and saving Pitchcast configuration.
#[derive(Debug, thiserror::Error)]
pub enum PitchcastError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using PitchcastError.
pub type PitchcastResult<T> = Result<T, PitchcastError>;

impl PitchcastError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
