//! Error types for remote render calls and artifact downloads.

use std::path::PathBuf;

/// Failure of a submit or status call against a remote provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("No API key configured for {provider}")]
    MissingApiKey { provider: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request timed out")]
    TimedOut,
}

impl ProviderError {
    /// Whether another attempt at the same call could succeed.
    ///
    /// Transport failures, timeouts, HTTP 429 and HTTP 5xx are retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::TimedOut => true,
            ProviderError::Status { code, .. } => *code == 429 || *code >= 500,
            ProviderError::MissingApiKey { .. } | ProviderError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::TimedOut
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::Status {
                code: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Failure to materialize a finished job's content locally.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Download failed: {0}")]
    Transport(String),

    #[error("Download returned HTTP {code}")]
    Status { code: u16 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FetchError::Status {
                code: status.as_u16(),
            },
            None => FetchError::Transport(e.to_string()),
        }
    }
}
