//! Error types for VidPack.
//!
//! Library crates use [`VidPackError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all VidPack operations.
#[derive(Debug, thiserror::Error)]
pub enum VidPackError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Invalid caller input (empty URL, empty text, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTTP client construction or other network setup failure.
    #[error("network error: {0}")]
    Network(String),

    /// Every relay path failed for the requested document.
    #[error("could not fetch {url}: all {attempts} relay paths failed")]
    FetchUnreachable { url: String, attempts: usize },

    /// The document parsed but did not yield enough readable text.
    #[error("could not extract enough content: {message}")]
    ExtractionInsufficient { message: String },

    /// The generation backend answered with a non-success status.
    #[error("LLM error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The completion stream broke before the backend closed it.
    #[error("stream interrupted: {message}")]
    StreamInterrupted { message: String, partial: String },

    /// The caller cancelled the run.
    #[error("run cancelled")]
    Cancelled { partial: String },

    /// A pipeline run is already in flight.
    #[error("a generation run is already in progress")]
    Busy,

    /// Voice-synthesis backend error.
    #[error("{0}")]
    Speech(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VidPackError>;

impl VidPackError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::ExtractionInsufficient {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Text accumulated before the failure, for stream-stage errors.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::StreamInterrupted { partial, .. } | Self::Cancelled { partial } => {
                Some(partial.as_str())
            }
            _ => None,
        }
    }
}
