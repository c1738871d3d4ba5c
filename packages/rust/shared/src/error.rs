//! Error types for abstractkb.
//!
//! Library crates use [`AbstractKbError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all abstractkb operations.
#[derive(Debug, thiserror::Error)]
pub enum AbstractKbError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP failure while fetching the listing page or a document.
    #[error("fetch failed for {url}: {reason}")]
    Network { url: String, reason: String },

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A persisted artifact a later stage depends on was never written.
    #[error("missing artifact '{key}' at {path:?}")]
    MissingArtifact { key: String, path: PathBuf },

    /// Data validation error (bad URL, zero-sized limits, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON (de)serialization of a persisted snapshot failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AbstractKbError>;

impl AbstractKbError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a network error for `url`.
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// Artifact `key` was expected at `path` but does not exist.
    pub fn missing_artifact(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingArtifact {
            key: key.into(),
            path: path.into(),
        }
    }

    /// Whether this error only affects a single document and the run may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::MissingArtifact { .. })
    }
}
