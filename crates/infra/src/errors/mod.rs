//! Infrastructure errors
//!
//! Setup failures (missing variables, unreadable files, bad formats) are kept
//! apart from [`AuthError`], which is still reachable through
//! [`InfraError::Auth`] when wiring rejects a configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use webgate_common::auth::AuthError;
use webgate_common::error::{ErrorClassification, ErrorSeverity};

/// Result alias for infrastructure operations
pub type InfraResult<T> = Result<T, InfraError>;

/// Errors raised while loading configuration or wiring the auth core
#[derive(Debug, Error)]
pub enum InfraError {
    /// A configuration source is missing or holds an invalid value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid for its format
    #[error("Invalid {format} format: {message}")]
    Parse { format: &'static str, message: String },

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth core rejected the configuration or host objects
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The global tracing subscriber could not be installed
    #[error("Tracing setup failed: {0}")]
    Tracing(String),
}

impl InfraError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl ErrorClassification for InfraError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Auth(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Auth(err) => err.severity(),
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Auth(err) if err.is_critical())
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
