//! Error taxonomy for the auth core
//!
//! Every failure the controllers can surface maps onto one [`AuthError`]
//! variant. Messages never include verifiers, codes or tokens.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Why a callback was rejected as a possible CSRF attempt or stale state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfReason {
    /// No PKCE entry exists for the returned `state` (tampering, expiry, or
    /// the entry was already consumed).
    PkceDataNotFound,
    /// The callback did not match the pending attempt (state mismatch or a
    /// malformed payload).
    InvalidCallback,
}

impl fmt::Display for CsrfReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PkceDataNotFound => write!(f, "PKCE data not found"),
            Self::InvalidCallback => write!(f, "invalid callback"),
        }
    }
}

/// Error type for auth core operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// Required configuration is missing or unparseable
    #[error("Configuration error in field '{field}': {message}")]
    Config { field: String, message: String },

    /// The provider needs user interaction; silent auth cannot proceed
    #[error("interaction_required")]
    InteractionRequired,

    /// State mismatch or missing PKCE entry
    #[error("Authentication rejected: {reason}")]
    CsrfOrExpiry { reason: CsrfReason },

    /// The provider returned an OAuth error other than `interaction_required`
    #[error("OAuth error: {}", oauth_message(.error, .description.as_deref()))]
    OAuth { error: String, description: Option<String> },

    /// Token endpoint answered with a non-success status
    #[error("Token exchange failed: {status} {status_text}")]
    TokenExchange { status: u16, status_text: String },

    /// Session validation failed or reported an invalid session
    #[error("Session validation failed: {0}")]
    SessionValidation(String),

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The browser host could not perform a frame, navigation or messaging
    /// operation
    #[error("Browser host error: {0}")]
    Host(String),

    /// A stored PKCE entry could not be written or decoded
    #[error("PKCE storage error: {0}")]
    Storage(String),
}

fn oauth_message(error: &str, description: Option<&str>) -> String {
    match description {
        Some(desc) => format!("{error}: {desc}"),
        None => error.to_string(),
    }
}

/// Result alias for auth core operations
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Create a configuration error for a specific field
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { field: field.into(), message: message.into() }
    }

    /// Create a CSRF/expiry error
    #[must_use]
    pub const fn csrf(reason: CsrfReason) -> Self {
        Self::CsrfOrExpiry { reason }
    }

    /// True when the failure can be recovered by an interactive redirect
    #[must_use]
    pub const fn is_interaction_required(&self) -> bool {
        matches!(self, Self::InteractionRequired)
    }

    /// Stable label for structured logging
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::InteractionRequired => "interaction_required",
            Self::CsrfOrExpiry { .. } => "csrf_or_expiry",
            Self::OAuth { .. } => "oauth",
            Self::TokenExchange { .. } => "token_exchange",
            Self::SessionValidation(_) => "session_validation",
            Self::Http(_) => "http",
            Self::Host(_) => "host",
            Self::Storage(_) => "storage",
        }
    }
}

impl ErrorClassification for AuthError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InteractionRequired => ErrorSeverity::Info,
            Self::SessionValidation(_) => ErrorSeverity::Warning,
            Self::Http(_) => ErrorSeverity::Warning,
            Self::Config { .. }
            | Self::OAuth { .. }
            | Self::TokenExchange { .. }
            | Self::Host(_)
            | Self::Storage(_) => ErrorSeverity::Error,
            Self::CsrfOrExpiry { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::CsrfOrExpiry { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
