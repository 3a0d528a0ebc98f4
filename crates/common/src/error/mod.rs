//! Error classification shared by every webgate error type
//!
//! Module-specific errors (for example [`crate::auth::AuthError`]) are plain
//! `thiserror` enums. They implement [`ErrorClassification`] so callers can
//! make uniform retry and alerting decisions without matching on variants.
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Silent auth needs interaction |
//! | **Warning** | Degraded but operational | Session expired, transient network failure |
//! | **Error** | Failure requiring attention | Token exchange rejected, bad configuration |
//! | **Critical** | Security invariant at risk | State mismatch, missing PKCE material |
//!
//! ## Examples
//!
//! ```rust,ignore
//! use webgate_common::error::ErrorClassification;
//!
//! fn should_page_oncall<E: ErrorClassification>(err: &E) -> bool {
//!     err.is_critical()
//! }
//! ```

use std::fmt;
use std::time::Duration;

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again, such as connection resets or timeouts. Errors that consume
    /// single-use material (authorization codes, PKCE entries) are never
    /// retryable.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    ///
    /// Used for monitoring, alerting, and logging decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
