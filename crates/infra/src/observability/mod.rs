//! Logging setup
//!
//! The auth core only emits `tracing` events; this module installs the
//! process-wide subscriber that renders them.
//!
//! ## Environment
//! - `RUST_LOG`: standard `EnvFilter` directives (default `info`)
//! - `WEBGATE_LOG_JSON`: emit one JSON object per event when truthy
//!
//! ```rust,no_run
//! use webgate_infra::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::from_env()).ok();
//! tracing::info!("ready");
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::loader::env_bool;
use crate::errors::{InfraError, InfraResult};

const DEFAULT_FILTER: &str = "info";

/// Output format of the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl LogFormat {
    /// Pick the format from `WEBGATE_LOG_JSON`
    #[must_use]
    pub fn from_env() -> Self {
        if env_bool("WEBGATE_LOG_JSON", false) {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Install the global `tracing` subscriber
///
/// An unparseable `RUST_LOG` falls back to `info` instead of failing.
///
/// # Errors
/// Returns `InfraError::Tracing` if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> InfraResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| InfraError::Tracing(e.to_string()))?;

    tracing::debug!(?format, "Tracing subscriber installed");
    Ok(())
}
