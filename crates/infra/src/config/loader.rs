//! Configuration loader
//!
//! Loads [`AuthConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If a required variable is missing, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! Whatever the source, the result is checked with [`AuthConfig::validate`]
//! before it is returned.
//!
//! ## Environment Variables
//! Required:
//! - `WEBGATE_CLIENT_ID`: OAuth client identifier
//! - `WEBGATE_REDIRECT_URI`: absolute callback URL
//! - `WEBGATE_BASE_URL`: base URL for the session endpoints
//! - `WEBGATE_AUTHORIZATION_ENDPOINT`: provider authorize URL
//! - `WEBGATE_TOKEN_ENDPOINT`: provider token URL
//!
//! Optional:
//! - `WEBGATE_SCOPES`: space-separated scopes
//! - `WEBGATE_SESSION_CHECK_INTERVAL_MS`: session validation throttle
//! - `WEBGATE_TIMEOUT_MS`: silent authorization timeout
//! - `WEBGATE_REQUEST_TIMEOUT_MS`: per-request timeout of the HTTP clients
//! - `WEBGATE_APP_PATH`: path the callback page returns to
//! - `WEBGATE_SESSION_VALIDATE_ENDPOINT` / `WEBGATE_SESSION_LOGOUT_ENDPOINT`
//! - `WEBGATE_BRAND`: label forwarded to the host status reporter
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./webgate.{json,toml}` or `./config.{json,toml}` (current working
//!    directory)
//! 2. `../config.{json,toml}` and `../../config.{json,toml}`
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::time::Duration;

use webgate_common::auth::AuthConfig;

use crate::errors::{InfraError, InfraResult};

const CONFIG_FILE_NAMES: [&str; 4] = ["webgate.json", "webgate.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after reading any
/// `.env` file). If a required variable is missing, falls back to loading
/// from a config file.
///
/// # Errors
/// Returns `InfraError` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> InfraResult<AuthConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(InfraError::Config(message)) => {
            tracing::debug!(error = %message, "Failed to load from environment, trying file");
            load_from_file(None)
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from environment variables
///
/// All required environment variables must be present. Optional ones fall
/// back to the [`AuthConfig::new`] defaults.
///
/// # Errors
/// Returns `InfraError::Config` if required variables are missing or have
/// invalid values, and `InfraError::Auth` if the result fails validation.
pub fn load_from_env() -> InfraResult<AuthConfig> {
    let mut config = AuthConfig::new(
        env_var("WEBGATE_CLIENT_ID")?,
        env_var("WEBGATE_REDIRECT_URI")?,
        env_var("WEBGATE_BASE_URL")?,
        env_var("WEBGATE_AUTHORIZATION_ENDPOINT")?,
        env_var("WEBGATE_TOKEN_ENDPOINT")?,
    );

    if let Some(scopes) = env_opt("WEBGATE_SCOPES") {
        config = config.with_scopes(scopes.split_whitespace());
    }
    if let Some(interval) = env_millis("WEBGATE_SESSION_CHECK_INTERVAL_MS")? {
        config = config.with_session_check_interval(interval);
    }
    if let Some(timeout) = env_millis("WEBGATE_TIMEOUT_MS")? {
        config = config.with_timeout(timeout);
    }
    if let Some(timeout) = env_millis("WEBGATE_REQUEST_TIMEOUT_MS")? {
        config = config.with_request_timeout(timeout);
    }
    if let Some(app_path) = env_opt("WEBGATE_APP_PATH") {
        config.app_path = app_path;
    }
    config.session_validate_endpoint = env_opt("WEBGATE_SESSION_VALIDATE_ENDPOINT");
    config.session_logout_endpoint = env_opt("WEBGATE_SESSION_LOGOUT_ENDPOINT");
    config.brand = env_opt("WEBGATE_BRAND");

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `InfraError` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The parsed configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> InfraResult<AuthConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(InfraError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            InfraError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|source| InfraError::Io { path: config_path.clone(), source })?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`). Fields other
/// than the five required ones may be omitted.
fn parse_config(contents: &str, path: &Path) -> InfraResult<AuthConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| InfraError::Parse { format: "TOML", message: e.to_string() }),
        "json" => serde_json::from_str(contents)
            .map_err(|e| InfraError::Parse { format: "JSON", message: e.to_string() }),
        _ => Err(InfraError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).collect();
    for parent in ["..", "../.."] {
        paths.push(dir.join(parent).join("config.json"));
        paths.push(dir.join(parent).join("config.toml"));
    }
    paths
}

/// Get required environment variable
///
/// # Errors
/// Returns `InfraError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> InfraResult<String> {
    env_opt(key)
        .ok_or_else(|| InfraError::config(format!("Missing required environment variable: {key}")))
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn env_millis(key: &str) -> InfraResult<Option<Duration>> {
    env_opt(key)
        .map(|s| {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| InfraError::config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
