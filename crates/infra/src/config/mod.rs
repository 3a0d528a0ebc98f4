//! Configuration loading
//!
//! This module loads [`webgate_common::auth::AuthConfig`] from environment
//! variables, `.env` files and JSON/TOML config files.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
