//! # Webgate Infrastructure
//!
//! Process-level wiring around the `webgate-common` auth core.
//!
//! This crate contains:
//! - Configuration loading (environment, `.env`, TOML/JSON files)
//! - Tracing subscriber setup
//! - The [`AuthContext`] composition root that turns an [`AuthConfig`] and a
//!   set of browser host objects into ready-to-run controllers
//!
//! ## Architecture
//! - Depends on `webgate-common` only
//! - Contains all "impure" setup code (environment, filesystem, global
//!   subscriber)
//!
//! [`AuthConfig`]: webgate_common::auth::AuthConfig

pub mod config;
pub mod context;
pub mod errors;
pub mod observability;

// Re-export commonly used items
pub use config::{load, load_from_env, load_from_file, probe_config_paths};
pub use context::{AuthContext, BrowserHost};
pub use errors::{InfraError, InfraResult};
pub use observability::{init_tracing, LogFormat};
