//! Testing utilities and helpers
//!
//! - **[`mocks`]**: In-memory browser host and provider fakes
//! - **[`async_utils`]**: Waiting on effects of spawned tasks
//! - **[`time`]**: Controllable clock for throttle tests
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use webgate_common::auth::{InteractiveRedirectController, PkceStore};
//! use webgate_common::testing::{test_config, RecordingNavigator};
//!
//! let navigator = Arc::new(RecordingNavigator::new());
//! let controller =
//!     InteractiveRedirectController::new(&test_config(), PkceStore::in_memory(), navigator)
//!         .expect("valid config");
//! # drop(controller);
//! ```

pub mod async_utils;
pub mod mocks;
pub mod time;

// Re-export commonly used items
pub use async_utils::wait_until;
pub use mocks::{
    test_config, BusParentWindow, ManualActivityTarget, MockSessionApi, MockTokenExchanger,
    NavigationKind, RecordingFrameHost, RecordingNavigator, RecordingParentWindow,
    RecordingStatusReporter,
};
pub use time::MockClock;
