//! Traits for browser host operations
//!
//! The auth core never touches a DOM directly. A host (wasm shim, webview
//! bridge, or the fakes in [`crate::testing`]) implements these seams so each
//! controller can be constructed with explicit collaborators.

use std::sync::Arc;

use url::Url;

use super::error::{AuthError, AuthResult};

/// Handle to a mounted hidden frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// Mounts and removes invisible frames
pub trait FrameHost: Send + Sync {
    /// Create an invisible frame navigated to `url`
    ///
    /// # Errors
    /// Returns `AuthError::Host` if the frame cannot be created.
    fn mount_hidden_frame(&self, url: &Url) -> AuthResult<FrameId>;

    /// Detach a frame; unknown ids are ignored
    fn remove_frame(&self, id: FrameId);
}

/// Removes its frame when dropped
pub(crate) struct FrameGuard {
    host: Arc<dyn FrameHost>,
    id: FrameId,
}

impl FrameGuard {
    pub(crate) fn mount(host: Arc<dyn FrameHost>, url: &Url) -> AuthResult<Self> {
        let id = host.mount_hidden_frame(url)?;
        Ok(Self { host, id })
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.host.remove_frame(self.id);
    }
}

/// Top-level window navigation
pub trait Navigator: Send + Sync {
    /// Navigate away, pushing a history entry
    ///
    /// # Errors
    /// Returns `AuthError::Host` if navigation is refused.
    fn assign(&self, url: &Url) -> AuthResult<()>;

    /// Navigate away, replacing the current history entry
    ///
    /// # Errors
    /// Returns `AuthError::Host` if navigation is refused.
    fn replace(&self, url: &Url) -> AuthResult<()>;

    /// Rewrite the current history entry without navigating
    ///
    /// # Errors
    /// Returns `AuthError::Host` if the history API is unavailable.
    fn replace_history(&self, url: &Url) -> AuthResult<()>;

    /// Full page reload
    fn reload(&self);
}

/// The embedding window, reachable only from a framed context
pub trait ParentWindow: Send + Sync {
    /// Post `data` to the parent, delivered only if its origin is
    /// `target_origin`
    ///
    /// # Errors
    /// Returns `AuthError::Host` if the message cannot be posted.
    fn post_message(&self, data: serde_json::Value, target_origin: &str) -> AuthResult<()>;
}

/// User activity that may trigger a session check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityEvent {
    PointerDown,
    KeyDown,
    Scroll,
    Focus,
    Blur,
    TouchStart,
    VisibilityChange,
}

impl ActivityEvent {
    /// Every kind the session monitor listens to
    pub const ALL: [Self; 7] = [
        Self::PointerDown,
        Self::KeyDown,
        Self::Scroll,
        Self::Focus,
        Self::Blur,
        Self::TouchStart,
        Self::VisibilityChange,
    ];

    /// DOM event name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PointerDown => "pointerdown",
            Self::KeyDown => "keydown",
            Self::Scroll => "scroll",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::TouchStart => "touchstart",
            Self::VisibilityChange => "visibilitychange",
        }
    }
}

/// Callback invoked for each activity event
pub type ActivityHandler = Arc<dyn Fn(ActivityEvent) + Send + Sync>;

/// Registration handle returned by [`ActivityTarget::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Source of user-activity events
pub trait ActivityTarget: Send + Sync {
    /// Register `handler` for every kind in `events`
    fn add_listener(&self, events: &[ActivityEvent], handler: ActivityHandler) -> ListenerId;

    /// Remove a registration; unknown ids are ignored
    fn remove_listener(&self, id: ListenerId);
}

/// Inline failure indicator shown when auth cannot complete
pub trait StatusReporter: Send + Sync {
    fn show_auth_failure(&self, error: &AuthError);
}

/// Reporter that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusReporter;

impl StatusReporter for NoopStatusReporter {
    fn show_auth_failure(&self, error: &AuthError) {
        tracing::debug!(error = %error, "Auth failure not displayed (no reporter)");
    }
}
