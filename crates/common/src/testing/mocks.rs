//! In-memory fakes for the browser host and the provider endpoints
//!
//! Every fake records what the controllers asked of it so tests can assert on
//! frames mounted, navigations issued, messages posted and calls made.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::auth::messaging::{MessageBus, WindowMessage};
use crate::auth::{
    AccessToken, ActivityEvent, ActivityHandler, ActivityTarget, AuthConfig, AuthError,
    AuthResult, FrameHost, FrameId, ListenerId, Navigator, ParentWindow, SessionApi,
    StatusReporter, TokenExchanger,
};

/// Configuration matching the reference scenario: provider at `https://idp`,
/// application at `https://app`, client `abc`
#[must_use]
pub fn test_config() -> AuthConfig {
    AuthConfig::new(
        "abc",
        "https://app/callback",
        "https://app",
        "https://idp/authorize",
        "https://idp/token",
    )
}

/// Frame host that records mounts and removals
#[derive(Debug, Default)]
pub struct RecordingFrameHost {
    next_id: AtomicU64,
    mounted: Mutex<HashMap<FrameId, Url>>,
    history: Mutex<Vec<Url>>,
    fail: AtomicBool,
}

impl RecordingFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later mount fail
    pub fn fail_mounts(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Frames currently attached
    pub fn mounted_count(&self) -> usize {
        self.mounted.lock().len()
    }

    /// Every URL ever mounted, in order
    pub fn mounted_urls(&self) -> Vec<Url> {
        self.history.lock().clone()
    }

    pub fn last_mounted_url(&self) -> Option<Url> {
        self.history.lock().last().cloned()
    }
}

impl FrameHost for RecordingFrameHost {
    fn mount_hidden_frame(&self, url: &Url) -> AuthResult<FrameId> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthError::Host("frame creation blocked".into()));
        }
        let id = FrameId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.mounted.lock().insert(id, url.clone());
        self.history.lock().push(url.clone());
        Ok(id)
    }

    fn remove_frame(&self, id: FrameId) {
        self.mounted.lock().remove(&id);
    }
}

/// Kind of navigation recorded by [`RecordingNavigator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Assign,
    Replace,
    ReplaceHistory,
}

/// Navigator that records instead of navigating
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    navigations: Mutex<Vec<(NavigationKind, Url)>>,
    reloads: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later navigation fail
    pub fn fail_navigations(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn navigations(&self) -> Vec<(NavigationKind, Url)> {
        self.navigations.lock().clone()
    }

    /// URLs passed to `assign`
    pub fn assigned_urls(&self) -> Vec<Url> {
        self.navigations
            .lock()
            .iter()
            .filter(|(kind, _)| *kind == NavigationKind::Assign)
            .map(|(_, url)| url.clone())
            .collect()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    fn record(&self, kind: NavigationKind, url: &Url) -> AuthResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthError::Host("navigation blocked".into()));
        }
        self.navigations.lock().push((kind, url.clone()));
        Ok(())
    }
}

impl Navigator for RecordingNavigator {
    fn assign(&self, url: &Url) -> AuthResult<()> {
        self.record(NavigationKind::Assign, url)
    }

    fn replace(&self, url: &Url) -> AuthResult<()> {
        self.record(NavigationKind::Replace, url)
    }

    fn replace_history(&self, url: &Url) -> AuthResult<()> {
        self.record(NavigationKind::ReplaceHistory, url)
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

/// Parent window that records posted messages and their target origins
#[derive(Debug, Default)]
pub struct RecordingParentWindow {
    messages: Mutex<Vec<(serde_json::Value, String)>>,
}

impl RecordingParentWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(serde_json::Value, String)> {
        self.messages.lock().clone()
    }
}

impl ParentWindow for RecordingParentWindow {
    fn post_message(&self, data: serde_json::Value, target_origin: &str) -> AuthResult<()> {
        self.messages.lock().push((data, target_origin.to_string()));
        Ok(())
    }
}

/// Parent window wired to a [`MessageBus`], as a real browser would connect a
/// framed callback page to the application window
///
/// Messages are dropped unless `target_origin` equals the parent's origin,
/// and arrive stamped with the frame's own origin.
#[derive(Debug, Clone)]
pub struct BusParentWindow {
    bus: MessageBus,
    frame_origin: String,
    parent_origin: String,
}

impl BusParentWindow {
    pub fn new(
        bus: MessageBus,
        frame_origin: impl Into<String>,
        parent_origin: impl Into<String>,
    ) -> Self {
        Self { bus, frame_origin: frame_origin.into(), parent_origin: parent_origin.into() }
    }
}

impl ParentWindow for BusParentWindow {
    fn post_message(&self, data: serde_json::Value, target_origin: &str) -> AuthResult<()> {
        if target_origin == self.parent_origin {
            self.bus.deliver(WindowMessage::new(self.frame_origin.clone(), data));
        }
        Ok(())
    }
}

/// Activity source driven by the test
#[derive(Default)]
pub struct ManualActivityTarget {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, (Vec<ActivityEvent>, ActivityHandler)>>,
}

impl ManualActivityTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch `event` to every listener registered for it
    pub fn fire(&self, event: ActivityEvent) {
        let handlers: Vec<ActivityHandler> = self
            .listeners
            .lock()
            .values()
            .filter(|(events, _)| events.contains(&event))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl ActivityTarget for ManualActivityTarget {
    fn add_listener(&self, events: &[ActivityEvent], handler: ActivityHandler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().insert(id, (events.to_vec(), handler));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().remove(&id);
    }
}

/// Token exchanger returning a fixed token and recording `(code, verifier)`
#[derive(Debug)]
pub struct MockTokenExchanger {
    token: String,
    fail_status: Mutex<Option<u16>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockTokenExchanger {
    pub fn returning(token: impl Into<String>) -> Self {
        Self { token: token.into(), fail_status: Mutex::new(None), calls: Mutex::new(Vec::new()) }
    }

    /// Make later exchanges fail with this HTTP status
    pub fn fail_with_status(&self, status: u16) {
        *self.fail_status.lock() = Some(status);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TokenExchanger for MockTokenExchanger {
    async fn exchange_code_for_token(&self, code: &str, verifier: &str) -> AuthResult<AccessToken> {
        self.calls.lock().push((code.to_string(), verifier.to_string()));
        let fail_status = *self.fail_status.lock();
        match fail_status {
            Some(status) => Err(AuthError::TokenExchange {
                status,
                status_text: "Mock Failure".to_string(),
            }),
            None => Ok(AccessToken::new(self.token.clone())),
        }
    }
}

/// Session endpoints with scripted answers and call counters
#[derive(Debug)]
pub struct MockSessionApi {
    valid: AtomicBool,
    validate_error: AtomicBool,
    logout_error: bool,
    delay: Duration,
    validate_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl MockSessionApi {
    fn with_answer(valid: bool, validate_error: bool) -> Self {
        Self {
            valid: AtomicBool::new(valid),
            validate_error: AtomicBool::new(validate_error),
            logout_error: false,
            delay: Duration::ZERO,
            validate_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    /// Reports `{valid: true}`
    pub fn valid() -> Self {
        Self::with_answer(true, false)
    }

    /// Reports `{valid: false}`
    pub fn invalid() -> Self {
        Self::with_answer(false, false)
    }

    /// Fails every validation as a transport error would
    pub fn failing() -> Self {
        Self::with_answer(true, true)
    }

    /// Logout calls fail
    #[must_use]
    pub fn with_failing_logout(mut self) -> Self {
        self.logout_error = true;
        self
    }

    /// Each validation sleeps this long before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Change the answer for later validations
    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionApi for MockSessionApi {
    async fn validate(&self) -> AuthResult<bool> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.validate_error.load(Ordering::SeqCst) {
            return Err(AuthError::SessionValidation("connection reset".into()));
        }
        Ok(self.valid.load(Ordering::SeqCst))
    }

    async fn logout(&self) -> AuthResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_error {
            return Err(AuthError::SessionValidation("logout unavailable".into()));
        }
        Ok(())
    }
}

/// Status reporter that records the label of each displayed failure
#[derive(Debug, Default)]
pub struct RecordingStatusReporter {
    failures: Mutex<Vec<String>>,
}

impl RecordingStatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

impl StatusReporter for RecordingStatusReporter {
    fn show_auth_failure(&self, error: &AuthError) {
        self.failures.lock().push(error.label().to_string());
    }
}
