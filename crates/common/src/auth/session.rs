//! Background session-liveness monitor
//!
//! User activity funnels into one throttled check: the provider is asked at
//! most once per `session_check_interval`, and never twice concurrently. An
//! invalid session triggers a best-effort logout followed by a full reload,
//! which re-enters the bootstrap and re-authenticates.
//!
//! The monitor fails closed: a network error during validation, or a
//! validation that outlives `request_timeout`, is treated exactly like an
//! expired session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use url::Url;

use super::error::{AuthError, AuthResult};
use super::traits::{ActivityEvent, ActivityHandler, ActivityTarget, ListenerId, Navigator};
use super::types::AuthConfig;
use crate::time::{Clock, SystemClock};

/// Provider session endpoints
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Ask whether the provider session is still live
    ///
    /// # Errors
    /// Returns `AuthError::SessionValidation` or `AuthError::Http` when the
    /// provider cannot answer.
    async fn validate(&self) -> AuthResult<bool>;

    /// End the provider session
    ///
    /// # Errors
    /// Returns `AuthError::Http` on transport failure.
    async fn logout(&self) -> AuthResult<()>;
}

/// [`SessionApi`] over HTTP with credentials (cookies) included
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    http: Client,
    validate_url: Url,
    logout_url: Url,
}

impl HttpSessionApi {
    /// Create a client with its own cookie store whose requests are bounded
    /// by [`AuthConfig::request_timeout`]
    ///
    /// # Errors
    /// Returns `AuthError::Config` for invalid configuration and
    /// `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        config.validate()?;
        let http =
            Client::builder().cookie_store(true).timeout(config.request_timeout).build()?;
        Self::with_http_client(config, http)
    }

    /// Create a client sharing an existing `reqwest::Client`
    ///
    /// The client should carry the cookie store holding the provider session.
    ///
    /// # Errors
    /// Returns `AuthError::Config` for invalid configuration.
    pub fn with_http_client(config: &AuthConfig, http: Client) -> AuthResult<Self> {
        config.validate()?;
        Ok(Self {
            http,
            validate_url: config.session_validate_url()?,
            logout_url: config.session_logout_url()?,
        })
    }
}

/// JavaScript-style truthiness of the `valid` field
fn is_truthy(value: Option<&serde_json::Value>) -> bool {
    use serde_json::Value;
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn validate(&self) -> AuthResult<bool> {
        let response = self.http.post(self.validate_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::SessionValidation(format!(
                "validate endpoint returned {}",
                status.as_u16()
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::SessionValidation(format!("unreadable validate body: {e}")))?;
        Ok(is_truthy(body.get("valid")))
    }

    async fn logout(&self) -> AuthResult<()> {
        let response = self.http.post(self.logout_url.clone()).send().await?;
        debug!(status = response.status().as_u16(), "Session logout sent");
        Ok(())
    }
}

/// Result of one activity-triggered check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Less than the interval has passed since the last check
    Throttled,
    /// A validation call is already outstanding
    InFlight,
    /// The provider confirmed the session
    Valid,
    /// The session was invalid (or could not be validated); logout and
    /// reload were issued
    Invalidated,
}

#[derive(Default)]
struct MonitorState {
    last_checked_at: Option<Instant>,
    listener: Option<ListenerId>,
}

/// Resets the in-flight flag when the validation call finishes or is
/// cancelled
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Activity-triggered, throttled session validator
///
/// Owned by the composition root and shared as `Arc<SessionMonitor>`;
/// `attach` and `detach` are idempotent.
pub struct SessionMonitor {
    api: Arc<dyn SessionApi>,
    navigator: Arc<dyn Navigator>,
    activity: Arc<dyn ActivityTarget>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    request_timeout: Duration,
    state: Mutex<MonitorState>,
    in_flight: AtomicBool,
}

impl SessionMonitor {
    /// Create a detached monitor using the system clock
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid.
    pub fn new(
        config: &AuthConfig,
        api: Arc<dyn SessionApi>,
        navigator: Arc<dyn Navigator>,
        activity: Arc<dyn ActivityTarget>,
    ) -> AuthResult<Arc<Self>> {
        Self::with_clock(config, api, navigator, activity, Arc::new(SystemClock))
    }

    /// Create a detached monitor with an explicit clock
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid.
    pub fn with_clock(
        config: &AuthConfig,
        api: Arc<dyn SessionApi>,
        navigator: Arc<dyn Navigator>,
        activity: Arc<dyn ActivityTarget>,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self {
            api,
            navigator,
            activity,
            clock,
            interval: config.session_check_interval,
            request_timeout: config.request_timeout,
            state: Mutex::new(MonitorState::default()),
            in_flight: AtomicBool::new(false),
        }))
    }

    /// Register the activity listener
    ///
    /// Checks triggered by activity run on the tokio runtime current at
    /// attach time. Calling `attach` while attached is a no-op.
    ///
    /// # Errors
    /// Returns `AuthError::Host` when called outside a tokio runtime.
    pub fn attach(self: &Arc<Self>) -> AuthResult<()> {
        let runtime = Handle::try_current()
            .map_err(|e| AuthError::Host(format!("session monitor needs a tokio runtime: {e}")))?;

        let mut state = self.state.lock();
        if state.listener.is_some() {
            return Ok(());
        }

        let monitor: Weak<Self> = Arc::downgrade(self);
        let handler: ActivityHandler = Arc::new(move |event: ActivityEvent| {
            let Some(monitor) = monitor.upgrade() else { return };
            runtime.spawn(async move {
                let outcome = monitor.check().await;
                debug!(event = event.as_str(), ?outcome, "Activity session check");
            });
        });

        state.listener = Some(self.activity.add_listener(&ActivityEvent::ALL, handler));
        info!(interval_ms = self.interval_ms(), "Session monitor attached");
        Ok(())
    }

    /// Remove the activity listener and forget the last check time
    ///
    /// A later `attach` starts with a fresh throttle window. Calling it while
    /// detached is a no-op.
    pub fn detach(&self) {
        let listener = {
            let mut state = self.state.lock();
            state.last_checked_at = None;
            state.listener.take()
        };
        if let Some(id) = listener {
            self.activity.remove_listener(id);
            info!("Session monitor detached");
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.lock().listener.is_some()
    }

    /// Run one throttled check
    ///
    /// This is what every activity event does; it is public so hosts can
    /// also trigger a check on their own schedule.
    pub async fn check(&self) -> CheckOutcome {
        {
            let mut state = self.state.lock();
            if let Some(last) = state.last_checked_at {
                if self.clock.since(last) < self.interval {
                    return CheckOutcome::Throttled;
                }
            }
            if self.in_flight.swap(true, Ordering::AcqRel) {
                return CheckOutcome::InFlight;
            }
            state.last_checked_at = Some(self.clock.now());
        }

        let valid = {
            let _in_flight = InFlight(&self.in_flight);
            // Fail closed: neither a transport failure nor a hung call is
            // distinguished from an expired session.
            match tokio::time::timeout(self.request_timeout, self.api.validate()).await {
                Ok(Ok(valid)) => valid,
                Ok(Err(e)) => {
                    warn!(error = %e, "Session validation failed; treating session as invalid");
                    false
                }
                Err(_) => {
                    warn!(
                        timeout_ms = self.request_timeout_ms(),
                        "Session validation timed out; treating session as invalid"
                    );
                    false
                }
            }
        };

        if valid {
            debug!("Session still valid");
            return CheckOutcome::Valid;
        }
        info!("Session invalid; logging out");
        self.force_logout().await;
        CheckOutcome::Invalidated
    }

    /// Best-effort logout, detach, then full reload
    pub async fn force_logout(&self) {
        match tokio::time::timeout(self.request_timeout, self.api.logout()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Session logout failed"),
            Err(_) => warn!(timeout_ms = self.request_timeout_ms(), "Session logout timed out"),
        }
        self.detach();
        self.navigator.reload();
    }

    fn interval_ms(&self) -> u64 {
        u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
    }

    fn request_timeout_ms(&self) -> u64 {
        u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
