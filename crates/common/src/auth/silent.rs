//! Silent (hidden-frame) authorization
//!
//! One attempt moves `IDLE -> PENDING -> {RESOLVED, REJECTED}`:
//!
//! ```text
//!  generate + store PKCE ──► listen ──► mount frame (prompt=none)
//!                                          │
//!              ┌────────── timer ──────────┼────────── listener ──────────┐
//!              │  sleep(timeout)           │  origin check, shape check   │
//!              └──────► AttemptResolver::settle (first wins) ◄────────────┘
//!                                          │
//!                               cancel token fires
//!                                          │
//!                frame + listener dropped, outcome interpreted
//! ```
//!
//! The timer and the listener share one [`AttemptResolver`] and one
//! [`CancellationToken`]; whichever settles first cancels the other, so
//! exactly one resolution path runs.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::TokenExchanger;
use super::error::{AuthError, AuthResult, CsrfReason};
use super::messaging::{MessageBus, WindowMessage};
use super::pkce::{state_prefix, validate_state, PkceMaterial};
use super::request::{AuthRequestBuilder, PROMPT_NONE};
use super::store::PkceStore;
use super::traits::{FrameGuard, FrameHost};
use super::types::{
    AccessToken, AuthConfig, CallbackMessage, PkceEntry, CALLBACK_MESSAGE_TYPE, INTERACTION_REQUIRED,
};

/// One-shot completion slot: the first `settle` wins, later calls are
/// ignored
#[derive(Debug)]
pub struct AttemptResolver<T> {
    slot: Mutex<Option<T>>,
}

impl<T> AttemptResolver<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: parking_lot::const_mutex(None) }
    }

    /// Record `value` if nothing has settled yet
    ///
    /// Returns `true` for the call that settled the attempt.
    pub fn settle(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// The settled value, if any
    pub fn into_inner(self) -> Option<T> {
        self.slot.into_inner()
    }
}

impl<T> Default for AttemptResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a pending attempt ended
#[derive(Debug)]
enum Settlement {
    TimedOut,
    Callback(CallbackMessage),
    /// Carried the callback discriminator but not the callback shape
    Malformed,
}

/// Orchestrates hidden-frame authorization attempts
pub struct SilentAuthController {
    builder: AuthRequestBuilder,
    store: PkceStore,
    exchanger: Arc<dyn TokenExchanger>,
    frames: Arc<dyn FrameHost>,
    bus: MessageBus,
    expected_origin: String,
    timeout: Duration,
}

impl SilentAuthController {
    /// Create a controller
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid.
    pub fn new(
        config: &AuthConfig,
        store: PkceStore,
        exchanger: Arc<dyn TokenExchanger>,
        frames: Arc<dyn FrameHost>,
        bus: MessageBus,
    ) -> AuthResult<Self> {
        let builder = AuthRequestBuilder::new(config)?;
        Ok(Self {
            builder,
            store,
            exchanger,
            frames,
            bus,
            expected_origin: config.redirect_origin()?,
            timeout: config.timeout,
        })
    }

    /// Obtain a token without user interaction
    ///
    /// # Errors
    /// - `InteractionRequired` on timeout or when the provider asks for
    ///   interaction
    /// - `OAuth` for any other provider error
    /// - `CsrfOrExpiry` on state mismatch, malformed callback or missing PKCE
    ///   entry
    /// - `TokenExchange` / `Http` if the code exchange fails
    /// - `Host` / `Storage` if the frame or entry cannot be created
    pub async fn get_access_token_silently(&self) -> AuthResult<AccessToken> {
        let material = PkceMaterial::generate();
        self.store.save(
            &material.state,
            &PkceEntry { verifier: material.verifier.clone(), challenge: material.challenge.clone() },
        )?;

        info!(state_prefix = material.state_prefix(), "Starting silent authorization");
        let result = self.run_attempt(&material).await;

        // The entry is already gone after a consume; this only clears entries
        // of attempts that never reached one.
        if result.is_err() {
            self.store.discard(&material.state);
        }
        result
    }

    async fn run_attempt(&self, material: &PkceMaterial) -> AuthResult<AccessToken> {
        let url = self.builder.build_auth_url(&material.state, &material.challenge, Some(PROMPT_NONE));

        // Listen before the frame exists so a fast provider cannot win the
        // race against registration.
        let mut listener = self.bus.listen();
        let frame = FrameGuard::mount(Arc::clone(&self.frames), &url)?;

        let started = tokio::time::Instant::now();
        let resolver = AttemptResolver::new();
        let cancel = CancellationToken::new();

        let timer = async {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(self.timeout) => {
                    if resolver.settle(Settlement::TimedOut) {
                        cancel.cancel();
                    }
                }
            }
        };

        let receiver = async {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    message = listener.recv() => {
                        let Some(message) = message else { break };
                        if let Some(settlement) = self.accept(&message) {
                            if resolver.settle(settlement) {
                                cancel.cancel();
                            }
                            break;
                        }
                    }
                }
            }
        };

        tokio::join!(timer, receiver);
        drop(frame);
        drop(listener);

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match resolver.into_inner() {
            Some(Settlement::Callback(callback)) => {
                debug!(elapsed_ms, "Silent authorization callback received");
                self.complete(material, callback).await
            }
            Some(Settlement::Malformed) => Err(AuthError::csrf(CsrfReason::InvalidCallback)),
            Some(Settlement::TimedOut) | None => {
                info!(
                    state_prefix = material.state_prefix(),
                    elapsed_ms, "Silent authorization timed out"
                );
                Err(AuthError::InteractionRequired)
            }
        }
    }

    /// Filter a raw window message down to a settlement
    ///
    /// Messages from other origins or without the callback discriminator
    /// leave the attempt pending. A message that claims to be a callback but
    /// does not parse as one settles the attempt as malformed.
    fn accept(&self, message: &WindowMessage) -> Option<Settlement> {
        if message.origin != self.expected_origin {
            warn!(
                origin = %message.origin,
                expected = %self.expected_origin,
                "Discarding message from unexpected origin"
            );
            return None;
        }
        if message.data.get("type").and_then(Value::as_str) != Some(CALLBACK_MESSAGE_TYPE) {
            debug!(origin = %message.origin, "Ignoring non-callback message");
            return None;
        }
        match serde_json::from_value::<CallbackMessage>(message.data.clone()) {
            Ok(callback) => Some(Settlement::Callback(callback)),
            Err(e) => {
                warn!(error = %e, "Rejecting malformed callback message");
                Some(Settlement::Malformed)
            }
        }
    }

    async fn complete(
        &self,
        material: &PkceMaterial,
        callback: CallbackMessage,
    ) -> AuthResult<AccessToken> {
        if let Some(error) = callback.error {
            if error == INTERACTION_REQUIRED {
                info!(state_prefix = material.state_prefix(), "Provider requires interaction");
                return Err(AuthError::InteractionRequired);
            }
            warn!(state_prefix = material.state_prefix(), oauth_error = %error, "Silent authorization failed");
            return Err(AuthError::OAuth { error, description: None });
        }

        match (callback.code, callback.state) {
            (Some(code), Some(state)) if validate_state(&material.state, &state) => {
                let entry = self.store.consume(&state)?;
                self.exchanger.exchange_code_for_token(&code, &entry.verifier).await
            }
            (_, state) => {
                warn!(
                    expected = material.state_prefix(),
                    received = state.as_deref().map(state_prefix).unwrap_or(""),
                    "Rejecting callback that does not match the pending attempt"
                );
                Err(AuthError::csrf(CsrfReason::InvalidCallback))
            }
        }
    }
}
