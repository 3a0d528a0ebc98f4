//! Application entry sequence
//!
//! On every application page load:
//!
//! 1. If the URL carries a callback (`code`/`state` or `error`/`state`) this
//!    is the tail of an interactive redirect: consume the PKCE entry, exchange
//!    the code, and scrub the callback parameters from history.
//! 2. Otherwise try silent auth; on `interaction_required` fall through to the
//!    interactive redirect, after which nothing else runs on this page.
//!
//! Local-development hosts, author/preview hosts and the callback page itself
//! are skipped.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use super::client::TokenExchanger;
use super::error::{AuthError, AuthResult};
use super::interactive::InteractiveRedirectController;
use super::pkce::state_prefix;
use super::session::SessionMonitor;
use super::silent::SilentAuthController;
use super::store::PkceStore;
use super::traits::{Navigator, StatusReporter};
use super::types::{AccessToken, AuthConfig, CallbackResult};

const CALLBACK_PARAMS: [&str; 4] = ["code", "state", "error", "error_description"];

/// Kind of page being loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// A regular application page; auth runs
    Application,
    /// The provider redirect target; the callback dispatcher owns it
    Callback,
    /// A local development host
    LocalDevelopment,
    /// An author or preview host
    AuthorPreview,
}

/// How the entry sequence ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A token is available for downstream fetches
    Authenticated(AccessToken),
    /// The window is navigating to the provider login
    Redirecting,
    /// Auth does not run on this kind of page
    Skipped(PageKind),
}

/// Composes the controllers into the per-page-load entry sequence
pub struct AuthBootstrap {
    redirect_url: Url,
    local_hosts: Vec<String>,
    preview_host_markers: Vec<String>,
    store: PkceStore,
    exchanger: Arc<dyn TokenExchanger>,
    silent: SilentAuthController,
    interactive: InteractiveRedirectController,
    navigator: Arc<dyn Navigator>,
    reporter: Arc<dyn StatusReporter>,
    monitor: Option<Arc<SessionMonitor>>,
}

impl AuthBootstrap {
    /// Create the entry sequence
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AuthConfig,
        store: PkceStore,
        exchanger: Arc<dyn TokenExchanger>,
        silent: SilentAuthController,
        interactive: InteractiveRedirectController,
        navigator: Arc<dyn Navigator>,
        reporter: Arc<dyn StatusReporter>,
    ) -> AuthResult<Self> {
        config.validate()?;
        Ok(Self {
            redirect_url: config.redirect_url()?,
            local_hosts: config.local_hosts.clone(),
            preview_host_markers: config.preview_host_markers.clone(),
            store,
            exchanger,
            silent,
            interactive,
            navigator,
            reporter,
            monitor: None,
        })
    }

    /// Attach this monitor after a successful authentication
    #[must_use]
    pub fn with_session_monitor(mut self, monitor: Arc<SessionMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Classify a page URL
    #[must_use]
    pub fn classify(&self, url: &Url) -> PageKind {
        let host = url.host_str().unwrap_or_default();
        if self.local_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return PageKind::LocalDevelopment;
        }
        if self.preview_host_markers.iter().any(|m| !m.is_empty() && host.contains(m.as_str())) {
            return PageKind::AuthorPreview;
        }
        if url.origin() == self.redirect_url.origin() && url.path() == self.redirect_url.path() {
            return PageKind::Callback;
        }
        PageKind::Application
    }

    /// Run the entry sequence for `current_url`
    ///
    /// Unrecoverable errors are shown through the [`StatusReporter`] before
    /// being returned.
    ///
    /// # Errors
    /// Any [`AuthError`] other than `InteractionRequired`, which is recovered
    /// by redirecting.
    pub async fn run(&self, current_url: &Url) -> AuthResult<BootstrapOutcome> {
        let kind = self.classify(current_url);
        if kind != PageKind::Application {
            info!(?kind, "Skipping authentication for this page");
            return Ok(BootstrapOutcome::Skipped(kind));
        }

        match self.authenticate(current_url).await {
            Ok(BootstrapOutcome::Authenticated(token)) => {
                if let Some(monitor) = &self.monitor {
                    if let Err(e) = monitor.attach() {
                        warn!(error = %e, "Session monitor could not be attached");
                    }
                }
                Ok(BootstrapOutcome::Authenticated(token))
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(error = %e, kind = e.label(), "Authentication failed");
                self.reporter.show_auth_failure(&e);
                Err(e)
            }
        }
    }

    async fn authenticate(&self, current_url: &Url) -> AuthResult<BootstrapOutcome> {
        if let Some(callback) = CallbackResult::from_url(current_url) {
            let result = self.complete_redirect(callback).await;
            self.scrub_history(current_url);
            return result.map(BootstrapOutcome::Authenticated);
        }

        match self.silent.get_access_token_silently().await {
            Ok(token) => Ok(BootstrapOutcome::Authenticated(token)),
            Err(e) if e.is_interaction_required() => {
                self.interactive.redirect_to_login()?;
                Ok(BootstrapOutcome::Redirecting)
            }
            Err(e) => Err(e),
        }
    }

    async fn complete_redirect(&self, callback: CallbackResult) -> AuthResult<AccessToken> {
        match callback {
            CallbackResult::Code { code, state } => {
                info!(state_prefix = state_prefix(&state), "Completing interactive login");
                let entry = self.store.consume(&state)?;
                self.exchanger.exchange_code_for_token(&code, &entry.verifier).await
            }
            CallbackResult::Error { error, state } => {
                self.store.discard(&state);
                Err(AuthError::OAuth { error, description: None })
            }
        }
    }

    /// Rewrite the current history entry without callback parameters so a
    /// reload never re-submits the code
    fn scrub_history(&self, current_url: &Url) {
        let mut clean = current_url.clone();
        let kept: Vec<(String, String)> = current_url
            .query_pairs()
            .filter(|(k, _)| !CALLBACK_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            clean.set_query(None);
        } else {
            clean.query_pairs_mut().clear().extend_pairs(kept);
        }
        if let Err(e) = self.navigator.replace_history(&clean) {
            warn!(error = %e, "Could not scrub callback parameters from history");
        }
    }
}
