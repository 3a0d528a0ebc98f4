//! Auth context - dependency injection container
//!
//! Builds every auth core service from one [`AuthConfig`] and the host
//! objects of the embedding page. All services share one PKCE store, one
//! message bus and one cookie-carrying `reqwest::Client`.

use std::sync::Arc;

use reqwest::Client;
use url::Url;
use webgate_common::auth::{
    AccessToken, ActivityTarget, AuthBootstrap, AuthConfig, AuthResult, AuthorizedClient,
    BootstrapOutcome, BrowsingContext, CallbackDispatcher, FrameHost, HttpSessionApi,
    InteractiveRedirectController, MessageBus, Navigator, OAuthClient, PkceStore, SessionMonitor,
    SessionStorage, SilentAuthController, StatusReporter,
};

use crate::errors::InfraResult;

/// Browser capabilities supplied by the embedding page
#[derive(Clone)]
pub struct BrowserHost {
    /// Hidden frame mounting for silent attempts
    pub frames: Arc<dyn FrameHost>,
    /// Top-level navigation and history
    pub navigator: Arc<dyn Navigator>,
    /// User activity events for the session monitor
    pub activity: Arc<dyn ActivityTarget>,
    /// Per-tab storage backing the PKCE store
    pub storage: Arc<dyn SessionStorage>,
    /// User-facing failure display
    pub reporter: Arc<dyn StatusReporter>,
    /// Window message delivery shared with the callback page
    pub bus: MessageBus,
}

/// Auth context - holds all services and their shared collaborators
pub struct AuthContext {
    pub config: AuthConfig,
    pub http: Client,
    pub store: PkceStore,
    pub bus: MessageBus,
    pub token_client: Arc<OAuthClient>,
    pub session_api: Arc<HttpSessionApi>,
    pub monitor: Arc<SessionMonitor>,
    pub bootstrap: AuthBootstrap,
}

impl AuthContext {
    /// Validate `config` and wire the auth core against `host`
    ///
    /// Every back-channel request made through the shared client is bounded
    /// by `config.request_timeout`.
    ///
    /// # Errors
    /// Returns `InfraError::Auth` if the configuration is invalid and
    /// `InfraError::Http` if the shared HTTP client cannot be built.
    pub fn build(config: AuthConfig, host: BrowserHost) -> InfraResult<Self> {
        config.validate()?;
        let http =
            Client::builder().cookie_store(true).timeout(config.request_timeout).build()?;
        Self::with_http_client(config, host, http)
    }

    /// Wire the auth core with an existing `reqwest::Client`
    ///
    /// # Errors
    /// Returns `InfraError::Auth` if the configuration is invalid.
    pub fn with_http_client(
        config: AuthConfig,
        host: BrowserHost,
        http: Client,
    ) -> InfraResult<Self> {
        let store = PkceStore::new(host.storage);
        let token_client = Arc::new(OAuthClient::with_http_client(&config, http.clone())?);
        let session_api = Arc::new(HttpSessionApi::with_http_client(&config, http.clone())?);
        let monitor = SessionMonitor::new(
            &config,
            session_api.clone(),
            host.navigator.clone(),
            host.activity,
        )?;

        let silent = SilentAuthController::new(
            &config,
            store.clone(),
            token_client.clone(),
            host.frames,
            host.bus.clone(),
        )?;
        let interactive =
            InteractiveRedirectController::new(&config, store.clone(), host.navigator.clone())?;
        let bootstrap = AuthBootstrap::new(
            &config,
            store.clone(),
            token_client.clone(),
            silent,
            interactive,
            host.navigator,
            host.reporter,
        )?
        .with_session_monitor(Arc::clone(&monitor));

        tracing::info!(
            client_id = %config.client_id,
            token_endpoint = %token_client.token_url(),
            "Auth context ready"
        );

        Ok(Self {
            config,
            http,
            store,
            bus: host.bus,
            token_client,
            session_api,
            monitor,
            bootstrap,
        })
    }

    /// Run the page-load entry sequence for `page`
    ///
    /// # Errors
    /// Propagates the bootstrap error after it has been reported.
    pub async fn start(&self, page: &Url) -> AuthResult<BootstrapOutcome> {
        self.bootstrap.run(page).await
    }

    /// Dispatcher for the callback page in the given browsing context
    ///
    /// # Errors
    /// Returns `InfraError::Auth` if the configuration is invalid.
    pub fn callback_dispatcher(&self, context: BrowsingContext) -> InfraResult<CallbackDispatcher> {
        Ok(CallbackDispatcher::new(&self.config, context)?)
    }

    /// Bearer-token client sharing the context's connection pool
    #[must_use]
    pub fn authorized_client(&self, token: AccessToken) -> AuthorizedClient {
        AuthorizedClient::with_http_client(self.http.clone(), token)
    }
}
