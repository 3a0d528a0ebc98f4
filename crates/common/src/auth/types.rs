//! Auth configuration and data model
//!
//! Defines the read-only [`AuthConfig`] supplied by the configuration
//! provider, the redacting secret wrappers ([`AccessToken`], [`PkceEntry`]),
//! and the callback shapes exchanged between the provider redirect target and
//! the application.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{AuthError, AuthResult};
use crate::utils::serde::duration_millis;

/// `type` discriminator of the cross-document callback message
pub const CALLBACK_MESSAGE_TYPE: &str = "oauthCallback";

/// OAuth error code the provider returns when silent auth needs a login
pub const INTERACTION_REQUIRED: &str = "interaction_required";

/// Scopes agreed with the identity provider: OIDC plus the portal read scope
pub const DEFAULT_SCOPES: [&str; 4] = ["openid", "profile", "email", "portal.read"];

const DEFAULT_SESSION_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable per-page-load auth configuration
///
/// Loaded once by the configuration provider. Every constructor that consumes
/// it calls [`AuthConfig::validate`] so missing fields surface before any
/// network activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// Scopes requested on every authorization (space-joined on the wire)
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Provider redirect target; its origin is the only accepted message
    /// sender
    pub redirect_uri: String,

    /// Base URL of the session service
    pub base_url: String,

    /// Provider authorization endpoint
    pub authorization_endpoint: String,

    /// Provider token endpoint
    pub token_endpoint: String,

    /// Session validate endpoint (defaults to `{base_url}/session/validate`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_validate_endpoint: Option<String>,

    /// Session logout endpoint (defaults to `{base_url}/session/logout`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_logout_endpoint: Option<String>,

    /// Minimum time between two session validations
    #[serde(with = "duration_millis", default = "default_session_check_interval")]
    pub session_check_interval: Duration,

    /// Silent authorization timeout
    #[serde(with = "duration_millis", default = "default_timeout")]
    pub timeout: Duration,

    /// Upper bound on any single back-channel request (token exchange,
    /// session validate and logout)
    #[serde(with = "duration_millis", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Application path the callback page forwards interactive results to
    #[serde(default = "default_app_path")]
    pub app_path: String,

    /// Brand identifier passed through to hosts; not interpreted by the core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// Hosts treated as local development (bootstrap skips auth)
    #[serde(default = "default_local_hosts")]
    pub local_hosts: Vec<String>,

    /// Host fragments that mark author/preview contexts (bootstrap skips
    /// auth)
    #[serde(default = "default_preview_host_markers")]
    pub preview_host_markers: Vec<String>,
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(ToString::to_string).collect()
}

const fn default_session_check_interval() -> Duration {
    DEFAULT_SESSION_CHECK_INTERVAL
}

const fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

const fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_app_path() -> String {
    "/".to_string()
}

fn default_local_hosts() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}

fn default_preview_host_markers() -> Vec<String> {
    vec!["author-".to_string(), ".page".to_string()]
}

impl AuthConfig {
    /// Create a configuration with default scopes, intervals and paths
    ///
    /// # Examples
    /// ```
    /// use webgate_common::auth::AuthConfig;
    ///
    /// let config = AuthConfig::new(
    ///     "abc",
    ///     "https://app.example.com/callback",
    ///     "https://app.example.com",
    ///     "https://idp.example.com/authorize",
    ///     "https://idp.example.com/token",
    /// );
    /// assert!(config.validate().is_ok());
    /// ```
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        base_url: impl Into<String>,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            scopes: default_scopes(),
            redirect_uri: redirect_uri.into(),
            base_url: base_url.into(),
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            session_validate_endpoint: None,
            session_logout_endpoint: None,
            session_check_interval: DEFAULT_SESSION_CHECK_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            app_path: default_app_path(),
            brand: None,
            local_hosts: default_local_hosts(),
            preview_host_markers: default_preview_host_markers(),
        }
    }

    /// Replace the requested scopes
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the silent authorization timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-request timeout of the back-channel HTTP clients
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the session validation interval
    #[must_use]
    pub const fn with_session_check_interval(mut self, interval: Duration) -> Self {
        self.session_check_interval = interval;
        self
    }

    /// Override the session validate and logout endpoints
    #[must_use]
    pub fn with_session_endpoints(
        mut self,
        validate: impl Into<String>,
        logout: impl Into<String>,
    ) -> Self {
        self.session_validate_endpoint = Some(validate.into());
        self.session_logout_endpoint = Some(logout.into());
        self
    }

    /// Check that every required field is present and parseable
    ///
    /// # Errors
    /// Returns `AuthError::Config` naming the first offending field.
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::config("client_id", "is required"));
        }
        if self.scopes.iter().all(|scope| scope.trim().is_empty()) {
            return Err(AuthError::config("scopes", "at least one scope is required"));
        }
        self.redirect_url()?;
        self.authorization_url()?;
        self.token_url()?;
        self.session_validate_url()?;
        self.session_logout_url()?;
        if self.timeout.is_zero() {
            return Err(AuthError::config("timeout", "must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(AuthError::config("request_timeout", "must be greater than zero"));
        }
        if self.session_check_interval.is_zero() {
            return Err(AuthError::config("session_check_interval", "must be greater than zero"));
        }
        if !self.app_path.starts_with('/') {
            return Err(AuthError::config("app_path", "must be an absolute path"));
        }
        Ok(())
    }

    /// Parsed redirect URI
    ///
    /// # Errors
    /// Returns `AuthError::Config` if absent or not an absolute http(s) URL.
    pub fn redirect_url(&self) -> AuthResult<Url> {
        parse_endpoint("redirect_uri", &self.redirect_uri)
    }

    /// Parsed authorization endpoint
    ///
    /// # Errors
    /// Returns `AuthError::Config` if absent or not an absolute http(s) URL.
    pub fn authorization_url(&self) -> AuthResult<Url> {
        parse_endpoint("authorization_endpoint", &self.authorization_endpoint)
    }

    /// Parsed token endpoint
    ///
    /// # Errors
    /// Returns `AuthError::Config` if absent or not an absolute http(s) URL.
    pub fn token_url(&self) -> AuthResult<Url> {
        parse_endpoint("token_endpoint", &self.token_endpoint)
    }

    /// Session validate endpoint, explicit or derived from `base_url`
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the endpoint cannot be resolved.
    pub fn session_validate_url(&self) -> AuthResult<Url> {
        match &self.session_validate_endpoint {
            Some(endpoint) => parse_endpoint("session_validate_endpoint", endpoint),
            None => self.base_relative("session/validate"),
        }
    }

    /// Session logout endpoint, explicit or derived from `base_url`
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the endpoint cannot be resolved.
    pub fn session_logout_url(&self) -> AuthResult<Url> {
        match &self.session_logout_endpoint {
            Some(endpoint) => parse_endpoint("session_logout_endpoint", endpoint),
            None => self.base_relative("session/logout"),
        }
    }

    /// Origin of the redirect URI, the only accepted callback message sender
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the redirect URI is invalid.
    pub fn redirect_origin(&self) -> AuthResult<String> {
        Ok(self.redirect_url()?.origin().ascii_serialization())
    }

    /// Get scopes as space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes
            .iter()
            .map(|scope| scope.trim())
            .filter(|scope| !scope.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn base_relative(&self, path: &str) -> AuthResult<Url> {
        let base = parse_endpoint("base_url", &self.base_url)?;
        let joined = format!("{}/{path}", base.as_str().trim_end_matches('/'));
        parse_endpoint("base_url", &joined)
    }
}

fn parse_endpoint(field: &str, value: &str) -> AuthResult<Url> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::config(field, "is required"));
    }
    let url = Url::parse(value)
        .map_err(|e| AuthError::config(field, format!("invalid URL '{value}': {e}")))?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(AuthError::config(field, format!("unsupported scheme '{other}'"))),
    }
}

/// Bearer access token returned by the token endpoint
///
/// `Debug` is redacted; use [`AccessToken::secret`] to read the value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value for the `Authorization` header
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// PKCE material stored under its `state` until the callback consumes it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceEntry {
    /// Code verifier, sent only to the token endpoint
    pub verifier: String,

    /// S256 challenge derived from the verifier
    pub challenge: String,
}

impl fmt::Debug for PkceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceEntry")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Result of an authorization round trip as seen by the redirect target
///
/// Exactly one of code or error is carried; an error takes precedence when a
/// malformed response carries both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    /// The provider issued an authorization code
    Code { code: String, state: String },
    /// The provider returned an OAuth error
    Error { error: String, state: String },
}

impl CallbackResult {
    /// Parse `code`, `state` and `error` from a URL query
    ///
    /// Returns `None` when `state` is absent or neither `code` nor `error` is
    /// present (direct or accidental navigation to the callback path).
    #[must_use]
    pub fn from_url(url: &Url) -> Option<Self> {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "code" => &mut code,
                "state" => &mut state,
                "error" => &mut error,
                _ => continue,
            };
            if !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }

        let state = state?;
        match (code, error) {
            (_, Some(error)) => Some(Self::Error { error, state }),
            (Some(code), None) => Some(Self::Code { code, state }),
            (None, None) => None,
        }
    }

    /// The round-tripped `state`
    #[must_use]
    pub fn state(&self) -> &str {
        match self {
            Self::Code { state, .. } | Self::Error { state, .. } => state,
        }
    }

    /// Query parameters to forward, in wire order
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, &str); 2] {
        match self {
            Self::Code { code, state } => [("code", code.as_str()), ("state", state.as_str())],
            Self::Error { error, state } => [("error", error.as_str()), ("state", state.as_str())],
        }
    }

    /// Structured cross-document message carrying this result
    #[must_use]
    pub fn to_message(&self) -> CallbackMessage {
        match self {
            Self::Code { code, state } => CallbackMessage {
                kind: CALLBACK_MESSAGE_TYPE.to_string(),
                code: Some(code.clone()),
                state: Some(state.clone()),
                error: None,
            },
            Self::Error { error, state } => CallbackMessage {
                kind: CALLBACK_MESSAGE_TYPE.to_string(),
                code: None,
                state: Some(state.clone()),
                error: Some(error.clone()),
            },
        }
    }
}

/// Wire shape of the cross-document callback message
///
/// `{type: 'oauthCallback', code, state, error}`; absent fields may be omitted
/// or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackMessage {
    /// Always [`CALLBACK_MESSAGE_TYPE`] for messages this core handles
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallbackMessage {
    /// True when the discriminator marks this as an OAuth callback
    #[must_use]
    pub fn is_callback(&self) -> bool {
        self.kind == CALLBACK_MESSAGE_TYPE
    }
}

/// OAuth token response from the token endpoint
///
/// Standard RFC 6749 §5.1 body; only `access_token` is required.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// OAuth error body (RFC 6749 §5.2)
#[derive(Debug, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
