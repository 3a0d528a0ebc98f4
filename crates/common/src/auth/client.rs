//! Back-channel token exchange
//!
//! Exchanges an authorization code plus its PKCE verifier for a bearer access
//! token. Codes are single-use, so nothing here retries.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use super::error::{AuthError, AuthResult};
use super::types::{AccessToken, AuthConfig, OAuthErrorBody, TokenResponse};

/// Exchanges authorization codes for access tokens
///
/// Abstracts the token endpoint so controllers can be tested with
/// [`crate::testing::MockTokenExchanger`].
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange `code` and its `verifier` for an access token
    ///
    /// # Errors
    /// Returns `AuthError::TokenExchange` on a non-success status and
    /// `AuthError::Http` on transport or body decoding failure.
    async fn exchange_code_for_token(&self, code: &str, verifier: &str) -> AuthResult<AccessToken>;
}

/// OAuth 2.0 token endpoint client
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    token_url: Url,
    client_id: String,
    redirect_uri: String,
}

impl OAuthClient {
    /// Create a client whose requests are bounded by
    /// [`AuthConfig::request_timeout`]
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid and
    /// `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        config.validate()?;
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Self::with_http_client(config, http)
    }

    /// Create a client sharing an existing `reqwest::Client`
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid.
    pub fn with_http_client(config: &AuthConfig, http: Client) -> AuthResult<Self> {
        config.validate()?;
        Ok(Self {
            http,
            token_url: config.token_url()?,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.trim().to_string(),
        })
    }

    /// Token endpoint this client posts to
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

#[async_trait]
impl TokenExchanger for OAuthClient {
    async fn exchange_code_for_token(&self, code: &str, verifier: &str) -> AuthResult<AccessToken> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ];

        let response = self.http.post(self.token_url.clone()).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            match response.json::<OAuthErrorBody>().await {
                Ok(body) => warn!(
                    status = status.as_u16(),
                    oauth_error = %body.error,
                    description = body.error_description.as_deref().unwrap_or(""),
                    "Token endpoint rejected authorization code"
                ),
                Err(_) => warn!(status = status.as_u16(), "Token endpoint rejected authorization code"),
            }
            return Err(AuthError::TokenExchange { status: status.as_u16(), status_text });
        }

        let token: TokenResponse = response.json().await?;
        if token.access_token.is_empty() {
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                status_text: "empty access_token".to_string(),
            });
        }

        info!(
            token_type = token.token_type.as_deref().unwrap_or("unspecified"),
            expires_in = token.expires_in,
            "Authorization code exchanged for access token"
        );
        Ok(AccessToken::new(token.access_token))
    }
}
