//! Authorization URL construction

use url::Url;

use super::error::AuthResult;
use super::pkce::CHALLENGE_METHOD;
use super::types::AuthConfig;

/// `prompt` value requesting no-interaction authorization
pub const PROMPT_NONE: &str = "none";

/// Builds provider authorization URLs from validated configuration
#[derive(Debug, Clone)]
pub struct AuthRequestBuilder {
    authorization_endpoint: Url,
    client_id: String,
    redirect_uri: String,
    scope: String,
}

impl AuthRequestBuilder {
    /// Create a builder, validating the configuration first
    ///
    /// # Errors
    /// Returns `AuthError::Config` if a required field is missing or invalid.
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        config.validate()?;
        Ok(Self {
            authorization_endpoint: config.authorization_url()?,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.trim().to_string(),
            scope: config.scope_string(),
        })
    }

    /// Build the authorization URL for one attempt
    ///
    /// `prompt = Some("none")` requests silent authorization; `None` or an
    /// empty prompt allows interactive login.
    ///
    /// # Examples
    /// ```
    /// use webgate_common::auth::{AuthConfig, AuthRequestBuilder};
    ///
    /// let config = AuthConfig::new(
    ///     "abc",
    ///     "https://app/callback",
    ///     "https://app",
    ///     "https://idp/authorize",
    ///     "https://idp/token",
    /// );
    /// let builder = AuthRequestBuilder::new(&config).unwrap();
    /// let url = builder.build_auth_url("state", "challenge", Some("none"));
    /// assert!(url.as_str().contains("prompt=none"));
    /// ```
    #[must_use]
    pub fn build_auth_url(&self, state: &str, challenge: &str, prompt: Option<&str>) -> Url {
        let mut url = self.authorization_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &self.scope)
                .append_pair("state", state)
                .append_pair("code_challenge", challenge)
                .append_pair("code_challenge_method", CHALLENGE_METHOD);
            if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
                query.append_pair("prompt", prompt);
            }
        }
        url
    }
}
