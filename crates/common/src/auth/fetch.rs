//! Token-bearing HTTP client for downstream API calls

use reqwest::{Client, Method, RequestBuilder};
use url::Url;

use super::types::AccessToken;

/// `reqwest::Client` that attaches `Authorization: Bearer <token>` to every
/// request it builds
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    http: Client,
    token: AccessToken,
}

impl AuthorizedClient {
    #[must_use]
    pub fn new(token: AccessToken) -> Self {
        Self::with_http_client(Client::new(), token)
    }

    #[must_use]
    pub fn with_http_client(http: Client, token: AccessToken) -> Self {
        Self { http, token }
    }

    /// Start a request with the bearer header already set
    #[must_use]
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(self.token.secret())
    }

    #[must_use]
    pub fn get(&self, url: Url) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    #[must_use]
    pub fn post(&self, url: Url) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Swap in a fresh token after re-authentication
    pub fn set_token(&mut self, token: AccessToken) {
        self.token = token;
    }
}
