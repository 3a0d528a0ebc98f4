//! Interactive (top-level redirect) authorization

use std::sync::Arc;

use tracing::info;
use url::Url;

use super::error::AuthResult;
use super::pkce::PkceMaterial;
use super::request::AuthRequestBuilder;
use super::store::PkceStore;
use super::traits::Navigator;
use super::types::{AuthConfig, PkceEntry};

/// Proof that the page is navigating away to the provider
///
/// Nothing further should run on this page load once it is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectIssued {
    /// State of the fresh attempt (lookup key of its PKCE entry)
    pub state: String,
    /// Authorization URL the window was sent to
    pub url: Url,
}

/// Falls back to a full-page login when silent auth cannot succeed
pub struct InteractiveRedirectController {
    builder: AuthRequestBuilder,
    store: PkceStore,
    navigator: Arc<dyn Navigator>,
}

impl InteractiveRedirectController {
    /// Create a controller
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid.
    pub fn new(
        config: &AuthConfig,
        store: PkceStore,
        navigator: Arc<dyn Navigator>,
    ) -> AuthResult<Self> {
        Ok(Self { builder: AuthRequestBuilder::new(config)?, store, navigator })
    }

    /// Store fresh PKCE material and navigate to the provider login
    ///
    /// The material is independent of any earlier silent attempt. No `prompt`
    /// is sent.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` or `AuthError::Host` if the entry cannot
    /// be stored or the navigation is refused; a stored entry is discarded
    /// when navigation fails.
    pub fn redirect_to_login(&self) -> AuthResult<RedirectIssued> {
        let material = PkceMaterial::generate();
        self.store.save(
            &material.state,
            &PkceEntry { verifier: material.verifier.clone(), challenge: material.challenge.clone() },
        )?;

        let url = self.builder.build_auth_url(&material.state, &material.challenge, None);
        if let Err(e) = self.navigator.assign(&url) {
            self.store.discard(&material.state);
            return Err(e);
        }

        info!(state_prefix = material.state_prefix(), "Redirecting to interactive login");
        Ok(RedirectIssued { state: material.state, url })
    }
}
