//! Callback page dispatch
//!
//! Runs at the provider's redirect target. The browsing context is resolved
//! once by the host and handed in as a [`BrowsingContext`]:
//!
//! - `TopLevel`: tail of an interactive redirect; history-replacing
//!   navigation to the application path with the result forwarded in the
//!   query
//! - `Framed`: tail of a silent attempt; structured message to the parent,
//!   restricted to this document's own origin

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use super::error::{AuthError, AuthResult};
use super::traits::{Navigator, ParentWindow};
use super::types::{AuthConfig, CallbackResult};

/// Where the callback page is running
#[derive(Clone)]
pub enum BrowsingContext {
    /// The page owns the top-level window
    TopLevel(Arc<dyn Navigator>),
    /// The page is inside a frame; the parent is reachable
    Framed(Arc<dyn ParentWindow>),
}

impl fmt::Debug for BrowsingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopLevel(_) => f.write_str("TopLevel"),
            Self::Framed(_) => f.write_str("Framed"),
        }
    }
}

/// What the dispatcher did with the current URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No `state`, or neither `code` nor `error`; nothing happened
    Ignored,
    /// Top-level: replaced the location with this application URL
    Redirected(Url),
    /// Framed: posted the result to the parent at this origin
    Posted { target_origin: String },
}

/// Forwards provider callbacks to the silent controller or the application
#[derive(Debug)]
pub struct CallbackDispatcher {
    context: BrowsingContext,
    app_path: String,
}

impl CallbackDispatcher {
    /// Create a dispatcher for the given browsing context
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the configuration is invalid.
    pub fn new(config: &AuthConfig, context: BrowsingContext) -> AuthResult<Self> {
        config.validate()?;
        Ok(Self { context, app_path: config.app_path.clone() })
    }

    /// Forward the callback carried by `current_url`
    ///
    /// # Errors
    /// Returns `AuthError::Host` if navigation or posting fails.
    pub fn dispatch(&self, current_url: &Url) -> AuthResult<DispatchOutcome> {
        let Some(result) = CallbackResult::from_url(current_url) else {
            debug!("Callback page loaded without a callback payload");
            return Ok(DispatchOutcome::Ignored);
        };

        match &self.context {
            BrowsingContext::TopLevel(navigator) => {
                let target = self.application_url(current_url, &result);
                info!(kind = result_kind(&result), "Forwarding callback to application");
                navigator.replace(&target)?;
                Ok(DispatchOutcome::Redirected(target))
            }
            BrowsingContext::Framed(parent) => {
                let target_origin = current_url.origin().ascii_serialization();
                let data = serde_json::to_value(result.to_message())
                    .map_err(|e| AuthError::Host(format!("failed to encode callback: {e}")))?;
                parent.post_message(data, &target_origin)?;
                info!(kind = result_kind(&result), target_origin = %target_origin, "Posted callback to parent");
                Ok(DispatchOutcome::Posted { target_origin })
            }
        }
    }

    fn application_url(&self, current_url: &Url, result: &CallbackResult) -> Url {
        let mut target = current_url.clone();
        target.set_path(&self.app_path);
        target.set_fragment(None);
        target.set_query(None);
        target.query_pairs_mut().extend_pairs(result.query_pairs());
        target
    }
}

const fn result_kind(result: &CallbackResult) -> &'static str {
    match result {
        CallbackResult::Code { .. } => "code",
        CallbackResult::Error { .. } => "error",
    }
}
