//! Browser-side OAuth 2.0 authorization code + PKCE core
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  AuthBootstrap   │  per-page-load entry sequence
//! └────────┬─────────┘
//!          │
//!          ├──► SilentAuthController        (hidden frame + MessageBus)
//!          │         └──► TokenExchanger    (back-channel code exchange)
//!          ├──► InteractiveRedirectController (top-level navigation)
//!          ├──► PkceStore                   (create, consume once, delete)
//!          └──► SessionMonitor              (throttled liveness checks)
//!
//! CallbackDispatcher runs on the redirect target and feeds either the
//! MessageBus (framed) or the application URL (top-level).
//! ```
//!
//! Every collaborator is passed in explicitly; there is no ambient global
//! state. The browser is reached only through the traits in [`traits`].
//!
//! # Module Organization
//!
//! - **[`types`]**: `AuthConfig`, `AccessToken`, `PkceEntry`, callback shapes
//! - **[`pkce`]**: state/verifier generation and `S256` challenge derivation
//! - **[`request`]**: authorization URL builder
//! - **[`client`]**: token exchange
//! - **[`store`]**: per-tab PKCE storage
//! - **[`silent`]** / **[`interactive`]**: the two authorization controllers
//! - **[`callback`]**: redirect target dispatcher
//! - **[`bootstrap`]**: entry sequence composing the above
//! - **[`session`]**: session monitor
//! - **[`fetch`]**: bearer-token HTTP client
//!
//! # Security Features
//!
//! - **PKCE**: binds the code to the client that started the attempt
//! - **State Validation**: constant-time comparison, single-use entries
//! - **Origin Checks**: messages only accepted from the redirect URI's origin
//!   and only posted to the callback page's own origin
//! - **Redaction**: verifiers and tokens never reach logs

pub mod bootstrap;
pub mod callback;
pub mod client;
pub mod error;
pub mod fetch;
pub mod interactive;
pub mod messaging;
pub mod pkce;
pub mod request;
pub mod session;
pub mod silent;
pub mod store;
pub mod traits;
pub mod types;

pub use bootstrap::{AuthBootstrap, BootstrapOutcome, PageKind};
pub use callback::{BrowsingContext, CallbackDispatcher, DispatchOutcome};
pub use client::{OAuthClient, TokenExchanger};
pub use error::{AuthError, AuthResult, CsrfReason};
pub use fetch::AuthorizedClient;
pub use interactive::{InteractiveRedirectController, RedirectIssued};
pub use messaging::{MessageBus, MessageListener, WindowMessage};
pub use pkce::{derive_challenge, generate_state, generate_verifier, PkceMaterial};
pub use request::{AuthRequestBuilder, PROMPT_NONE};
pub use session::{CheckOutcome, HttpSessionApi, SessionApi, SessionMonitor};
pub use silent::{AttemptResolver, SilentAuthController};
pub use store::{MemorySessionStorage, PkceStore, SessionStorage};
pub use traits::{
    ActivityEvent, ActivityHandler, ActivityTarget, FrameHost, FrameId, ListenerId, Navigator,
    NoopStatusReporter, ParentWindow, StatusReporter,
};
pub use types::{
    AccessToken, AuthConfig, CallbackMessage, CallbackResult, PkceEntry, CALLBACK_MESSAGE_TYPE,
};
