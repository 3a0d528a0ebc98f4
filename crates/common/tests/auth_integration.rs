//! Integration tests for the authorization flows
//!
//! Drives the silent controller, the callback dispatcher and the bootstrap
//! together through the in-memory browser fakes, with `wiremock` standing in
//! for the token endpoint.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use url::Url;
use webgate_common::auth::{
    derive_challenge, AccessToken, AuthBootstrap, AuthConfig, AuthError, AuthResult,
    BootstrapOutcome, BrowsingContext, CallbackDispatcher, CsrfReason, DispatchOutcome,
    InteractiveRedirectController, MessageBus, NoopStatusReporter, OAuthClient, PkceStore,
    SilentAuthController, TokenExchanger, WindowMessage,
};
use webgate_common::testing::{
    test_config, wait_until, BusParentWindow, MockTokenExchanger, NavigationKind,
    RecordingFrameHost, RecordingNavigator,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP_ORIGIN: &str = "https://app";

struct Harness {
    config: AuthConfig,
    bus: MessageBus,
    frames: Arc<RecordingFrameHost>,
    store: PkceStore,
    silent: Arc<SilentAuthController>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("webgate_common=debug")
        .with_test_writer()
        .try_init();
}

impl Harness {
    fn new(config: AuthConfig, exchanger: Arc<dyn TokenExchanger>) -> Self {
        init_tracing();
        let bus = MessageBus::new();
        let frames = Arc::new(RecordingFrameHost::new());
        let store = PkceStore::in_memory();
        let silent = Arc::new(
            SilentAuthController::new(&config, store.clone(), exchanger, frames.clone(), bus.clone())
                .expect("valid config"),
        );
        Self { config, bus, frames, store, silent }
    }

    fn with_mock_exchanger() -> (Self, Arc<MockTokenExchanger>) {
        let exchanger = Arc::new(MockTokenExchanger::returning("tok123"));
        (Self::new(test_config(), exchanger.clone()), exchanger)
    }

    fn start_attempt(&self) -> JoinHandle<AuthResult<AccessToken>> {
        let silent = Arc::clone(&self.silent);
        tokio::spawn(async move { silent.get_access_token_silently().await })
    }

    /// Wait for the hidden frame and return the authorization URL it loads
    async fn frame_url(&self) -> Url {
        let frames = Arc::clone(&self.frames);
        assert!(
            wait_until(Duration::from_secs(1), || frames.mounted_count() == 1).await,
            "hidden frame was never mounted"
        );
        self.frames.last_mounted_url().expect("mounted url")
    }

    /// Simulate the provider redirecting the hidden frame to the callback page
    fn provider_redirects_frame(&self, query: &str) -> DispatchOutcome {
        let parent = Arc::new(BusParentWindow::new(self.bus.clone(), APP_ORIGIN, APP_ORIGIN));
        let dispatcher = CallbackDispatcher::new(&self.config, BrowsingContext::Framed(parent))
            .expect("valid config");
        let url = Url::parse(&format!("{APP_ORIGIN}/callback?{query}")).expect("callback url");
        dispatcher.dispatch(&url).expect("dispatch")
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
}

/// Full silent flow against a mocked token endpoint: the frame loads a
/// `prompt=none` URL, the framed callback page posts `code=xyz`, and the
/// controller exchanges it with the verifier matching the sent challenge.
#[tokio::test]
async fn test_silent_auth_end_to_end() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=xyz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "tok123"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = AuthConfig::new(
        "abc",
        "https://app/callback",
        "https://app",
        "https://idp/authorize",
        format!("{}/token", server.uri()),
    );
    let harness = Harness::new(config.clone(), Arc::new(OAuthClient::new(&config)?));

    let attempt = harness.start_attempt();
    let frame_url = harness.frame_url().await;
    assert!(frame_url.as_str().starts_with("https://idp/authorize?"));
    assert_eq!(query_param(&frame_url, "prompt").as_deref(), Some("none"));
    let state = query_param(&frame_url, "state").expect("state param");
    let challenge = query_param(&frame_url, "code_challenge").expect("challenge param");

    let outcome = harness.provider_redirects_frame(&format!("code=xyz&state={state}"));
    assert_eq!(outcome, DispatchOutcome::Posted { target_origin: APP_ORIGIN.to_string() });

    let token = attempt.await??;
    assert_eq!(token.secret(), "tok123");

    let requests = server.received_requests().await.expect("recording enabled");
    let body = String::from_utf8(requests[0].body.clone())?;
    let verifier = url::form_urlencoded::parse(body.as_bytes())
        .find(|(k, _)| k == "code_verifier")
        .map(|(_, v)| v.into_owned())
        .expect("verifier sent");
    assert_eq!(derive_challenge(&verifier), challenge);

    assert!(!harness.store.contains(&state));
    assert_eq!(harness.frames.mounted_count(), 0);
    assert_eq!(harness.bus.listener_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_interaction_required_falls_back_to_redirect_with_fresh_state() {
    let (harness, exchanger) = Harness::with_mock_exchanger();
    let navigator = Arc::new(RecordingNavigator::new());
    let interactive =
        InteractiveRedirectController::new(&harness.config, harness.store.clone(), navigator.clone())
            .expect("valid config");
    let silent = SilentAuthController::new(
        &harness.config,
        harness.store.clone(),
        exchanger.clone(),
        harness.frames.clone(),
        harness.bus.clone(),
    )
    .expect("valid config");
    let bootstrap = Arc::new(
        AuthBootstrap::new(
            &harness.config,
            harness.store.clone(),
            exchanger.clone(),
            silent,
            interactive,
            navigator.clone(),
            Arc::new(NoopStatusReporter),
        )
        .expect("valid config"),
    );

    let run = {
        let bootstrap = Arc::clone(&bootstrap);
        tokio::spawn(async move {
            let page = Url::parse("https://app/dashboard").expect("url");
            bootstrap.run(&page).await
        })
    };

    let silent_state = query_param(&harness.frame_url().await, "state").expect("state");
    harness.provider_redirects_frame(&format!("error=interaction_required&state={silent_state}"));

    let outcome = run.await.expect("task").expect("redirect is not an error");
    assert_eq!(outcome, BootstrapOutcome::Redirecting);

    let assigned = navigator.assigned_urls();
    assert_eq!(assigned.len(), 1);
    let redirect_state = query_param(&assigned[0], "state").expect("state");
    assert_ne!(redirect_state, silent_state);
    assert_eq!(query_param(&assigned[0], "prompt"), None);

    assert!(harness.store.contains(&redirect_state));
    assert!(!harness.store.contains(&silent_state));
    assert!(exchanger.calls().is_empty());
}

/// A message from any origin other than the redirect URI's is never processed;
/// the attempt stays pending and later times out normally.
#[tokio::test(start_paused = true)]
async fn test_foreign_origin_message_leaves_attempt_pending() {
    let (harness, exchanger) = Harness::with_mock_exchanger();
    let attempt = harness.start_attempt();
    let state = query_param(&harness.frame_url().await, "state").expect("state");

    let forged = serde_json::json!({"type": "oauthCallback", "code": "stolen", "state": state});
    assert_eq!(harness.bus.deliver(WindowMessage::new("https://evil.example", forged)), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!attempt.is_finished());
    assert!(harness.store.contains(&state));
    assert_eq!(harness.frames.mounted_count(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let result = attempt.await.expect("task");
    assert!(matches!(result, Err(AuthError::InteractionRequired)));
    assert!(exchanger.calls().is_empty());
    assert!(!harness.store.contains(&state));
    assert_eq!(harness.frames.mounted_count(), 0);
    assert_eq!(harness.bus.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_non_callback_messages_are_ignored() {
    let (harness, _exchanger) = Harness::with_mock_exchanger();
    let attempt = harness.start_attempt();
    let state = query_param(&harness.frame_url().await, "state").expect("state");

    harness.bus.deliver(WindowMessage::new(APP_ORIGIN, serde_json::json!({"type": "analytics"})));
    harness.bus.deliver(WindowMessage::new(APP_ORIGIN, serde_json::json!("plain string")));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!attempt.is_finished());

    harness.provider_redirects_frame(&format!("code=xyz&state={state}"));
    let token = attempt.await.expect("task").expect("token");
    assert_eq!(token.secret(), "tok123");
}

/// An accepted message settles the attempt; the timer elapsing afterwards
/// has no effect and the exchange happens exactly once.
#[tokio::test(start_paused = true)]
async fn test_message_then_timeout_settles_once() {
    let (harness, exchanger) = Harness::with_mock_exchanger();
    let attempt = harness.start_attempt();
    let state = query_param(&harness.frame_url().await, "state").expect("state");

    harness.provider_redirects_frame(&format!("code=xyz&state={state}"));
    tokio::time::sleep(Duration::from_secs(30)).await;

    let result = attempt.await.expect("task");
    assert_eq!(result.expect("token").secret(), "tok123");
    assert_eq!(exchanger.calls().len(), 1);
}

/// Once the timeout has settled the attempt, a late message reaches nobody.
#[tokio::test(start_paused = true)]
async fn test_timeout_then_message_settles_once() {
    let (harness, exchanger) = Harness::with_mock_exchanger();
    let attempt = harness.start_attempt();
    let state = query_param(&harness.frame_url().await, "state").expect("state");

    tokio::time::sleep(Duration::from_secs(11)).await;
    let result = attempt.await.expect("task");
    assert!(matches!(result, Err(AuthError::InteractionRequired)));

    let late = serde_json::json!({"type": "oauthCallback", "code": "xyz", "state": state});
    assert_eq!(harness.bus.deliver(WindowMessage::new(APP_ORIGIN, late)), 0);
    assert!(exchanger.calls().is_empty());
}

#[tokio::test]
async fn test_state_mismatch_is_invalid_callback() {
    let (harness, exchanger) = Harness::with_mock_exchanger();
    let attempt = harness.start_attempt();
    let state = query_param(&harness.frame_url().await, "state").expect("state");

    harness.provider_redirects_frame("code=xyz&state=someone-elses-state");

    let result = attempt.await.expect("task");
    assert!(matches!(
        result,
        Err(AuthError::CsrfOrExpiry { reason: CsrfReason::InvalidCallback })
    ));
    assert!(exchanger.calls().is_empty());
    assert!(!harness.store.contains(&state));
}

/// A message carrying the callback discriminator with fields of the wrong
/// type rejects the attempt instead of leaving it to time out.
#[tokio::test(start_paused = true)]
async fn test_malformed_callback_is_rejected_promptly() {
    let (harness, exchanger) = Harness::with_mock_exchanger();
    let attempt = harness.start_attempt();
    let state = query_param(&harness.frame_url().await, "state").expect("state");

    let malformed = serde_json::json!({"type": "oauthCallback", "code": 42, "state": 7});
    assert_eq!(harness.bus.deliver(WindowMessage::new(APP_ORIGIN, malformed)), 1);

    let result = tokio::time::timeout(Duration::from_secs(1), attempt)
        .await
        .expect("settled before the silent timeout")
        .expect("task");
    assert!(matches!(
        result,
        Err(AuthError::CsrfOrExpiry { reason: CsrfReason::InvalidCallback })
    ));
    assert!(exchanger.calls().is_empty());
    assert!(!harness.store.contains(&state));
    assert_eq!(harness.frames.mounted_count(), 0);
    assert_eq!(harness.bus.listener_count(), 0);
}

#[tokio::test]
async fn test_missing_pkce_entry_is_rejected() {
    let (harness, exchanger) = Harness::with_mock_exchanger();
    let attempt = harness.start_attempt();
    let state = query_param(&harness.frame_url().await, "state").expect("state");

    // Another consumer got there first
    harness.store.consume(&state).expect("entry present");
    harness.provider_redirects_frame(&format!("code=xyz&state={state}"));

    let result = attempt.await.expect("task");
    assert!(matches!(
        result,
        Err(AuthError::CsrfOrExpiry { reason: CsrfReason::PkceDataNotFound })
    ));
    assert!(exchanger.calls().is_empty());
}

#[tokio::test]
async fn test_other_provider_error_is_wrapped() {
    let (harness, _exchanger) = Harness::with_mock_exchanger();
    let attempt = harness.start_attempt();
    let state = query_param(&harness.frame_url().await, "state").expect("state");

    harness.provider_redirects_frame(&format!("error=login_required&state={state}"));

    match attempt.await.expect("task") {
        Err(AuthError::OAuth { error, .. }) => assert_eq!(error, "login_required"),
        other => panic!("expected OAuth error, got {other:?}"),
    }
    assert!(!harness.store.contains(&state));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_attempts_leave_no_listeners_or_frames() {
    let (harness, _exchanger) = Harness::with_mock_exchanger();

    for _ in 0..3 {
        let attempt = harness.start_attempt();
        harness.frame_url().await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(attempt.await.expect("task").is_err());
        assert_eq!(harness.bus.listener_count(), 0);
        assert_eq!(harness.frames.mounted_count(), 0);
    }
    assert_eq!(harness.frames.mounted_urls().len(), 3);
}

#[tokio::test]
async fn test_frame_mount_failure_cleans_up() {
    let (harness, _exchanger) = Harness::with_mock_exchanger();
    harness.frames.fail_mounts();

    let result = harness.silent.get_access_token_silently().await;
    assert!(matches!(result, Err(AuthError::Host(_))));
    assert_eq!(harness.bus.listener_count(), 0);
}

/// Interactive login round trip: redirect, top-level callback, bootstrap on
/// the application page exchanges the code and scrubs it from history.
#[tokio::test]
async fn test_interactive_round_trip() {
    init_tracing();
    let config = test_config();
    let store = PkceStore::in_memory();
    let exchanger = Arc::new(MockTokenExchanger::returning("tok-interactive"));
    let navigator = Arc::new(RecordingNavigator::new());

    let interactive =
        InteractiveRedirectController::new(&config, store.clone(), navigator.clone())
            .expect("valid config");
    let issued = interactive.redirect_to_login().expect("redirect");

    let dispatcher =
        CallbackDispatcher::new(&config, BrowsingContext::TopLevel(navigator.clone()))
            .expect("valid config");
    let callback_url =
        Url::parse(&format!("https://app/callback?code=c-1&state={}", issued.state)).expect("url");
    let DispatchOutcome::Redirected(app_url) = dispatcher.dispatch(&callback_url).expect("dispatch")
    else {
        panic!("top-level callback must redirect");
    };

    let silent = SilentAuthController::new(
        &config,
        store.clone(),
        exchanger.clone(),
        Arc::new(RecordingFrameHost::new()),
        MessageBus::new(),
    )
    .expect("valid config");
    let bootstrap = AuthBootstrap::new(
        &config,
        store.clone(),
        exchanger.clone(),
        silent,
        InteractiveRedirectController::new(&config, store.clone(), navigator.clone())
            .expect("valid config"),
        navigator.clone(),
        Arc::new(NoopStatusReporter),
    )
    .expect("valid config");

    let outcome = bootstrap.run(&app_url).await.expect("authenticated");
    assert_eq!(outcome, BootstrapOutcome::Authenticated(AccessToken::new("tok-interactive")));
    assert_eq!(exchanger.calls()[0].0, "c-1");
    assert!(!store.contains(&issued.state));

    let kinds: Vec<NavigationKind> = navigator.navigations().iter().map(|(k, _)| *k).collect();
    assert_eq!(
        kinds,
        [NavigationKind::Assign, NavigationKind::Replace, NavigationKind::ReplaceHistory]
    );

    // Reloading the scrubbed URL would not re-submit; replaying the code is
    // rejected because the entry is single-use.
    let replay = bootstrap.run(&app_url).await;
    assert!(matches!(replay, Err(AuthError::CsrfOrExpiry { .. })));
}
