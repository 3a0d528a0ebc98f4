//! Integration tests for the session monitor
//!
//! Activity events are fired through `ManualActivityTarget`; the session
//! endpoints are served by `wiremock` or scripted with `MockSessionApi`.

use std::sync::Arc;
use std::time::Duration;

use url::Url;
use webgate_common::auth::{
    ActivityEvent, AuthBootstrap, AuthConfig, BootstrapOutcome, CheckOutcome, HttpSessionApi,
    InteractiveRedirectController, MessageBus, NoopStatusReporter, PkceEntry, PkceStore,
    SessionApi, SessionMonitor, SilentAuthController,
};
use webgate_common::testing::{
    test_config, wait_until, ManualActivityTarget, MockClock, MockSessionApi, MockTokenExchanger,
    RecordingFrameHost, RecordingNavigator,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTERVAL: Duration = Duration::from_secs(60);

struct Monitored {
    monitor: Arc<SessionMonitor>,
    navigator: Arc<RecordingNavigator>,
    activity: Arc<ManualActivityTarget>,
    clock: MockClock,
}

fn monitored(config: &AuthConfig, api: Arc<dyn SessionApi>) -> Monitored {
    let navigator = Arc::new(RecordingNavigator::new());
    let activity = Arc::new(ManualActivityTarget::new());
    let clock = MockClock::new();
    let monitor = SessionMonitor::with_clock(
        config,
        api,
        navigator.clone(),
        activity.clone(),
        Arc::new(clock.clone()),
    )
    .expect("valid config");
    Monitored { monitor, navigator, activity, clock }
}

fn config_for(server: &MockServer) -> AuthConfig {
    AuthConfig::new(
        "abc",
        "https://app/callback",
        server.uri(),
        "https://idp/authorize",
        "https://idp/token",
    )
    .with_session_check_interval(INTERVAL)
}

async fn mount_validate(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/session/validate"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// N activity events inside one interval cause a single validation call.
#[tokio::test]
async fn test_activity_burst_triggers_one_validation() {
    let api = Arc::new(MockSessionApi::valid());
    let m = monitored(&test_config().with_session_check_interval(INTERVAL), api.clone());
    m.monitor.attach().expect("attach");

    for event in ActivityEvent::ALL.iter().cycle().take(50) {
        m.activity.fire(*event);
    }

    assert!(wait_until(Duration::from_secs(1), || api.validate_calls() == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(api.validate_calls(), 1);
}

/// Two events more than one interval apart cause two validation calls.
#[tokio::test]
async fn test_spaced_activity_triggers_two_validations() {
    let api = Arc::new(MockSessionApi::valid());
    let m = monitored(&test_config().with_session_check_interval(INTERVAL), api.clone());
    m.monitor.attach().expect("attach");

    m.activity.fire(ActivityEvent::PointerDown);
    assert!(wait_until(Duration::from_secs(1), || api.validate_calls() == 1).await);

    m.clock.advance(INTERVAL + Duration::from_secs(1));
    m.activity.fire(ActivityEvent::KeyDown);
    assert!(wait_until(Duration::from_secs(1), || api.validate_calls() == 2).await);
}

#[tokio::test]
async fn test_detached_monitor_ignores_activity() {
    let api = Arc::new(MockSessionApi::valid());
    let m = monitored(&test_config(), api.clone());
    m.monitor.attach().expect("attach");
    m.monitor.detach();

    m.activity.fire(ActivityEvent::Scroll);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(api.validate_calls(), 0);
}

#[tokio::test]
async fn test_valid_session_over_http() {
    let server = MockServer::start().await;
    mount_validate(&server, ResponseTemplate::new(200).set_body_json(serde_json::json!({"valid": true})))
        .await;
    let config = config_for(&server);
    let api = Arc::new(HttpSessionApi::new(&config).expect("client"));

    assert!(api.validate().await.expect("answered"));
    let m = monitored(&config, api);
    assert_eq!(m.monitor.check().await, CheckOutcome::Valid);
    assert_eq!(m.navigator.reload_count(), 0);
}

/// `{valid: false}` triggers the logout call, detaches, and reloads.
#[tokio::test]
async fn test_invalid_session_logs_out_and_reloads() {
    let server = MockServer::start().await;
    mount_validate(&server, ResponseTemplate::new(200).set_body_json(serde_json::json!({"valid": false})))
        .await;
    Mock::given(method("POST"))
        .and(path("/session/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let m = monitored(&config, Arc::new(HttpSessionApi::new(&config).expect("client")));
    m.monitor.attach().expect("attach");

    m.activity.fire(ActivityEvent::Focus);
    let navigator = Arc::clone(&m.navigator);
    assert!(wait_until(Duration::from_secs(2), || navigator.reload_count() == 1).await);
    assert!(!m.monitor.is_attached());
    assert_eq!(m.activity.listener_count(), 0);
}

#[tokio::test]
async fn test_missing_valid_field_is_invalid() {
    let server = MockServer::start().await;
    mount_validate(&server, ResponseTemplate::new(200).set_body_json(serde_json::json!({}))).await;
    let config = config_for(&server);
    let api = HttpSessionApi::new(&config).expect("client");

    assert!(!api.validate().await.expect("answered"));
}

/// A validate endpoint that stalls is cut off by the client's request
/// timeout and the monitor fails closed.
#[tokio::test]
async fn test_stalled_validate_endpoint_fails_closed() {
    let server = MockServer::start().await;
    mount_validate(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"valid": true}))
            .set_delay(Duration::from_secs(10)),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/session/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let config = config_for(&server).with_request_timeout(Duration::from_millis(200));
    let m = monitored(&config, Arc::new(HttpSessionApi::new(&config).expect("client")));

    let started = std::time::Instant::now();
    assert_eq!(m.monitor.check().await, CheckOutcome::Invalidated);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(m.navigator.reload_count(), 1);
}

/// Current behaviour, possibly undesirable: a server error on the validate
/// endpoint is not retried and logs the user out as if the session expired.
#[tokio::test]
async fn test_validate_server_error_fails_closed() {
    let server = MockServer::start().await;
    mount_validate(&server, ResponseTemplate::new(503)).await;
    Mock::given(method("POST"))
        .and(path("/session/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let m = monitored(&config, Arc::new(HttpSessionApi::new(&config).expect("client")));

    assert_eq!(m.monitor.check().await, CheckOutcome::Invalidated);
    assert_eq!(m.navigator.reload_count(), 1);
}

/// Current behaviour, possibly undesirable: an unreachable provider is
/// indistinguishable from an expired session.
#[tokio::test]
async fn test_unreachable_provider_fails_closed() {
    let config = AuthConfig::new(
        "abc",
        "https://app/callback",
        "http://127.0.0.1:9",
        "https://idp/authorize",
        "https://idp/token",
    );
    let m = monitored(&config, Arc::new(HttpSessionApi::new(&config).expect("client")));

    assert_eq!(m.monitor.check().await, CheckOutcome::Invalidated);
    assert_eq!(m.navigator.reload_count(), 1);
}

#[tokio::test]
async fn test_force_logout() {
    let api = Arc::new(MockSessionApi::valid());
    let m = monitored(&test_config(), api.clone());
    m.monitor.attach().expect("attach");

    m.monitor.force_logout().await;
    assert_eq!(api.logout_calls(), 1);
    assert_eq!(m.navigator.reload_count(), 1);
    assert!(!m.monitor.is_attached());
}

/// A successful bootstrap attaches the configured monitor.
#[tokio::test]
async fn test_bootstrap_attaches_monitor_after_login() {
    let config = test_config();
    let store = PkceStore::in_memory();
    store
        .save("s1", &PkceEntry { verifier: "v".repeat(64), challenge: "c".repeat(43) })
        .expect("saved");
    let exchanger = Arc::new(MockTokenExchanger::returning("tok123"));
    let navigator = Arc::new(RecordingNavigator::new());
    let m = monitored(&config, Arc::new(MockSessionApi::valid()));

    let silent = SilentAuthController::new(
        &config,
        store.clone(),
        exchanger.clone(),
        Arc::new(RecordingFrameHost::new()),
        MessageBus::new(),
    )
    .expect("valid config");
    let interactive = InteractiveRedirectController::new(&config, store.clone(), navigator.clone())
        .expect("valid config");
    let bootstrap = AuthBootstrap::new(
        &config,
        store,
        exchanger,
        silent,
        interactive,
        navigator,
        Arc::new(NoopStatusReporter),
    )
    .expect("valid config")
    .with_session_monitor(Arc::clone(&m.monitor));

    let outcome = bootstrap
        .run(&Url::parse("https://app/?code=xyz&state=s1").expect("url"))
        .await
        .expect("authenticated");

    assert!(matches!(outcome, BootstrapOutcome::Authenticated(_)));
    assert!(m.monitor.is_attached());
    assert_eq!(m.activity.listener_count(), 1);
}
