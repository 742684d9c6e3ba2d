use std::sync::Arc;

use axum::{
    http::{header, Method, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::DateTime;
use serde_json::{json, Value};
use test_utils::{
    builder::TestBuilder,
    context::TestContext,
    request::{get as get_request, get_from, post_json, DEFAULT_CLIENT_IP},
    response::json_body,
};
use tower::ServiceExt;

use super::{api_router, router, RouterSettings, BODY_LIMIT_BYTES, RATE_LIMIT_BURST};
use crate::server::{
    config::Environment,
    error::{INTERNAL_ERROR_MESSAGE, UNAVAILABLE_MESSAGE},
    lifecycle::{
        signal::{install_panic_hook, listen, trigger_channel, ShutdownHandle, TriggerReceiver},
        DrainOutcome, PoolLifecycle, PoolState, ShutdownTrigger,
    },
    middleware::envelope::{BODY_TOO_LARGE_MESSAGE, RATE_LIMITED_MESSAGE},
    state::AppState,
};

const FRONTEND: &str = "https://gracechapel.org";

/// Fully wired application over an in-memory pool.
struct TestApp {
    app: Router,
    lifecycle: Arc<PoolLifecycle>,
    shutdown: ShutdownHandle,
    triggers: TriggerReceiver,
    _test: TestContext,
}

async fn test_app(api: Router<AppState>) -> TestApp {
    let test = TestBuilder::new().build().await.unwrap();
    let db = test.db.clone().unwrap();

    let lifecycle = Arc::new(PoolLifecycle::new(db.clone()));
    let (shutdown, triggers) = trigger_channel(true);
    let state = AppState::new(db, Environment::Production, lifecycle.subscribe());

    let app = router(
        state,
        RouterSettings {
            frontend_url: FRONTEND.parse().unwrap(),
            shutdown: shutdown.clone(),
        },
        api,
    );

    TestApp {
        app,
        lifecycle,
        shutdown,
        triggers,
        _test: test,
    }
}

async fn send(app: &Router, request: Request<axum::body::Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

/// Tests the liveness endpoint.
///
/// Expected: 200 with status "ok", the runtime mode and an RFC 3339 timestamp
#[tokio::test]
async fn health_reports_ok() {
    let test = test_app(api_router()).await;

    let response = send(&test.app, get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["env"], "production");
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
}

/// Tests the catch-all for unknown paths.
///
/// Expected: 404 with exactly `{"success": false, "message": "Route not found"}`
#[tokio::test]
async fn unknown_route_returns_not_found_envelope() {
    let test = test_app(api_router()).await;

    let response = send(&test.app, get_request("/sermons/latest")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body, json!({"success": false, "message": "Route not found"}));
}

#[tokio::test]
async fn unknown_api_route_returns_not_found_envelope() {
    let test = test_app(api_router()).await;

    let response = send(&test.app, get_from("/api/sermons", DEFAULT_CLIENT_IP)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let test = test_app(api_router()).await;

    let response = send(&test.app, get_request("/health")).await;
    let headers = response.headers();

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["cross-origin-resource-policy"], "cross-origin");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("strict-transport-security"));
}

/// Tests a CORS preflight from the configured frontend.
///
/// Expected: origin echoed back with credentials allowed
#[tokio::test]
async fn cors_preflight_allows_frontend() {
    let test = test_app(api_router()).await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/status")
        .header(header::ORIGIN, FRONTEND)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&test.app, request).await;

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn cors_ignores_other_origins() {
    let test = test_app(api_router()).await;

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&test.app, request).await;

    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

/// Tests the database status endpoint while the pool is open.
///
/// Expected: 200 with database "up" and pool "open"
#[tokio::test]
async fn status_pings_database() {
    let test = test_app(api_router()).await;

    let response = send(&test.app, get_from("/api/status", DEFAULT_CLIENT_IP)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["database"], "up");
    assert_eq!(body["pool"], "open");
}

/// Tests borrowing after the pool has been drained.
///
/// Expected: 503 envelope, health keeps answering
#[tokio::test]
async fn status_after_drain_is_unavailable() {
    let test = test_app(api_router()).await;

    let outcome = test.lifecycle.shutdown(ShutdownTrigger::Terminate).await;
    assert_eq!(outcome, DrainOutcome::Closed);

    let response = send(&test.app, get_from("/api/status", DEFAULT_CLIENT_IP)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], UNAVAILABLE_MESSAGE);

    let response = send(&test.app, get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Tests the per-client rate limit on `/api`.
///
/// Expected: the request after the burst is rejected with 429, other clients and
/// `/health` are unaffected
#[tokio::test]
async fn api_is_rate_limited_per_client() {
    let api = api_router().route("/ping", get(|| async { "pong" }));
    let test = test_app(api).await;

    for _ in 0..RATE_LIMIT_BURST {
        let response = send(&test.app, get_from("/api/ping", "198.51.100.20")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = send(&test.app, get_from("/api/ping", "198.51.100.20")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], RATE_LIMITED_MESSAGE);

    let response = send(&test.app, get_from("/api/ping", "198.51.100.21")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&test.app, get_from("/health", "198.51.100.20")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Tests that rewriting the client-controlled part of `X-Forwarded-For` doesn't
/// reset the limit.
///
/// Expected: requests sharing the proxy's hop are limited together, request 101 is
/// rejected with 429
#[tokio::test]
async fn rate_limit_ignores_spoofed_forwarded_entries() {
    let api = api_router().route("/ping", get(|| async { "pong" }));
    let test = test_app(api).await;

    for i in 0..RATE_LIMIT_BURST {
        let forwarded = format!("10.0.{}.{}, 198.51.100.30", i / 256, i % 256);
        let response = send(&test.app, get_from("/api/ping", &forwarded)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = send(&test.app, get_from("/api/ping", "10.9.9.9, 198.51.100.30")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

/// Tests the 10 MiB body limit.
///
/// Expected: 413 with the JSON envelope
#[tokio::test]
async fn oversized_body_is_rejected() {
    let api = api_router().route(
        "/contact",
        post(|Json(body): Json<Value>| async move { Json(body) }),
    );
    let test = test_app(api).await;

    let small = json!({"name": "Ruth", "message": "Thank you for the retreat"}).to_string();
    let response = send(&test.app, post_json("/api/contact", small)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let oversized = format!("{{\"message\":\"{}\"}}", "a".repeat(BODY_LIMIT_BYTES + 1));
    let response = send(&test.app, post_json("/api/contact", oversized)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], BODY_TOO_LARGE_MESSAGE);
}

#[tokio::test]
async fn malformed_json_returns_envelope() {
    let api = api_router().route(
        "/contact",
        post(|Json(body): Json<Value>| async move { Json(body) }),
    );
    let test = test_app(api).await;

    let response = send(&test.app, post_json("/api/contact", "{\"name\": ")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

/// Tests a panic inside a request handler.
///
/// The client gets the generic error envelope and the panic is routed into the
/// shutdown sequence, which drains the pool once.
///
/// Expected: 500 generic envelope, Closed outcome, further triggers ignored
#[tokio::test]
async fn handler_panic_returns_generic_error_and_shuts_down() {
    let api = api_router().route(
        "/prayer",
        get(|| async {
            if true {
                panic!("prayer wall index out of range");
            }
            "unreachable"
        }),
    );
    let test = test_app(api).await;
    let previous_hook = std::panic::take_hook();
    install_panic_hook(test.shutdown.clone());

    let response = send(&test.app, get_from("/api/prayer", DEFAULT_CLIENT_IP)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);

    let outcome = listen(test.lifecycle.clone(), test.triggers).await;
    assert_eq!(outcome, DrainOutcome::Closed);
    assert_eq!(test.lifecycle.state(), PoolState::Closed);

    test.shutdown.trigger(ShutdownTrigger::Fault);
    let again = test.lifecycle.shutdown(ShutdownTrigger::Fault).await;
    assert_eq!(again, DrainOutcome::Closed);

    // Hook from `install_panic_hook` chains to the default one taken above
    std::panic::set_hook(previous_hook);
}
