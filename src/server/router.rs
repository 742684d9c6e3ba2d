//! HTTP composition: middleware stack, route mounting and fallbacks.
//!
//! Layers run outermost first:
//!
//! 1. Security headers
//! 2. CORS for the configured frontend origin
//! 3. Request body limit
//! 4. Request logging (not applied to `/health`)
//! 5. Error envelope - plain-text rejections from the layers below become JSON
//! 6. Panic catcher - a panicking handler becomes a 500 error envelope
//! 7. Per-client rate limit on everything under `/api`

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    middleware::map_response,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    routing::get,
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, HttpMakeClassifier, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::server::{
    controller::{
        fallback::{handle_panic, not_found},
        health::health,
        status::status,
    },
    lifecycle::{
        signal::{spawn_supervised, ShutdownHandle},
        PoolState,
    },
    middleware::{client_ip::ProxyHopKeyExtractor, envelope::json_error_envelope},
    state::AppState,
};

#[cfg(test)]
mod test;

/// JSON and form bodies above this size are rejected with 413.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Requests allowed per client in one window.
pub const RATE_LIMIT_BURST: u32 = 100;
/// One request is replenished every 9 s, i.e. 100 per 15 minutes.
pub const RATE_LIMIT_REPLENISH: Duration = Duration::from_secs(9);
const RATE_LIMIT_CLEANUP: Duration = Duration::from_secs(60);

/// Response headers applied when a handler hasn't set them already.
///
/// Cross-origin resource policy is relaxed to `cross-origin` so the frontend and
/// storage hosts on other origins can embed API responses.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;form-action 'self';\
         frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';\
         script-src-attr 'none';style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "cross-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Settings the router needs beyond `AppState`.
pub struct RouterSettings {
    /// Only origin allowed by CORS.
    pub frontend_url: HeaderValue,
    /// Used to supervise the rate limiter's cleanup task.
    pub shutdown: ShutdownHandle,
}

/// Routes mounted under `/api`.
///
/// Resource routers (auth, events, ministries, prayer, contact, newsletter, admin,
/// users, resources, media, members, blogs) are merged here by their owners.
pub fn api_router() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

/// Builds the complete application.
///
/// # Arguments
/// - `state` - Shared state injected into every handler
/// - `settings` - CORS origin and shutdown handle
/// - `api` - Router nested under `/api` behind the rate limiter
pub fn router(state: AppState, settings: RouterSettings, api: Router<AppState>) -> Router {
    let verbose = state.environment.is_development();
    let api = rate_limited(api, &state, settings.shutdown);

    let app = Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(map_response(json_error_envelope))
        .layer(request_logging(verbose))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors(settings.frontend_url));

    security_headers(app).with_state(state)
}

fn cors(frontend_url: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([frontend_url]))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

fn security_headers(router: Router<AppState>) -> Router<AppState> {
    SECURITY_HEADERS.iter().fold(router, |router, &(name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

/// Request logging, with headers included in development.
fn request_logging(verbose: bool) -> TraceLayer<HttpMakeClassifier> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(level).include_headers(verbose))
        .on_request(DefaultOnRequest::new().level(level))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}

/// Puts the per-client rate limiter in front of `api`.
///
/// Clients are keyed by the address the trusted proxy appended to `X-Forwarded-For`,
/// falling back to the peer address. Limiter storage is pruned by a supervised background task that
/// stops once the pool starts draining.
fn rate_limited(
    api: Router<AppState>,
    state: &AppState,
    shutdown: ShutdownHandle,
) -> Router<AppState> {
    let Some(config) = GovernorConfigBuilder::default()
        .period(RATE_LIMIT_REPLENISH)
        .burst_size(RATE_LIMIT_BURST)
        .key_extractor(ProxyHopKeyExtractor)
        .use_headers()
        .finish()
    else {
        tracing::warn!("Rate limiter quota is invalid, serving /api without rate limiting");
        return api;
    };

    let limiter = config.limiter().clone();
    let mut pool_state = state.pool_state.clone();
    spawn_supervised(shutdown, "rate-limit-cleanup", async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    limiter.retain_recent();
                    tracing::trace!(clients = limiter.len(), "Pruned rate limiter storage");
                }
                changed = pool_state.changed() => {
                    if changed.is_err() || *pool_state.borrow() != PoolState::Open {
                        break;
                    }
                }
            }
        }
        Ok::<(), Infallible>(())
    });

    api.layer(GovernorLayer::new(Arc::new(config)))
}
