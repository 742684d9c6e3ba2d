//! Request constructors for router tests.

use axum::{body::Body, http::Request};

/// Header the rate limiter reads the client address from.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Address used by requests that don't pick their own client.
pub const DEFAULT_CLIENT_IP: &str = "203.0.113.7";

/// `GET` request without a client address.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("static request parts are valid")
}

/// `GET` request that appears to come from `client_ip` through a proxy.
pub fn get_from(uri: &str, client_ip: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(FORWARDED_FOR, client_ip)
        .body(Body::empty())
        .expect("static request parts are valid")
}

/// `POST` request with a JSON body from the default client.
pub fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(FORWARDED_FOR, DEFAULT_CLIENT_IP)
        .body(body.into())
        .expect("static request parts are valid")
}
