//! Response readers for router tests.

use axum::{body::to_bytes, response::Response};
use serde_json::Value;

/// Reads the full response body and parses it as JSON.
///
/// Panics if the body isn't valid JSON, which fails the calling test.
pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");

    serde_json::from_slice(&bytes).expect("response body should be JSON")
}
