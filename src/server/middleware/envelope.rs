use axum::{
    body::to_bytes,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};

use crate::{model::api::ErrorDto, server::error::AppError};

/// Message sent with 429 once a client exhausts its window.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Message sent with 413 when a body exceeds the configured limit.
pub const BODY_TOO_LARGE_MESSAGE: &str = "Request entity too large";

/// Plain-text bodies longer than this are not carried into the envelope.
const DETAIL_LIMIT: usize = 4 * 1024;

/// Rewrites plain-text error responses into the JSON error envelope.
///
/// Handlers already answer with `AppError`, but the rate limiter and axum's extractor
/// rejections (malformed or oversized bodies) write their own text bodies. Successful
/// responses and responses that are already JSON pass through untouched. Headers set
/// by the producing layer, such as `retry-after` on 429, are kept.
///
/// # Returns
/// - 400 - `AppError::BadRequest` carrying the rejection text
/// - 5xx - `AppError::InternalError`, client sees the generic message
/// - Any other 4xx - same status, envelope with a fixed or rejection-text message
pub async fn json_error_envelope(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let detail = match to_bytes(body, DETAIL_LIMIT).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    };

    if status.is_server_error() {
        return AppError::InternalError(detail).into_response();
    }

    let message = match status {
        StatusCode::TOO_MANY_REQUESTS => RATE_LIMITED_MESSAGE.to_string(),
        StatusCode::PAYLOAD_TOO_LARGE => BODY_TOO_LARGE_MESSAGE.to_string(),
        _ if !detail.is_empty() => detail,
        _ => status.canonical_reason().unwrap_or("Request failed").to_string(),
    };

    if status == StatusCode::BAD_REQUEST {
        return AppError::BadRequest(message).into_response();
    }

    parts.headers.remove(CONTENT_TYPE);
    parts.headers.remove(CONTENT_LENGTH);

    (parts, Json(ErrorDto::new(message))).into_response()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}
