use std::any::Any;

use axum::response::{IntoResponse, Response};

use crate::server::error::AppError;

pub const NOT_FOUND_MESSAGE: &str = "Route not found";

/// Catch-all for any path no router matched.
pub async fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND_MESSAGE.to_string())
}

/// Converts a panic inside a handler into the generic error envelope.
///
/// The process-wide panic hook has already logged the fault and requested shutdown
/// by the time this runs; this only decides what the client sees.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };

    AppError::InternalError(format!("Request handler panicked: {}", detail)).into_response()
}
