use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{SecondsFormat, Utc};

use crate::{model::api::HealthDto, server::state::AppState};

/// GET /health - Liveness probe
///
/// Never touches the database, so it answers even while the pool is exhausted.
/// Excluded from request logging.
///
/// # Returns
/// - `200 OK`: `{"status": "ok", "env": <runtime mode>, "timestamp": <RFC 3339>}`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthDto {
            status: "ok".to_string(),
            env: state.environment.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    )
}
