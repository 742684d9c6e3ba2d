use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sea_orm::{ConnAcquireErr, DbErr};

use crate::{
    model::api::StatusDto,
    server::{error::AppError, lifecycle::PoolState, state::AppState},
};

/// GET /api/status - Database reachability
///
/// Borrows a pooled connection and pings the database with it, so the response
/// reflects what any other handler would get from the pool right now.
///
/// # Returns
/// - `200 OK`: `{"success": true, "database": "up", "pool": <lifecycle state>}`
/// - `503 Service Unavailable`: No connection could be borrowed before the acquire
///   timeout, or the pool has been drained
/// - `500 Internal Server Error`: The ping itself failed
pub async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let pool = state.pool_state();
    if pool != PoolState::Open {
        return Err(DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed).into());
    }

    state.db.ping().await?;

    Ok((
        StatusCode::OK,
        Json(StatusDto {
            success: true,
            database: "up".to_string(),
            pool: pool.as_str().to_string(),
        }),
    ))
}
