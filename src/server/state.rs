//! Application state shared across all request handlers.
//!
//! This module defines the `AppState` struct which holds all shared resources and
//! dependencies needed by the request handlers. The state is initialized once during
//! startup and then cloned for each request handler through Axum's state extraction.

use sea_orm::DatabaseConnection;
use tokio::sync::watch;

use crate::server::{config::Environment, lifecycle::PoolState};

/// Application state containing shared resources and dependencies.
///
/// All fields are cheap to clone:
/// - `DatabaseConnection` is a connection pool (clones share the pool)
/// - `Environment` is `Copy`
/// - `watch::Receiver` is a reference-counted handle to the lifecycle's state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool for accessing persistent storage.
    ///
    /// The only shared mutable resource. Handlers borrow a connection per query and
    /// give it back when the query completes; the pool caps concurrent borrows.
    pub db: DatabaseConnection,

    /// Runtime mode, reported by the health endpoint.
    pub environment: Environment,

    /// Read side of the pool lifecycle, so handlers can report draining.
    pub pool_state: watch::Receiver<PoolState>,
}

impl AppState {
    /// Creates a new application state with the provided dependencies.
    ///
    /// # Arguments
    /// - `db` - Database connection pool
    /// - `environment` - Runtime mode from configuration
    /// - `pool_state` - Subscription to the pool lifecycle
    ///
    /// # Returns
    /// - `AppState` - Initialized application state ready for use
    pub fn new(
        db: DatabaseConnection,
        environment: Environment,
        pool_state: watch::Receiver<PoolState>,
    ) -> Self {
        Self {
            db,
            environment,
            pool_state,
        }
    }

    pub fn pool_state(&self) -> PoolState {
        *self.pool_state.borrow()
    }
}
