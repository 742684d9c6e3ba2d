use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::net::TcpListener;
use tracing_subscriber::{
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use crate::server::{
    config::{Config, Environment},
    database,
    error::AppError,
    lifecycle::{
        signal::{self, trigger_channel},
        DrainOutcome, PoolLifecycle, ShutdownTrigger,
    },
    router::{self, RouterSettings},
    state::AppState,
};

/// How long in-flight requests get to finish once the pool has been drained.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Development uses the multi-line
/// pretty format, production the compact single-line one.
pub fn init_tracing(environment: Environment) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if environment.is_development() {
        builder.pretty().finish().try_init()
    } else {
        builder.with_target(false).compact().finish().try_init()
    }
}

/// Runs the service from an already validated configuration until shutdown.
///
/// Opens the single shared pool, hands it to the lifecycle manager, wires every
/// shutdown trigger and only then binds the listener. Returns once the pool has been
/// drained.
///
/// # Returns
/// - `Ok(DrainOutcome)` - Shutdown ran; the outcome decides the exit code
/// - `Err(AppError)` - The pool could not be opened or the listener could not bind
pub async fn run(config: Config) -> Result<DrainOutcome, AppError> {
    let db = database::connect(&config).await?;

    let lifecycle = Arc::new(PoolLifecycle::new(db.clone()));
    let (shutdown, triggers) = trigger_channel(config.shutdown_on_task_failure);
    signal::install_panic_hook(shutdown.clone());
    let drained = tokio::spawn(signal::listen(lifecycle.clone(), triggers));

    let state = AppState::new(db, config.environment, lifecycle.subscribe());
    let app = router::router(
        state,
        RouterSettings {
            frontend_url: config.frontend_url.clone(),
            shutdown: shutdown.clone(),
        },
        router::api_router(),
    );

    let listener = match TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            lifecycle.shutdown(ShutdownTrigger::Fault).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        "Server listening on {} ({})",
        config.bind_addr,
        config.environment
    );

    let server_lifecycle = lifecycle.clone();
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { server_lifecycle.draining().await })
        .await;

        if let Err(e) = result {
            tracing::error!("Server error: {}", e);
            server_shutdown.trigger(ShutdownTrigger::Fault);
        }
    });

    let outcome = match drained.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Shutdown listener aborted: {}", e);
            lifecycle.shutdown(ShutdownTrigger::Fault).await
        }
    };

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(_) => tracing::info!(pool = lifecycle.state().as_str(), "Server stopped"),
        Err(_) => tracing::warn!(
            "Server did not stop within {}s, exiting with requests in flight",
            SHUTDOWN_GRACE.as_secs()
        ),
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that the global subscriber is installed at most once per process.
    ///
    /// Expected: a second install reports `TryInitError` instead of panicking
    #[test]
    fn tracing_installs_once() {
        let _ = init_tracing(Environment::Development);

        assert!(init_tracing(Environment::Production).is_err());
    }
}
