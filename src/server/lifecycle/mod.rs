//! Connection pool lifecycle management.
//!
//! `PoolLifecycle` owns the shared pool handle for the lifetime of the process and
//! guarantees that it is drained at most once, whichever termination path fires first.
//!
//! # States
//!
//! ```text
//! Open ──trigger──▶ Draining ──drain ok──▶ Closed  (exit 0)
//!                            └─drain err─▶ Failed  (exit 1)
//! ```
//!
//! The manager is constructed from an already open pool, so the uninitialized state is
//! simply "no manager yet". Nothing leaves `Closed` or `Failed`.
//!
//! Triggers are collected by the `signal` module: termination and interrupt signals,
//! panics anywhere in the process, and failures of supervised background tasks.

pub mod signal;


use std::{fmt, future::Future, process::ExitCode};

use sea_orm::{DatabaseConnection, DbErr};
use tokio::sync::watch;

/// Observable state of the shared pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolState {
    /// Pool accepts borrows.
    Open,
    /// A trigger fired and the drain is in progress.
    Draining,
    /// Drain completed.
    Closed,
    /// Drain itself returned an error.
    Failed,
}

impl PoolState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Draining => "draining",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

/// Event that starts the shutdown sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// SIGTERM from the process supervisor.
    Terminate,
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// A panic escaped somewhere in the process.
    Fault,
    /// A supervised background task returned an error or aborted.
    TaskFailure,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Terminate => "SIGTERM",
            Self::Interrupt => "SIGINT",
            Self::Fault => "uncaught fault",
            Self::TaskFailure => "background task failure",
        };
        f.write_str(name)
    }
}

/// Result of the one and only drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    Closed,
    Failed,
}

impl DrainOutcome {
    /// Process exit status for this outcome.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Failed => 1,
        }
    }
}

impl From<DrainOutcome> for ExitCode {
    fn from(outcome: DrainOutcome) -> Self {
        ExitCode::from(outcome.exit_status())
    }
}

impl From<DrainOutcome> for PoolState {
    fn from(outcome: DrainOutcome) -> Self {
        match outcome {
            DrainOutcome::Closed => PoolState::Closed,
            DrainOutcome::Failed => PoolState::Failed,
        }
    }
}

/// A pool that can be closed through a shared reference.
///
/// Closing releases idle connections, waits for borrowed ones to come back, and makes
/// every later borrow fail.
pub trait DrainPool: Send + Sync + 'static {
    fn drain(&self) -> impl Future<Output = Result<(), DbErr>> + Send;
}

impl DrainPool for DatabaseConnection {
    fn drain(&self) -> impl Future<Output = Result<(), DbErr>> + Send {
        self.close_by_ref()
    }
}

/// Owner of the shared pool's shutdown.
///
/// Shared behind an `Arc` between the trigger listener, the HTTP server's graceful
/// shutdown future and `main`. Request handlers never see it; they only get a
/// `watch::Receiver<PoolState>` through `AppState`.
pub struct PoolLifecycle<P = DatabaseConnection> {
    pool: P,
    state: watch::Sender<PoolState>,
}

impl<P: DrainPool> PoolLifecycle<P> {
    /// Takes ownership of an open pool.
    pub fn new(pool: P) -> Self {
        let (state, _) = watch::channel(PoolState::Open);
        Self { pool, state }
    }

    pub fn state(&self) -> PoolState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PoolState> {
        self.state.subscribe()
    }

    /// Resolves once a trigger has moved the pool out of `Open`.
    pub async fn draining(&self) {
        let mut state = self.state.subscribe();
        // Sender lives in `self`, so the channel can't close while we wait.
        let _ = state.wait_for(|s| *s != PoolState::Open).await;
    }

    /// Drains the pool exactly once.
    ///
    /// The first caller moves the state from `Open` to `Draining` atomically and runs the
    /// drain. Any caller arriving afterwards, concurrently or later, performs no drain of
    /// its own and waits for the first caller's outcome.
    ///
    /// # Arguments
    /// - `trigger` - What asked for the shutdown, for logging
    ///
    /// # Returns
    /// - `DrainOutcome::Closed` - Pool closed cleanly
    /// - `DrainOutcome::Failed` - Pool close returned an error (not retried)
    pub async fn shutdown(&self, trigger: ShutdownTrigger) -> DrainOutcome {
        let first = self.state.send_if_modified(|state| {
            if *state == PoolState::Open {
                *state = PoolState::Draining;
                true
            } else {
                false
            }
        });

        if !first {
            tracing::info!("Received {} while already shutting down, ignoring", trigger);
            return self.outcome().await;
        }

        tracing::warn!("Received {}. Closing database pool...", trigger);

        let outcome = match self.pool.drain().await {
            Ok(()) => {
                tracing::info!("Database pool closed");
                DrainOutcome::Closed
            }
            Err(e) => {
                tracing::error!("Error during database shutdown: {}", e);
                DrainOutcome::Failed
            }
        };

        self.state.send_replace(outcome.into());

        outcome
    }

    /// Waits for the terminal state set by whoever is draining.
    async fn outcome(&self) -> DrainOutcome {
        let mut state = self.state.subscribe();
        let terminal = state.wait_for(PoolState::is_terminal).await.map(|s| *s);

        match terminal {
            Ok(PoolState::Closed) => DrainOutcome::Closed,
            _ => DrainOutcome::Failed,
        }
    }
}
