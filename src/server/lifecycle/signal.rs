//! Shutdown trigger sources.
//!
//! Every path that can end the process funnels into one `ShutdownTrigger` channel,
//! and `listen` turns the first message (or OS signal) into a single
//! `PoolLifecycle::shutdown` call.

use std::{fmt::Display, future::Future, sync::Arc};

use tokio::{sync::mpsc, task::JoinHandle};

use super::{DrainOutcome, DrainPool, PoolLifecycle, ShutdownTrigger};

/// Cloneable handle used to request a shutdown from anywhere in the process.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<ShutdownTrigger>,
    shutdown_on_task_failure: bool,
}

/// Receiving side of the trigger channel, consumed by `listen`.
pub struct TriggerReceiver {
    rx: mpsc::UnboundedReceiver<ShutdownTrigger>,
}

/// Creates the trigger channel.
///
/// # Arguments
/// - `shutdown_on_task_failure` - Whether `ShutdownHandle::task_failed` escalates to a
///   shutdown or only logs
pub fn trigger_channel(shutdown_on_task_failure: bool) -> (ShutdownHandle, TriggerReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ShutdownHandle {
            tx,
            shutdown_on_task_failure,
        },
        TriggerReceiver { rx },
    )
}

impl TriggerReceiver {
    /// Next requested trigger, or `None` once every handle is gone.
    pub async fn recv(&mut self) -> Option<ShutdownTrigger> {
        self.rx.recv().await
    }
}

impl ShutdownHandle {
    /// Requests a shutdown. Never blocks, safe to call from a panic hook.
    pub fn trigger(&self, trigger: ShutdownTrigger) {
        if self.tx.send(trigger).is_err() {
            tracing::debug!("Shutdown already underway, dropping {} trigger", trigger);
        }
    }

    /// Reports a failed background task, escalating if the policy says so.
    pub fn task_failed(&self, task: &str) {
        if self.shutdown_on_task_failure {
            self.trigger(ShutdownTrigger::TaskFailure);
        } else {
            tracing::warn!("Background task {} failed, continuing to serve", task);
        }
    }
}

/// Routes every panic in the process into a `Fault` trigger.
///
/// The previous hook still runs afterwards so the default panic message is kept.
/// Panics inside request handlers are additionally converted into a 500 response by
/// the router's panic layer; the hook fires first either way.
pub fn install_panic_hook(handle: ShutdownHandle) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("Uncaught fault: {}", info);
        handle.trigger(ShutdownTrigger::Fault);
        previous(info);
    }));
}

/// Spawns a background task whose failure counts as a shutdown trigger.
///
/// Both an `Err` result and a panic inside the task are reported through
/// `ShutdownHandle::task_failed`.
pub fn spawn_supervised<F, E>(handle: ShutdownHandle, name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::spawn(task).await {
            Ok(Ok(())) => tracing::debug!("Background task {} finished", name),
            Ok(Err(e)) => {
                tracing::error!("Background task {} failed: {}", name, e);
                handle.task_failed(name);
            }
            Err(e) => {
                tracing::error!("Background task {} aborted: {}", name, e);
                handle.task_failed(name);
            }
        }
    })
}

/// Waits for the first shutdown trigger and drains the pool.
///
/// Sources are SIGTERM, SIGINT and the trigger channel. Later triggers are not read;
/// anything that calls `PoolLifecycle::shutdown` directly afterwards gets the same
/// outcome without a second drain.
pub async fn listen<P: DrainPool>(
    lifecycle: Arc<PoolLifecycle<P>>,
    mut triggers: TriggerReceiver,
) -> DrainOutcome {
    let trigger = tokio::select! {
        _ = interrupt() => ShutdownTrigger::Interrupt,
        _ = terminate() => ShutdownTrigger::Terminate,
        Some(trigger) = triggers.recv() => trigger,
    };

    lifecycle.shutdown(trigger).await
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install SIGINT handler: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
