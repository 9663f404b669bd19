//! Termination signal handling.
//!
//! The coordinator waits for SIGINT or SIGTERM (ctrl-c on other platforms),
//! flushes the store once, and hands an [`ExitRequest`] back to the caller.
//! It never exits the process itself.

use enc_core::StoreEngine;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Exit status used after a termination signal.
pub const SIGNAL_EXIT_CODE: i32 = 1;

/// What `main` should do once a signal was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRequest {
    /// Name of the signal that was received.
    pub signal: &'static str,
    /// Process exit status.
    pub code: i32,
    /// Whether the final flush succeeded.
    pub flushed: bool,
}

/// Flushes the store on the first termination signal.
#[derive(Debug)]
pub struct SignalCoordinator;

impl SignalCoordinator {
    /// Spawns a task waiting for SIGINT or SIGTERM.
    ///
    /// The task resolves to an error only if the signal handlers cannot be
    /// registered.
    pub fn spawn(engine: Arc<StoreEngine>) -> JoinHandle<io::Result<ExitRequest>> {
        Self::spawn_with(engine, wait_for_shutdown_signal())
    }

    /// Spawns a coordinator woken by an arbitrary trigger.
    pub fn spawn_with<F>(engine: Arc<StoreEngine>, trigger: F) -> JoinHandle<io::Result<ExitRequest>>
    where
        F: Future<Output = io::Result<&'static str>> + Send + 'static,
    {
        tokio::spawn(async move {
            let signal = trigger.await?;
            Ok(Self::handle(engine, signal).await)
        })
    }

    /// Performs the final flush for a received signal.
    ///
    /// A flush failure is logged; the exit request is returned regardless.
    pub async fn handle(engine: Arc<StoreEngine>, signal: &'static str) -> ExitRequest {
        info!(signal, "received termination signal, flushing store");

        let flushed = match tokio::task::spawn_blocking(move || engine.flush()).await {
            Ok(Ok(())) => {
                info!("store flushed before exit");
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "final flush failed");
                false
            }
            Err(e) => {
                error!(error = %e, "final flush task failed");
                false
            }
        };

        ExitRequest {
            signal,
            code: SIGNAL_EXIT_CODE,
            flushed,
        }
    }
}

/// Waits for SIGTERM or SIGINT and returns its name.
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        Ok(name)
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("ctrl-c")
    }
}
