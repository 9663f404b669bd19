//! Long-running daemon mode.

use crate::boot::{self, BootError};
use crate::Cli;
use enc_server::{
    ensure_certificate, fingerprint, BackupService, ExitRequest, ExpiryWatch, Route, Scheduler,
    ServerContext, SignalCoordinator, TlsPaths,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Boots the store and background services, then waits for a signal.
///
/// Returns the exit request produced by the signal coordinator.
pub async fn run(cli: &Cli) -> Result<Option<ExitRequest>, BootError> {
    let config = boot::load_config(cli)?;
    let engine = boot::engine(&config)?;
    let signals = SignalCoordinator::spawn(Arc::clone(&engine));

    boot::setup(&engine).await?;

    let tls = TlsPaths::new(&config.certificate, &config.key).with_hosts(config.hosts.clone());
    let tls_fingerprint = tokio::task::spawn_blocking(move || {
        ensure_certificate(&tls)?;
        fingerprint(&tls.certificate)
    })
    .await??;
    info!("TLS certificate fingerprint is {tls_fingerprint}");

    let ctx = ServerContext::new(Arc::clone(&engine), config).with_fingerprint(tls_fingerprint);
    let mut loops = Vec::new();

    if ctx.config.scheduler.enabled {
        debug!(
            "Starting scheduler with a period of {}s ...",
            ctx.config.scheduler.period
        );
        let mut scheduler = Scheduler::new("scheduler", ctx.config.scheduler_period())?;
        scheduler.register(Arc::new(ExpiryWatch::new()));
        loops.push(scheduler.start(ctx.clone()));
    } else {
        info!("Scheduler is disabled.");
    }

    if ctx.config.backups.enabled {
        debug!(
            "Starting backup task with a period of {}s ...",
            ctx.config.backups.period
        );
        let backups = &ctx.config.backups;
        let mut scheduler = Scheduler::new("backups", ctx.config.backup_period())?;
        scheduler.register(Arc::new(BackupService::new(&backups.folder, backups.run)));
        loops.push(scheduler.start(ctx.clone()));
    } else {
        info!("Backups are disabled.");
    }

    info!(
        routes = Route::ALL.len(),
        "ENC ready on https://{}",
        ctx.config.bind_address()
    );

    let exit = signals.await??;
    for handle in loops {
        handle.shutdown().await;
    }
    if !exit.flushed {
        warn!("exiting with changes that could not be flushed");
    }
    Ok(Some(exit))
}
