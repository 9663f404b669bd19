//! One-shot export and import.

use crate::boot::{self, BootError};
use crate::format::{format_bytes, format_duration};
use crate::Cli;
use enc_server::ExitRequest;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Archives the store to `--output`.
pub async fn export(cli: &Cli) -> Result<Option<ExitRequest>, BootError> {
    let config = boot::load_config(cli)?;
    let engine = boot::engine(&config)?;
    boot::setup(&engine).await?;

    let started = Instant::now();
    let output = cli.output.clone();
    let worker = Arc::clone(&engine);
    let manifest = tokio::task::spawn_blocking(move || worker.export(&output)).await??;

    println!(
        "Archived {} of data in {} to {}.",
        format_bytes(manifest.size),
        format_duration(started.elapsed()),
        cli.output.display()
    );
    Ok(None)
}

/// Replaces the store with the contents of `archive`.
pub async fn import(cli: &Cli, archive: &Path) -> Result<Option<ExitRequest>, BootError> {
    let config = boot::load_config(cli)?;
    let engine = boot::engine(&config)?;
    boot::setup(&engine).await?;

    let started = Instant::now();
    let source = archive.to_path_buf();
    let worker = Arc::clone(&engine);
    let size = tokio::task::spawn_blocking(move || {
        worker.import(&source)?;
        worker.size()
    })
    .await??;

    println!(
        "Imported {} of data in {}.",
        format_bytes(size),
        format_duration(started.elapsed())
    );
    Ok(None)
}
