//! encd
//!
//! The ENC secret store daemon.
//!
//! # Modes
//!
//! - default: open the store, start background services, wait for SIGINT or
//!   SIGTERM, flush, exit
//! - `--export [--output FILE]`: archive the store once and exit
//! - `--import FILE`: replace the store from an archive once and exit

mod boot;
mod commands;
mod format;
mod logging;

use clap::Parser;
use std::path::PathBuf;
use tracing::error;

/// ENC secret store daemon.
#[derive(Parser, Debug)]
#[command(name = "encd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory, overrides `database` from the configuration
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Export the store to a TAR archive and exit
    #[arg(long, conflicts_with = "import")]
    export: bool,

    /// Archive written by --export
    #[arg(short, long, default_value = "enc.tar")]
    output: PathBuf,

    /// Import stores from this TAR archive and exit
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Enable debug logs
    #[arg(long)]
    log_debug: bool,

    /// Log to this file instead of standard error
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.log_debug, cli.log_file.as_deref())?;

    let outcome = if cli.export {
        commands::transfer::export(&cli).await
    } else if let Some(archive) = &cli.import {
        commands::transfer::import(&cli, archive).await
    } else {
        commands::serve::run(&cli).await
    };

    match outcome {
        Ok(None) => Ok(()),
        Ok(Some(exit)) => std::process::exit(exit.code),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
