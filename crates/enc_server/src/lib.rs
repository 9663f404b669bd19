//! # ENC Server
//!
//! Runtime services around the ENC store engine.
//!
//! This crate provides:
//! - [`ServerConfig`]: JSON configuration with defaults for every field
//! - TLS bootstrap: self-signed certificate generation and fingerprinting
//! - [`Scheduler`] and the built-in [`ScheduledTask`]s ([`BackupService`],
//!   [`ExpiryWatch`])
//! - [`SignalCoordinator`]: final flush on SIGINT/SIGTERM
//! - The REST route table and typed request dispatch
//!
//! # Architecture
//!
//! Components share one [`ServerContext`], built once at boot:
//!
//! ```rust,ignore
//! use enc_server::{BackupService, ExpiryWatch, Scheduler, ServerContext};
//! use std::sync::Arc;
//!
//! let ctx = ServerContext::new(Arc::new(engine), config);
//!
//! let mut scheduler = Scheduler::new("scheduler", ctx.config.scheduler_period())?;
//! scheduler.register(Arc::new(ExpiryWatch::new()));
//! let handle = scheduler.start(ctx.clone());
//! ```
//!
//! Nothing in this crate calls `std::process::exit`; the binary decides how
//! to act on an [`ExitRequest`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod backup;
mod config;
mod context;
mod error;
mod expiry;
pub mod routes;
mod scheduler;
mod signals;
pub mod tls;

pub use backup::BackupService;
pub use config::{expand_path, BackupsConfig, EventsConfig, SchedulerConfig, ServerConfig};
pub use context::ServerContext;
pub use error::{ServerError, ServerResult};
pub use expiry::ExpiryWatch;
pub use routes::{dispatch, ApiRequest, ApiResponse, Method, Route};
pub use scheduler::{ScheduledTask, Scheduler, SchedulerHandle};
pub use signals::{wait_for_shutdown_signal, ExitRequest, SignalCoordinator, SIGNAL_EXIT_CODE};
pub use tls::{ensure_certificate, fingerprint, TlsPaths};
