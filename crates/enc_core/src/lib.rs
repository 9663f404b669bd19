//! # ENC Core
//!
//! Encrypted secret store engine for ENC.
//!
//! This crate provides:
//! - [`StoreEngine`]: stores and records behind one engine-wide lock, with
//!   setup, flush, export, import and CRUD operations
//! - The sealed snapshot format (AES-256-GCM, HKDF-SHA256 key derivation)
//! - A bounded [`EventLog`] for lifecycle notifications
//!
//! ## Persistence
//!
//! The whole store is one sealed snapshot file. Every persist re-seals the
//! full state and atomically replaces the file, so the on-disk store is
//! always either the previous or the next complete snapshot.
//!
//! Export copies that file verbatim into a portable archive; import
//! validates and decrypts an archive completely before swapping it in.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod crypto;
mod engine;
mod error;
mod events;
mod model;
pub mod snapshot;

pub use config::Config;
pub use crypto::Passphrase;
pub use engine::{EngineStatus, ExpiredRecord, StoreEngine};
pub use error::{CoreError, CoreResult};
pub use events::{Event, EventKind, EventLog, NewEvent, DEFAULT_MAX_EVENTS};
pub use model::{
    unix_millis, NewRecord, Record, RecordId, RecordMeta, RecordUpdate, Store, StoreId, StoreMeta,
};

pub use enc_codec::ArchiveManifest;
