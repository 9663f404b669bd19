//! # ENC Storage
//!
//! Durable storage medium for the ENC secret store.
//!
//! Backends hold a **single opaque blob**: the encrypted snapshot produced by
//! `enc_core`. They never interpret the bytes they store.
//!
//! ## Design Principles
//!
//! - Whole-blob replacement is atomic: readers observe the old or the new
//!   bytes, never a mix
//! - A backend that reports success from `replace` has made the bytes durable
//! - Must be `Send + Sync` so the engine can live behind an `Arc`
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//! - [`FileBackend`] - Directory-based persistent storage with an advisory lock
//!
//! ## Example
//!
//! ```rust
//! use enc_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! assert!(backend.load().unwrap().is_none());
//! backend.replace(b"sealed bytes").unwrap();
//! assert_eq!(backend.load().unwrap().unwrap(), b"sealed bytes");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, DATA_FILE, LOCK_FILE};
pub use memory::InMemoryBackend;
