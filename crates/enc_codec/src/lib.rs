//! # ENC Codec
//!
//! Encoding layer for the ENC secret store.
//!
//! This crate provides two things:
//! - Deterministic CBOR helpers used to encode the in-memory snapshot before
//!   it is sealed
//! - The portable **archive** container produced by export and consumed by
//!   import
//!
//! ## Archive Layout
//!
//! An archive is a plain tar file with exactly two entries, in order:
//!
//! ```text
//! MANIFEST.json   # { format_version, created_at, size, payload }
//! store.enc       # sealed snapshot, byte-identical to the on-disk file
//! ```
//!
//! The payload is never decrypted or re-encrypted by this crate.
//!
//! ## Usage
//!
//! ```
//! use enc_codec::{read_archive, write_archive};
//!
//! let mut buf = Vec::new();
//! write_archive(&mut buf, b"sealed-bytes", 1_700_000_000_000).unwrap();
//!
//! let (manifest, payload) = read_archive(buf.as_slice()).unwrap();
//! assert_eq!(payload, b"sealed-bytes");
//! assert_eq!(manifest.size, 12);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod archive;
mod cbor;
mod error;

pub use archive::{
    read_archive, read_manifest, write_archive, ArchiveManifest, ARCHIVE_VERSION, MANIFEST_ENTRY,
    MAX_MANIFEST_SIZE, MAX_PAYLOAD_SIZE, PAYLOAD_ENTRY,
};
pub use cbor::{from_cbor, to_canonical_cbor};
pub use error::{CodecError, CodecResult};
