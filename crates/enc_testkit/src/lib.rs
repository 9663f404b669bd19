//! # ENC Testkit
//!
//! Test utilities for the ENC secret store.
//!
//! This crate provides:
//! - Fixtures: temporary engines and sample data
//! - Property-based generators for stores and records
//! - Concurrency stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use enc_testkit::prelude::*;
//!
//! #[test]
//! fn creates_records() {
//!     let engine = TestEngine::file();
//!     let store = engine.create_store("personal").unwrap();
//!     // ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
