//! Data model: stores, records, and identifiers.

mod id;
mod store;

pub use id::{RecordId, StoreId};
pub use store::{NewRecord, Record, RecordMeta, RecordUpdate, Store, StoreMeta};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix milliseconds.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
