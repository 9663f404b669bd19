//! Property-based test generators using proptest.
//!
//! Strategies produce stores and records whose ids are unique within the
//! generated set, matching what the engine itself guarantees.

use enc_core::{NewRecord, Record, RecordId, Store, StoreId};
use proptest::prelude::*;
use std::collections::HashSet;

/// Strategy for store ids.
pub fn store_id_strategy() -> impl Strategy<Value = StoreId> {
    prop::array::uniform16(any::<u8>()).prop_map(StoreId::from_bytes)
}

/// Strategy for record ids.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    prop::array::uniform16(any::<u8>()).prop_map(RecordId::from_bytes)
}

/// Strategy for display titles, including non-ASCII text.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 _.éü🔑-]{0,40}").expect("Invalid regex")
}

/// Strategy for record type tags.
pub fn kind_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("password".to_string()),
        Just("note".to_string()),
        Just("file".to_string()),
        prop::string::string_regex("[a-z]{1,12}").expect("Invalid regex"),
    ]
}

/// Strategy for opaque encrypted values.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for record creation inputs.
pub fn new_record_strategy() -> impl Strategy<Value = NewRecord> {
    (
        kind_strategy(),
        title_strategy(),
        value_strategy(),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..2048)),
        any::<bool>(),
        prop::option::of(any::<u64>()),
    )
        .prop_map(|(kind, title, value, buffer, pinned, expires_at)| NewRecord {
            kind,
            title,
            encryption: "client".to_string(),
            value,
            buffer,
            pinned,
            expires_at,
        })
}

/// Strategy for complete records, as stored in a snapshot.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (record_id_strategy(), new_record_strategy(), any::<u64>(), any::<u64>()).prop_map(
        |(id, input, created_at, updated_at)| Record {
            id,
            kind: input.kind,
            title: input.title,
            encryption: input.encryption,
            value: input.value,
            buffer: input.buffer,
            pinned: input.pinned,
            expires_at: input.expires_at,
            created_at,
            updated_at,
        },
    )
}

/// Strategy for a store with up to `max_records` records.
pub fn store_strategy(max_records: usize) -> impl Strategy<Value = Store> {
    (
        store_id_strategy(),
        title_strategy(),
        prop::collection::vec(record_strategy(), 0..=max_records),
        any::<u64>(),
        any::<u64>(),
    )
        .prop_map(|(id, title, records, created_at, updated_at)| Store {
            id,
            title,
            records: dedup_by_id(records, |r| r.id),
            created_at,
            updated_at,
        })
}

/// Strategy for a full set of stores, with ids unique across the set.
pub fn stores_strategy(max_stores: usize, max_records: usize) -> impl Strategy<Value = Vec<Store>> {
    prop::collection::vec(store_strategy(max_records), 0..=max_stores).prop_map(|stores| {
        let mut seen_records = HashSet::new();
        dedup_by_id(stores, |s| s.id)
            .into_iter()
            .map(|mut store| {
                store.records.retain(|r| seen_records.insert(r.id));
                store
            })
            .collect()
    })
}

fn dedup_by_id<T, K: std::hash::Hash + Eq>(items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

/// Operations applied to an engine in model-based tests.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Create a store.
    CreateStore {
        /// Title.
        title: String,
    },
    /// Create a record in the store at `store` (modulo the store count).
    CreateRecord {
        /// Store index.
        store: usize,
        /// Record input.
        input: NewRecord,
    },
    /// Delete the store at `store` (modulo the store count).
    DeleteStore {
        /// Store index.
        store: usize,
    },
    /// Persist pending changes.
    Flush,
}

/// Strategy for engine operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        2 => title_strategy().prop_map(|title| StoreOperation::CreateStore { title }),
        4 => (any::<usize>(), new_record_strategy())
            .prop_map(|(store, input)| StoreOperation::CreateRecord { store, input }),
        1 => any::<usize>().prop_map(|store| StoreOperation::DeleteStore { store }),
        1 => Just(StoreOperation::Flush),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Configuration for quick tests. Snapshot sealing is comparatively slow,
    /// so engine-level properties use this.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
