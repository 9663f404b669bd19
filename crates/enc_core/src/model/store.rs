//! Stores, records, and their listing views.

use super::{RecordId, StoreId};
use serde::{Deserialize, Deserializer, Serialize};

/// A named container of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    /// Store identifier.
    pub id: StoreId,
    /// Display name.
    pub title: String,
    /// Records in insertion order.
    pub records: Vec<Record>,
    /// Creation time (Unix milliseconds).
    pub created_at: u64,
    /// Last modification time of the store or any of its records.
    pub updated_at: u64,
}

impl Store {
    pub(crate) fn new(title: String, now: u64) -> Self {
        Self {
            id: StoreId::new(),
            title,
            records: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub(crate) fn record_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Returns the listing view of this store.
    #[must_use]
    pub fn meta(&self) -> StoreMeta {
        StoreMeta {
            id: self.id,
            title: self.title.clone(),
            records: self.records.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A single secret entry.
///
/// `value` and `buffer` are produced by the client and stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier, unique within its store.
    pub id: RecordId,
    /// Type tag such as `"password"`, `"note"` or `"file"`.
    pub kind: String,
    /// Display name.
    pub title: String,
    /// Label of the client-side scheme that produced `value`.
    pub encryption: String,
    /// Opaque encrypted value.
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
    /// Optional binary attachment.
    #[serde(default, with = "serde_bytes")]
    pub buffer: Option<Vec<u8>>,
    /// Whether the record is pinned.
    #[serde(default)]
    pub pinned: bool,
    /// Expiry time (Unix milliseconds).
    #[serde(default)]
    pub expires_at: Option<u64>,
    /// Creation time (Unix milliseconds).
    pub created_at: u64,
    /// Last modification time (Unix milliseconds).
    pub updated_at: u64,
}

impl Record {
    pub(crate) fn new(input: NewRecord, now: u64) -> Self {
        Self {
            id: RecordId::new(),
            kind: input.kind,
            title: input.title,
            encryption: input.encryption,
            value: input.value,
            buffer: input.buffer,
            pinned: input.pinned,
            expires_at: input.expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the record has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Returns the listing view of this record.
    #[must_use]
    pub fn meta(&self) -> RecordMeta {
        RecordMeta {
            id: self.id,
            kind: self.kind.clone(),
            title: self.title.clone(),
            encryption: self.encryption.clone(),
            size: self.value.len(),
            buffer_size: self.buffer.as_ref().map(Vec::len),
            pinned: self.pinned,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn apply(&mut self, update: RecordUpdate, now: u64) {
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(encryption) = update.encryption {
            self.encryption = encryption;
        }
        if let Some(value) = update.value {
            self.value = value;
        }
        if let Some(buffer) = update.buffer {
            self.buffer = buffer;
        }
        if let Some(pinned) = update.pinned {
            self.pinned = pinned;
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = expires_at;
        }
        self.updated_at = now;
    }
}

/// Listing view of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    /// Store identifier.
    pub id: StoreId,
    /// Display name.
    pub title: String,
    /// Number of records.
    pub records: usize,
    /// Creation time (Unix milliseconds).
    pub created_at: u64,
    /// Last modification time (Unix milliseconds).
    pub updated_at: u64,
}

/// Listing view of a record, without its value or attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Record identifier.
    pub id: RecordId,
    /// Type tag.
    pub kind: String,
    /// Display name.
    pub title: String,
    /// Client-side scheme label.
    pub encryption: String,
    /// Size of the value in bytes.
    pub size: usize,
    /// Size of the attachment, if any.
    pub buffer_size: Option<usize>,
    /// Whether the record is pinned.
    pub pinned: bool,
    /// Expiry time (Unix milliseconds).
    pub expires_at: Option<u64>,
    /// Creation time (Unix milliseconds).
    pub created_at: u64,
    /// Last modification time (Unix milliseconds).
    pub updated_at: u64,
}

/// Input for creating a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRecord {
    /// Type tag.
    pub kind: String,
    /// Display name.
    pub title: String,
    /// Client-side scheme label.
    pub encryption: String,
    /// Opaque encrypted value.
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
    /// Optional binary attachment.
    #[serde(with = "serde_bytes")]
    pub buffer: Option<Vec<u8>>,
    /// Whether the record is pinned.
    pub pinned: bool,
    /// Expiry time (Unix milliseconds).
    pub expires_at: Option<u64>,
}

impl NewRecord {
    /// Creates a record input with a kind, title and value.
    pub fn new(kind: impl Into<String>, title: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            value,
            ..Self::default()
        }
    }

    /// Sets the client-side scheme label.
    #[must_use]
    pub fn with_encryption(mut self, encryption: impl Into<String>) -> Self {
        self.encryption = encryption.into();
        self
    }

    /// Attaches a binary buffer.
    #[must_use]
    pub fn with_buffer(mut self, buffer: Vec<u8>) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Sets the expiry time.
    #[must_use]
    pub fn expires_at(mut self, at: u64) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Marks the record as pinned.
    #[must_use]
    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

/// Partial update of a record. `None` leaves a field unchanged.
///
/// For the optional fields `buffer` and `expires_at`, `Some(None)` clears the
/// field. In JSON an explicit `null` clears it and an absent key leaves it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecordUpdate {
    /// New type tag.
    pub kind: Option<String>,
    /// New display name.
    pub title: Option<String>,
    /// New scheme label.
    pub encryption: Option<String>,
    /// New value.
    #[serde(with = "serde_bytes")]
    pub value: Option<Vec<u8>>,
    /// New attachment, or `Some(None)` to remove it.
    #[serde(deserialize_with = "nullable_bytes")]
    pub buffer: Option<Option<Vec<u8>>>,
    /// New pinned flag.
    pub pinned: Option<bool>,
    /// New expiry, or `Some(None)` to remove it.
    #[serde(deserialize_with = "nullable")]
    pub expires_at: Option<Option<u64>>,
}

impl RecordUpdate {
    /// Returns `true` if the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn nullable_bytes<'de, D>(deserializer: D) -> Result<Option<Option<Vec<u8>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let bytes: Option<serde_bytes::ByteBuf> = Deserialize::deserialize(deserializer)?;
    Ok(Some(bytes.map(serde_bytes::ByteBuf::into_vec)))
}
