//! Bounded in-memory event log.
//!
//! Background tasks record notable conditions (such as expired records) here
//! so the API can list and clear them. Events are not persisted.

use crate::model::{unix_millis, RecordId, StoreId};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of events kept.
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// Kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A record passed its expiry time.
    RecordExpired,
}

/// A single logged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Monotonic event sequence number.
    pub id: u64,
    /// Event kind.
    pub kind: EventKind,
    /// Short title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// Store the event refers to.
    pub store_id: Option<StoreId>,
    /// Record the event refers to.
    pub record_id: Option<RecordId>,
    /// Time the event was logged (Unix milliseconds).
    pub created_at: u64,
}

/// Details of an event about to be logged.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Short title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// Store the event refers to.
    pub store_id: Option<StoreId>,
    /// Record the event refers to.
    pub record_id: Option<RecordId>,
}

#[derive(Debug)]
struct Inner {
    next_id: u64,
    history: VecDeque<Event>,
}

/// Thread-safe bounded event history.
///
/// When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventLog {
    inner: RwLock<Inner>,
    max_events: usize,
}

impl EventLog {
    /// Creates a log holding at most `max_events` entries.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                history: VecDeque::new(),
            }),
            max_events: max_events.max(1),
        }
    }

    /// Appends an event and returns it.
    pub fn push(&self, event: NewEvent) -> Event {
        let mut inner = self.inner.write();
        let logged = Event {
            id: inner.next_id,
            kind: event.kind,
            title: event.title,
            description: event.description,
            store_id: event.store_id,
            record_id: event.record_id,
            created_at: unix_millis(),
        };
        inner.next_id += 1;
        inner.history.push_back(logged.clone());
        while inner.history.len() > self.max_events {
            inner.history.pop_front();
        }
        logged
    }

    /// Returns all events, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<Event> {
        self.inner.read().history.iter().cloned().collect()
    }

    /// Returns events with `id > cursor`, up to `limit`.
    #[must_use]
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<Event> {
        self.inner
            .read()
            .history
            .iter()
            .filter(|e| e.id > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Removes all events. Returns how many were removed.
    ///
    /// Sequence numbers keep increasing across clears.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let removed = inner.history.len();
        inner.history.clear();
        removed
    }

    /// Number of events held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().history.len()
    }

    /// Returns `true` if no events are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS)
    }
}
