//! Record expiry notifications.

use crate::context::ServerContext;
use crate::error::{ServerError, ServerResult};
use crate::scheduler::ScheduledTask;
use async_trait::async_trait;
use enc_core::{unix_millis, EventKind, NewEvent, RecordId};
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::info;

/// Emits one `record_expired` event per record when its expiry time passes.
///
/// Records already reported are remembered until they stop being expired
/// (deleted, or given a new expiry time), so a record whose expiry is pushed
/// back and then passes again is reported again.
#[derive(Debug, Default)]
pub struct ExpiryWatch {
    reported: Mutex<HashSet<RecordId>>,
}

impl ExpiryWatch {
    /// Creates a watch with nothing reported yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks for expired records at `now` and pushes events for new ones.
    ///
    /// Returns the number of events emitted.
    pub fn check(&self, ctx: &ServerContext, now: u64) -> ServerResult<usize> {
        let expired = ctx.engine.expired_records(now)?;
        let mut reported = self.reported.lock();

        let current: HashSet<RecordId> = expired.iter().map(|e| e.record.id).collect();
        reported.retain(|id| current.contains(id));

        let mut emitted = 0;
        for item in expired {
            if !reported.insert(item.record.id) {
                continue;
            }
            info!(
                store = %item.store_id,
                record = %item.record.id,
                "record expired"
            );
            ctx.events.push(NewEvent {
                kind: EventKind::RecordExpired,
                title: "Record expired".to_string(),
                description: format!(
                    "'{}' in store '{}' has expired",
                    item.record.title, item.store_title
                ),
                store_id: Some(item.store_id),
                record_id: Some(item.record.id),
            });
            emitted += 1;
        }
        Ok(emitted)
    }
}

#[async_trait]
impl ScheduledTask for ExpiryWatch {
    fn name(&self) -> &str {
        "expiry"
    }

    async fn run(&self, ctx: &ServerContext) -> ServerResult<()> {
        // Only takes the engine read lock briefly.
        self.check(ctx, unix_millis()).map(|_| ()).map_err(|e| match e {
            e @ ServerError::TaskHandlerFailure { .. } => e,
            other => ServerError::task_failure(self.name(), other.to_string()),
        })
    }
}
