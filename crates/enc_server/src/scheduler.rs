//! Periodic task driver.
//!
//! A [`Scheduler`] owns a list of [`ScheduledTask`]s and a tick period. Once
//! started it wakes at every period boundary and runs each enabled task in
//! registration order, awaiting one before starting the next. A task that
//! overruns the period delays later ticks instead of overlapping itself.

use crate::context::ServerContext;
use crate::error::{ServerError, ServerResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A named unit of periodic work.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Disabled tasks are skipped on every tick.
    fn enabled(&self) -> bool {
        true
    }

    /// Runs one invocation.
    async fn run(&self, ctx: &ServerContext) -> ServerResult<()>;
}

/// Drives registered tasks at a fixed period.
pub struct Scheduler {
    name: String,
    period: Duration,
    tasks: Vec<Arc<dyn ScheduledTask>>,
}

impl Scheduler {
    /// Creates a scheduler with no tasks.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `period` is zero.
    pub fn new(name: impl Into<String>, period: Duration) -> ServerResult<Self> {
        let name = name.into();
        if period.is_zero() {
            return Err(ServerError::Config(format!(
                "scheduler '{name}' needs a non-zero period"
            )));
        }
        Ok(Self {
            name,
            period,
            tasks: Vec::new(),
        })
    }

    /// Adds a task. Tasks run in registration order.
    pub fn register(&mut self, task: Arc<dyn ScheduledTask>) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if no task is registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every enabled task once, in order.
    ///
    /// Failures are logged and do not stop the remaining tasks. Returns the
    /// number of tasks that failed.
    pub async fn tick(&self, ctx: &ServerContext) -> usize {
        let mut failures = 0;
        for task in self.tasks.iter().filter(|t| t.enabled()) {
            debug!(scheduler = %self.name, task = task.name(), "running task");
            if let Err(e) = task.run(ctx).await {
                let e = match e {
                    e @ ServerError::TaskHandlerFailure { .. } => e,
                    other => ServerError::task_failure(task.name(), other.to_string()),
                };
                warn!(scheduler = %self.name, error = %e, "scheduled task failed");
                failures += 1;
            }
        }
        failures
    }

    /// Spawns the tick loop.
    ///
    /// The first run happens one full period after the call.
    pub fn start(self, ctx: ServerContext) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        info!(
            scheduler = %self.name,
            period_secs = self.period.as_secs_f64(),
            tasks = self.tasks.len(),
            "scheduler started"
        );

        let join = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.tick(&ctx).await;
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
            info!(scheduler = %self.name, "scheduler stopped");
        });

        SchedulerHandle { shutdown_tx, join }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.tasks.iter().map(|t| t.name()).collect();
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("tasks", &names)
            .finish()
    }
}

/// Handle to a running scheduler loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the loop and waits for it to exit.
    ///
    /// A task invocation in progress completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "scheduler loop ended abnormally");
        }
    }

    /// Returns `true` once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
