//! Stress helpers for concurrent engine access.

use enc_core::{NewRecord, RecordId, StoreEngine, StoreId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Operations per thread.
    pub ops_per_thread: usize,
    /// Size of each record value in bytes.
    pub value_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            ops_per_thread: 25,
            value_size: 64,
        }
    }
}

/// Outcome of [`concurrent_record_creation`].
#[derive(Debug, Clone)]
pub struct ConcurrentCreation {
    /// Timing and success counts.
    pub result: StressTestResult,
    /// Ids returned to the writers, in no particular order.
    pub created: Vec<RecordId>,
}

/// Creates records in one store from many threads at once.
///
/// All threads are released together to maximise contention on the engine
/// lock.
pub fn concurrent_record_creation(
    engine: Arc<StoreEngine>,
    store: StoreId,
    config: &StressConfig,
) -> ConcurrentCreation {
    let barrier = Arc::new(std::sync::Barrier::new(config.threads));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let failed = Arc::clone(&failed);
            let ops = config.ops_per_thread;
            let value = vec![t as u8; config.value_size];

            thread::spawn(move || {
                barrier.wait();
                let mut ids = Vec::with_capacity(ops);
                for i in 0..ops {
                    let input = NewRecord::new("note", format!("t{t}-r{i}"), value.clone());
                    match engine.create_record(store, input) {
                        Ok(record) => ids.push(record.id),
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                ids
            })
        })
        .collect();

    let created: Vec<RecordId> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("writer thread panicked"))
        .collect();

    let result = StressTestResult::new(
        created.len(),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    );
    ConcurrentCreation { result, created }
}

/// Error counts from [`concurrent_read_write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadWriteErrors {
    /// Record creations that failed.
    pub writes: usize,
    /// Listings that failed or observed a partially written record.
    pub reads: usize,
}

/// Mixes one writer and four readers on one store for a fixed number of
/// rounds.
pub fn concurrent_read_write(
    engine: Arc<StoreEngine>,
    store: StoreId,
    rounds: usize,
) -> ReadWriteErrors {
    let write_errors = Arc::new(AtomicUsize::new(0));
    let read_errors = Arc::new(AtomicUsize::new(0));

    let writer = {
        let engine = Arc::clone(&engine);
        let write_errors = Arc::clone(&write_errors);
        thread::spawn(move || {
            for i in 0..rounds {
                let input = NewRecord::new("note", format!("w{i}"), vec![1]);
                if engine.create_record(store, input).is_err() {
                    write_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let read_errors = Arc::clone(&read_errors);
            thread::spawn(move || {
                for _ in 0..rounds {
                    let ok = engine
                        .list_records(store)
                        .map(|records| records.iter().all(|r| r.size == 1))
                        .unwrap_or(false);
                    if !ok {
                        read_errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    writer.join().expect("writer thread panicked");
    for reader in readers {
        reader.join().expect("reader thread panicked");
    }
    ReadWriteErrors {
        writes: write_errors.load(Ordering::Relaxed),
        reads: read_errors.load(Ordering::Relaxed),
    }
}
