//! Background durable writes for `async_storage_updates`.
//!
//! A bounded mpsc channel feeds one worker task that fills the cache tier and
//! performs the conditional first write for each job. Senders wait for a slot
//! when the channel is full, so a slow store applies backpressure instead of
//! growing memory. Commands are handled in order, which is what makes `flush`
//! a barrier.
//!
//! Sending is split in two: `reserve_slot` may wait and may be cancelled with
//! nothing queued, while `PersistSlot::send` never waits. A caller that
//! publishes a mapping and sends its job between the two has handed the write
//! to the worker even if the caller is dropped right after.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use veil_core::errors::{VeilError, VeilResult};
use veil_core::models::{InsertOutcome, MappingEntry, StoredMapping};
use veil_observability::tracing_setup::events;

use crate::tiers::Tiers;

/// One pending durable write.
pub(crate) struct PersistJob {
    pub entry: MappingEntry,
    pub record: StoredMapping,
}

enum PersistCommand {
    Write(Box<PersistJob>),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Counters of the async write path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistQueueStats {
    pub enqueued: u64,
    pub completed: u64,
    /// Writes that failed or timed out. Their mappings live only in the cache tier.
    pub dropped: u64,
}

impl PersistQueueStats {
    pub fn pending(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.completed)
            .saturating_sub(self.dropped)
    }
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    completed: AtomicU64,
    dropped: AtomicU64,
}

pub struct PersistQueue {
    tx: mpsc::Sender<PersistCommand>,
    counters: Arc<Counters>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PersistQueue {
    /// Spawn the worker on the current tokio runtime.
    pub(crate) fn start(tiers: Arc<Tiers>, capacity: usize) -> VeilResult<Self> {
        let handle = Handle::try_current().map_err(|_| {
            VeilError::config("async_storage_updates requires a running tokio runtime")
        })?;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = handle.spawn(run_worker(tiers, rx, Arc::clone(&counters)));
        Ok(Self {
            tx,
            counters,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Wait for room in the channel. `None` once the worker is gone.
    pub(crate) async fn reserve_slot(&self) -> Option<PersistSlot<'_>> {
        let permit = self.tx.reserve().await.ok()?;
        Some(PersistSlot {
            permit,
            counters: &self.counters,
        })
    }

    /// Wait until every job queued before this call has been processed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(PersistCommand::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Drain queued jobs and stop the worker. Later enqueues are refused.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(PersistCommand::Shutdown).await;
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "persist worker panicked");
            }
        }
    }

    pub fn stats(&self) -> PersistQueueStats {
        PersistQueueStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Room for exactly one job.
pub(crate) struct PersistSlot<'a> {
    permit: mpsc::Permit<'a, PersistCommand>,
    counters: &'a Counters,
}

impl PersistSlot<'_> {
    pub(crate) fn send(self, job: PersistJob) {
        self.permit.send(PersistCommand::Write(Box::new(job)));
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
    }
}

async fn run_worker(tiers: Arc<Tiers>, mut rx: mpsc::Receiver<PersistCommand>, counters: Arc<Counters>) {
    while let Some(command) = rx.recv().await {
        match command {
            PersistCommand::Write(job) => {
                if persist(&tiers, *job).await {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            PersistCommand::Flush(done) => {
                let _ = done.send(());
            }
            PersistCommand::Shutdown => break,
        }
    }
    tracing::debug!(scope = %tiers.scope, "persist worker stopped");
}

/// Write one job. Returns false when the write was lost.
async fn persist(tiers: &Tiers, job: PersistJob) -> bool {
    let PersistJob { entry, record } = job;
    tiers.cache_put(&entry).await;
    let written = match tiers.store_insert_new(&record).await {
        Ok(InsertOutcome::Inserted) => true,
        Ok(InsertOutcome::Existing(winner)) => {
            if winner.substitute_value != entry.substitute_value {
                // Another process allocated first. Its substitute is the durable
                // truth, so this process's cache stops serving ours.
                events::divergence_detected(
                    tiers.scope.as_str(),
                    entry.category.as_str(),
                    &entry.substitute_value,
                    &winner.substitute_value,
                );
                tiers.cache_invalidate(&entry).await;
                let mut repointed = entry.clone();
                repointed.substitute_value = winner.substitute_value;
                repointed.created_at = winner.created_at;
                tiers.cache_put(&repointed).await;
            }
            true
        }
        Err(e) => {
            events::storage_write_dropped(tiers.scope.as_str(), entry.category.as_str(), &e.to_string());
            false
        }
    };
    tiers.inflight.release(&entry);
    written
}
