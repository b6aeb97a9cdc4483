use log::{debug, error, info};
use std::{sync::Arc, time::Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    clock::Clock,
    db::{models::WindowChangeEvent, EventStore},
    error::PersistError,
    tracker::ActivityTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Always checkpoint the open session, even with nothing else pending.
    Checkpoint,
    /// Skip the write entirely while no completed session is pending; the
    /// open session is checkpointed only alongside completed ones.
    CompletedOnly,
}

/// Moves buffered sessions into the store.
///
/// The tracker lock is held only while the batch is taken or put back; the
/// write itself runs on the blocking pool. `flush_gate` keeps whole flushes
/// from overlapping, so a failed batch is always restored ahead of anything a
/// later flush could have taken. Once a batch is taken, the write and any
/// restore run in a spawned task that holds the gate, so dropping the caller
/// cannot lose the batch.
pub struct Persister<S: EventStore> {
    tracker: Arc<Mutex<ActivityTracker>>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    flush_gate: Arc<Mutex<()>>,
}

impl<S: EventStore> Persister<S> {
    pub fn new(tracker: Arc<Mutex<ActivityTracker>>, store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tracker,
            store,
            clock,
            flush_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Checkpoints the open session, then writes every pending event as one
    /// batch. Returns how many rows were written. On failure the batch goes
    /// back into the buffer for the next cycle.
    pub async fn flush(&self) -> Result<usize, PersistError> {
        self.flush_with(FlushMode::Checkpoint).await
    }

    pub async fn flush_with(&self, mode: FlushMode) -> Result<usize, PersistError> {
        let gate = Arc::clone(&self.flush_gate).lock_owned().await;

        let batch = {
            let mut tracker = self.tracker.lock().await;
            if mode == FlushMode::CompletedOnly && tracker.buffer().is_empty() {
                Vec::new()
            } else {
                tracker.drain_for_flush(self.clock.now())
            }
        };
        if batch.is_empty() {
            debug!("Nothing to persist");
            return Ok(0);
        }

        let tracker = Arc::clone(&self.tracker);
        let store = Arc::clone(&self.store);
        tokio::spawn(write_batch(tracker, store, batch, gate)).await?
    }
}

async fn write_batch<S: EventStore>(
    tracker: Arc<Mutex<ActivityTracker>>,
    store: Arc<S>,
    batch: Vec<WindowChangeEvent>,
    _gate: OwnedMutexGuard<()>,
) -> Result<usize, PersistError> {
    let start = Instant::now();
    let (batch, result) = tokio::task::spawn_blocking(move || {
        let result = store.append_events(&batch);
        (batch, result)
    })
    .await?;

    match result {
        Ok(()) => {
            info!("Persisted {} events in {:?}", batch.len(), start.elapsed());
            Ok(batch.len())
        }
        Err(err) => {
            error!("Failed to persist {} events: {}", batch.len(), err);
            tracker.lock().await.restore(batch);
            Err(err)
        }
    }
}
