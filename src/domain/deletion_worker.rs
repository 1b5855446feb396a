//! Batched asynchronous soft-deletion.
//!
//! Handlers hand over owner-verified idents with [`DeletionCoordinator::enqueue`]
//! and answer immediately. A single background task unions incoming batches
//! into one pending set and writes it with one
//! [`LinkRepository::mark_deleted`] call per tick. Failed flushes keep their
//! idents for the next tick. [`DeletionCoordinator::stop`] drains the queue
//! and flushes whatever is left before returning.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::domain::repositories::LinkRepository;
use crate::error::{AppError, StorageError};

type PendingSet = Arc<Mutex<BTreeSet<String>>>;

/// Tuning knobs for the deletion coordinator.
#[derive(Debug, Clone, Copy)]
pub struct DeletionSettings {
    /// Time between flushes; the first flush happens one interval after start.
    pub flush_interval: Duration,
    /// Number of enqueued batches buffered before `enqueue` waits.
    pub queue_capacity: usize,
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(5),
            queue_capacity: 1024,
        }
    }
}

struct Control {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Handle to the background deletion task.
pub struct DeletionCoordinator {
    sender: mpsc::Sender<Vec<String>>,
    pending: PendingSet,
    control: tokio::sync::Mutex<Option<Control>>,
}

impl DeletionCoordinator {
    /// Spawns the worker task and returns its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(repository: Arc<dyn LinkRepository>, settings: DeletionSettings) -> Self {
        let (sender, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let pending = PendingSet::default();

        let task = tokio::spawn(run_worker(
            repository,
            rx,
            stop_rx,
            Arc::clone(&pending),
            settings.flush_interval,
        ));

        tracing::info!(
            flush_interval_ms = settings.flush_interval.as_millis() as u64,
            queue_capacity = settings.queue_capacity,
            "Deletion coordinator started"
        );

        Self {
            sender,
            pending,
            control: tokio::sync::Mutex::new(Some(Control { stop_tx, task })),
        }
    }

    /// Queues idents for soft-deletion.
    ///
    /// Waits while the queue is full. Ownership must already be verified.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] once the coordinator is stopping.
    pub async fn enqueue(&self, idents: Vec<String>) -> Result<(), AppError> {
        if idents.is_empty() {
            return Ok(());
        }

        let count = idents.len();
        self.sender.send(idents).await.map_err(|_| {
            AppError::unavailable(
                "Deletion is not accepting requests",
                json!({ "reason": "Shutting down" }),
            )
        })?;

        tracing::debug!(ident_count = count, "Deletion batch queued");
        Ok(())
    }

    /// Stops the worker after draining the queue and running a final flush.
    ///
    /// Calling it again after a completed stop does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the final flush fails, or if the
    /// worker does not finish within `timeout`; the worker is then aborted
    /// and pending idents are lost.
    pub async fn stop(&self, timeout: Duration) -> Result<(), AppError> {
        let Some(Control { stop_tx, mut task }) = self.control.lock().await.take() else {
            return Ok(());
        };

        // The worker may already have exited if every sender is gone.
        let _ = stop_tx.send(());

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => match self.pending_len() {
                0 => {
                    tracing::info!("Deletion coordinator stopped");
                    Ok(())
                }
                unflushed => Err(AppError::internal(
                    "Final deletion flush failed",
                    json!({ "pending": unflushed }),
                )),
            },
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Deletion worker failed");
                Err(AppError::internal("Deletion worker failed", json!({})))
            }
            Err(_) => {
                task.abort();
                let lost = self.pending_len();
                tracing::error!(
                    timeout_ms = timeout.as_millis() as u64,
                    ident_count = lost,
                    "Deletion coordinator did not drain in time"
                );
                Err(AppError::internal(
                    "Deletion coordinator did not drain in time",
                    json!({ "pending": lost }),
                ))
            }
        }
    }

    /// True while new batches are accepted.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Idents accumulated but not yet written.
    pub fn pending_len(&self) -> usize {
        pending_count(&self.pending)
    }
}

async fn run_worker(
    repository: Arc<dyn LinkRepository>,
    mut rx: mpsc::Receiver<Vec<String>>,
    mut stop_rx: oneshot::Receiver<()>,
    pending: PendingSet,
    flush_interval: Duration,
) {
    let mut ticker = interval_at(Instant::now() + flush_interval, flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            batch = rx.recv() => match batch {
                Some(idents) => accumulate(&pending, idents),
                None => break,
            },
            _ = ticker.tick() => {
                if let Err(e) = flush(repository.as_ref(), &pending).await {
                    tracing::warn!(
                        error = %e,
                        ident_count = pending_count(&pending),
                        "Deletion flush failed, retrying next tick"
                    );
                }
            }
        }
    }

    rx.close();
    while let Some(idents) = rx.recv().await {
        accumulate(&pending, idents);
    }

    if let Err(e) = flush(repository.as_ref(), &pending).await {
        tracing::error!(
            error = %e,
            ident_count = pending_count(&pending),
            "Final deletion flush failed, idents left unwritten"
        );
    }
}

fn accumulate(pending: &PendingSet, idents: Vec<String>) {
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .extend(idents);
}

fn pending_count(pending: &PendingSet) -> usize {
    pending.lock().unwrap_or_else(PoisonError::into_inner).len()
}

/// Writes the pending set. On failure the idents go back into the set.
async fn flush(
    repository: &dyn LinkRepository,
    pending: &PendingSet,
) -> Result<(), StorageError> {
    let batch = std::mem::take(&mut *pending.lock().unwrap_or_else(PoisonError::into_inner));
    if batch.is_empty() {
        return Ok(());
    }

    let idents: Vec<String> = batch.into_iter().collect();
    metrics::counter!("deletion_flushes_total").increment(1);

    match repository.mark_deleted(&idents).await {
        Ok(()) => {
            metrics::counter!("deletion_idents_flushed_total").increment(idents.len() as u64);
            tracing::info!(ident_count = idents.len(), "Flushed deletions");
            Ok(())
        }
        Err(e) => {
            metrics::counter!("deletion_flush_failures_total").increment(1);
            pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(idents);
            Err(e)
        }
    }
}
