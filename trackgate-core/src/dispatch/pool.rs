//! Bounded hit queue drained by a fixed pool of workers.
//!
//! Submission never waits: a full or closed queue drops the hit and counts
//! it. Workers hand each hit to the tracker on the blocking thread pool and
//! log, then discard, whatever goes wrong there.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::tracker::Tracker;
use crate::types::{Hit, HitPayload};

/// Dispatch counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Hits accepted onto the queue
    pub submitted: u64,
    /// Hits the tracker recorded
    pub delivered: u64,
    /// Hits the tracker failed on (error or panic)
    pub failed: u64,
    /// Hits refused because the queue was full or closed
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Sending side of the hit queue, shared by every active reporter.
///
/// Workers only share the counters, so dropping the last `Queue` closes the
/// channel and lets them drain and exit.
#[derive(Debug)]
pub struct Queue {
    sender: RwLock<Option<mpsc::Sender<Hit>>>,
    counters: Arc<Counters>,
}

impl Queue {
    /// Enqueue a hit without waiting
    pub fn submit(&self, hit: Hit) {
        let guard = self.sender.read().unwrap_or_else(|p| p.into_inner());
        let Some(sender) = guard.as_ref() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                hit_id = %hit.id,
                operation = hit.payload.operation(),
                "Dispatcher stopped, dropping hit"
            );
            return;
        };

        match sender.try_send(hit) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(hit)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    hit_id = %hit.id,
                    operation = hit.payload.operation(),
                    "Dispatch queue full, dropping hit"
                );
            }
            Err(TrySendError::Closed(hit)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    hit_id = %hit.id,
                    operation = hit.payload.operation(),
                    "Dispatch queue closed, dropping hit"
                );
            }
        }
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    fn close(&self) -> bool {
        self.sender
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .is_some()
    }
}

/// Worker tasks draining the queue into a tracker.
pub struct WorkerPool {
    queue: Arc<Queue>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create the queue and spawn `config.workers` workers on `handle`
    pub fn spawn(handle: &Handle, tracker: Arc<dyn Tracker>, config: &DispatchConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(Counters::default());
        let queue = Arc::new(Queue {
            sender: RwLock::new(Some(tx)),
            counters: Arc::clone(&counters),
        });

        let workers = (0..config.workers)
            .map(|worker| {
                handle.spawn(run_worker(
                    worker,
                    Arc::clone(&rx),
                    Arc::clone(&tracker),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        tracing::debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Dispatch workers started"
        );

        Self {
            queue,
            workers: Mutex::new(workers),
        }
    }

    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    /// Close the queue, let workers finish everything already queued, then wait for them.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) {
        if !self.queue.close() {
            return;
        }

        let workers: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .drain(..)
            .collect();

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Dispatch worker ended abnormally");
            }
        }

        let stats = self.queue.stats();
        tracing::info!(
            submitted = stats.submitted,
            delivered = stats.delivered,
            failed = stats.failed,
            dropped = stats.dropped,
            "Dispatcher drained"
        );
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Hit>>>,
    tracker: Arc<dyn Tracker>,
    counters: Arc<Counters>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(hit) = next else {
            break;
        };

        let tracker = Arc::clone(&tracker);
        let payload = hit.payload.clone();
        let outcome = tokio::task::spawn_blocking(move || deliver(tracker.as_ref(), &payload))
            .await
            .unwrap_or_else(|e| Err(Error::Tracker(format!("tracker panicked: {}", e))));

        match outcome {
            Ok(()) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    worker,
                    hit_id = %hit.id,
                    operation = hit.payload.operation(),
                    queued_ms = (Utc::now() - hit.submitted_at).num_milliseconds(),
                    "Hit delivered"
                );
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                log_failure(&hit, &e);
            }
        }
    }

    tracing::trace!(worker, "Dispatch worker exiting");
}

/// Hand one hit to the tracker
fn deliver(tracker: &dyn Tracker, payload: &HitPayload) -> Result<()> {
    match payload {
        HitPayload::Event(event) => tracker.track_event(event),
        HitPayload::PageView { path } => tracker.track_page_view(path),
    }
}

fn log_failure(hit: &Hit, error: &Error) {
    match &hit.payload {
        HitPayload::Event(event) => tracing::error!(
            hit_id = %hit.id,
            operation = hit.payload.operation(),
            submitted_at = %hit.submitted_at,
            category = %event.category,
            action = %event.action,
            label = %event.label,
            value = event.value,
            error = %error,
            "Analytics delivery failed"
        ),
        HitPayload::PageView { path } => tracing::error!(
            hit_id = %hit.id,
            operation = hit.payload.operation(),
            submitted_at = %hit.submitted_at,
            path = %path,
            error = %error,
            "Analytics delivery failed"
        ),
    }
}
