//! Fixed-size pool of download workers
//!
//! Each submission becomes a task that waits for one of `workers` semaphore
//! permits. Acquiring the permit is the "picked up" moment: the in-flight
//! counter is decremented there. Requeues release the permit, sleep for the
//! policy delay, count themselves in again and resubmit.

use crate::harvest::admission::AdmissionController;
use crate::harvest::retry::RetryPolicy;
use crate::harvest::worker::{AttemptOutcome, DownloadWorker};
use crate::item::ItemState;
use crate::output::HarvestStats;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

struct PoolInner {
    worker: DownloadWorker,
    permits: Arc<Semaphore>,
    admission: Arc<AdmissionController>,
    retry: RetryPolicy,
    stats: Arc<HarvestStats>,
    outstanding: AtomicUsize,
    idle: Notify,
}

/// Decrements the outstanding task count when a pool task ends
struct OutstandingGuard(Arc<PoolInner>);

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        if self.0.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Handle to the worker pool; cloning shares the same pool
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Creates a pool running at most `workers` attempts at once
    pub fn new(
        worker: DownloadWorker,
        workers: usize,
        admission: Arc<AdmissionController>,
        retry: RetryPolicy,
        stats: Arc<HarvestStats>,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                worker,
                permits: Arc::new(Semaphore::new(workers)),
                admission,
                retry,
                stats,
                outstanding: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Submits a post for download
    ///
    /// The caller must already have counted the item in the admission
    /// controller; the task undoes that count when a worker picks it up.
    pub fn submit(&self, post_url: String) {
        spawn_attempt(Arc::clone(&self.inner), post_url, 1);
    }

    /// Number of tasks that have not finished, including pending requeues
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Waits until every submitted item and every scheduled requeue is done
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

fn spawn_attempt(inner: Arc<PoolInner>, post_url: String, attempt: u32) {
    inner.outstanding.fetch_add(1, Ordering::SeqCst);

    tokio::spawn(async move {
        let _guard = OutstandingGuard(Arc::clone(&inner));

        let Ok(permit) = Arc::clone(&inner.permits).acquire_owned().await else {
            return;
        };
        inner.admission.decrement();

        let outcome = inner.worker.attempt(&post_url).await;
        drop(permit);

        match outcome {
            AttemptOutcome::Saved { .. } => inner.stats.record_saved(),
            AttemptOutcome::AlreadyPresent { .. } => inner.stats.record_already_present(),
            AttemptOutcome::Failed { .. } => inner.stats.record_failed(),
            AttemptOutcome::Requeue { .. } => {
                if inner.retry.should_retry(attempt) {
                    inner.stats.record_requeued();
                    schedule_requeue(Arc::clone(&inner), post_url, attempt + 1);
                } else {
                    inner.stats.record_abandoned();
                    tracing::error!(
                        url = %post_url,
                        attempts = attempt,
                        state = %ItemState::FailedPermanently,
                        "Giving up after repeated failures"
                    );
                }
            }
        }
    });
}

fn schedule_requeue(inner: Arc<PoolInner>, post_url: String, attempt: u32) {
    inner.outstanding.fetch_add(1, Ordering::SeqCst);

    tokio::spawn(async move {
        let _guard = OutstandingGuard(Arc::clone(&inner));

        tokio::time::sleep(inner.retry.delay()).await;
        inner.admission.increment();
        tracing::debug!(url = %post_url, attempt, "Requeued");
        spawn_attempt(Arc::clone(&inner), post_url, attempt);
    });
}
