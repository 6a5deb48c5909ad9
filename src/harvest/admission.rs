//! Admission control for the worker pool
//!
//! The in-flight counter tracks items accepted into the pool that no worker
//! has picked up yet. The driver consults it before fetching a listing page
//! and before every submission; it is the only backpressure in the system.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Shared in-flight counter with a blocking ceiling gate
#[derive(Debug)]
pub struct AdmissionController {
    in_flight: AtomicUsize,
    ceiling: Option<usize>,
    poll_interval: Duration,
}

impl AdmissionController {
    /// Creates a controller; `ceiling` of `None` disables every wait
    pub fn new(ceiling: Option<usize>, poll_interval: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            ceiling,
            poll_interval,
        }
    }

    pub fn ceiling(&self) -> Option<usize> {
        self.ceiling
    }

    /// Current number of queued-but-not-started items
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Counts one more item as accepted, regardless of the ceiling
    pub fn increment(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks one item as picked up; never goes below zero
    pub fn decrement(&self) {
        let result = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if result.is_err() {
            tracing::warn!("In-flight counter decremented at zero");
        }
    }

    /// Returns true if the counter is at or below the ceiling
    pub fn is_within_ceiling(&self) -> bool {
        match self.ceiling {
            Some(ceiling) => self.in_flight() <= ceiling,
            None => true,
        }
    }

    /// Waits until the counter is at or below the ceiling
    pub async fn wait_within_ceiling(&self) {
        if self.ceiling.is_none() {
            return;
        }
        while !self.is_within_ceiling() {
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Increments the counter if that keeps it at or below the ceiling
    pub fn try_admit(&self) -> bool {
        let Some(ceiling) = self.ceiling else {
            self.increment();
            return true;
        };

        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < ceiling).then_some(n + 1)
            })
            .is_ok()
    }

    /// Waits for room below the ceiling, then counts the item
    pub async fn admit(&self) {
        while !self.try_admit() {
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
