//! Run statistics
//!
//! Counters are updated concurrently by the driver and the workers and read
//! once at the end of a run for the summary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters shared by the driver and the worker pool
#[derive(Debug, Default)]
pub struct HarvestStats {
    seen: AtomicU64,
    skipped_existing: AtomicU64,
    submitted: AtomicU64,
    saved: AtomicU64,
    already_present: AtomicU64,
    requeued: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl HarvestStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_seen, seen);
    counter!(record_skipped_existing, skipped_existing);
    counter!(record_submitted, submitted);
    counter!(record_saved, saved);
    counter!(record_already_present, already_present);
    counter!(record_requeued, requeued);
    counter!(record_failed, failed);
    counter!(record_abandoned, abandoned);

    /// Takes a consistent-enough copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            seen: self.seen.load(Ordering::Relaxed),
            skipped_existing: self.skipped_existing.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            already_present: self.already_present.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Items seen on listing pages (counts toward the item cap)
    pub seen: u64,
    /// Items skipped by the driver because they were already saved
    pub skipped_existing: u64,
    /// Items handed to the worker pool by the driver
    pub submitted: u64,
    /// Assets written to storage
    pub saved: u64,
    /// Items a worker found already saved at pickup
    pub already_present: u64,
    /// Attempts that were scheduled again
    pub requeued: u64,
    /// Attempts that failed terminally
    pub failed: u64,
    /// Items dropped after exhausting their attempts
    pub abandoned: u64,
}

/// Prints the run summary to stdout
pub fn print_summary(stats: &StatsSnapshot, elapsed: Duration) {
    println!("=== Harvest Summary ===\n");

    println!("Discovery:");
    println!("  Items seen: {}", stats.seen);
    println!("  Already on disk: {}", stats.skipped_existing);
    println!("  Queued for download: {}", stats.submitted);
    println!();

    println!("Downloads:");
    println!("  Saved: {}", stats.saved);
    println!("  Found saved at pickup: {}", stats.already_present);
    println!("  Requeued attempts: {}", stats.requeued);
    println!("  Failed: {}", stats.failed);
    if stats.abandoned > 0 {
        println!("  Abandoned after max attempts: {}", stats.abandoned);
    }
    println!();

    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        stats.saved as f64 / secs
    } else {
        0.0
    };
    println!("Elapsed: {:.1}s ({:.2} assets/sec)", secs, rate);
}
