//! Harvest module: concurrent download orchestration
//!
//! This module contains the moving parts of a run:
//! - Admission control over queued-but-not-started downloads
//! - The crawl driver paging through the listing
//! - The download worker pipeline and its validation stage
//! - The worker pool with its requeue policy

mod admission;
mod driver;
mod pool;
mod retry;
mod validate;
mod worker;

pub use admission::AdmissionController;
pub use driver::{CrawlDriver, DriverExit};
pub use pool::WorkerPool;
pub use retry::RetryPolicy;
pub use validate::{check_asset, validate_image, validate_length};
pub use worker::{AttemptOutcome, DownloadWorker};

use crate::config::Config;
use crate::output::{HarvestStats, StatsSnapshot};
use crate::site::Board;
use crate::storage::{LocalStore, TagLedger};
use crate::HarvestError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a complete run
#[derive(Debug, Clone, Copy)]
pub struct HarvestReport {
    pub exit: DriverExit,
    pub stats: StatsSnapshot,
    pub elapsed: Duration,
}

/// Assembled harvester: driver, pool and their shared state
pub struct Harvester {
    driver: CrawlDriver,
    pool: WorkerPool,
    admission: Arc<AdmissionController>,
    stats: Arc<HarvestStats>,
}

impl Harvester {
    /// Builds every component from configuration
    ///
    /// Creates the output directory if it does not exist yet.
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let store = LocalStore::new(&config.output.directory);
        store.ensure_directory()?;

        let board = Board::new(&config.site, &config.crawler)?;

        let ledger = config
            .validation
            .save_tags
            .then(|| Arc::new(TagLedger::new(store.directory().join(&config.output.tag_file))));

        let admission = Arc::new(AdmissionController::new(
            config.crawler.queue_ceiling,
            Duration::from_millis(config.crawler.admission_poll_ms),
        ));
        let stats = Arc::new(HarvestStats::new());

        let worker = DownloadWorker::new(
            board.clone(),
            store.clone(),
            ledger,
            config.validation.clone(),
        );
        let pool = WorkerPool::new(
            worker,
            config.crawler.workers,
            Arc::clone(&admission),
            RetryPolicy::from_config(&config.crawler),
            Arc::clone(&stats),
        );

        let driver = CrawlDriver::new(
            board,
            store,
            Arc::clone(&admission),
            pool.clone(),
            Arc::clone(&stats),
            config.crawler.item_cap,
            Duration::from_millis(config.crawler.page_retry_delay_ms),
        );

        Ok(Self {
            driver,
            pool,
            admission,
            stats,
        })
    }

    /// Shared admission controller
    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    /// Runs the driver to completion, then waits for the pool to drain
    pub async fn run(&mut self) -> HarvestReport {
        let start = Instant::now();

        let exit = self.driver.run().await;
        tracing::info!(
            pending = self.pool.outstanding(),
            "Discovery finished ({:?}), waiting for downloads",
            exit
        );
        self.pool.wait_idle().await;

        HarvestReport {
            exit,
            stats: self.stats.snapshot(),
            elapsed: start.elapsed(),
        }
    }
}

/// Runs a complete harvest with the given configuration
///
/// This is the main entry point for a run. It will:
/// 1. Create the output directory
/// 2. Build the HTTP client, worker pool and crawl driver
/// 3. Page through the listing until exhaustion or the item cap
/// 4. Wait for every queued download and requeue to settle
pub async fn run_harvest(config: &Config) -> Result<HarvestReport, HarvestError> {
    let mut harvester = Harvester::new(config)?;
    Ok(harvester.run().await)
}
