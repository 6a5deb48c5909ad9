//! Crawl driver - the single loop that pages through the listing
//!
//! Each iteration waits on the admission gate, fetches the listing page at
//! the current offset, skips items already on disk and hands new ones to the
//! worker pool. Page-level errors are logged and the same offset is retried
//! after a fixed pause.

use crate::harvest::admission::AdmissionController;
use crate::harvest::pool::WorkerPool;
use crate::item::extract_item_id;
use crate::output::HarvestStats;
use crate::site::Board;
use crate::storage::LocalStore;
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;

/// Why the driver loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// A listing page had no item links
    Exhausted,
    /// The item cap was reached
    CapReached,
}

/// What one processed page means for the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageOutcome {
    Exhausted,
    Continue,
}

/// Item on the current page that passed identity resolution
struct PageItem<'a> {
    url: &'a str,
    item_id: String,
    exists: bool,
}

/// Paginates the listing and feeds the worker pool
pub struct CrawlDriver {
    board: Board,
    store: LocalStore,
    admission: Arc<AdmissionController>,
    pool: WorkerPool,
    stats: Arc<HarvestStats>,
    item_cap: Option<u64>,
    page_retry_delay: Duration,
    offset: u64,
    total_seen: u64,
}

impl CrawlDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        board: Board,
        store: LocalStore,
        admission: Arc<AdmissionController>,
        pool: WorkerPool,
        stats: Arc<HarvestStats>,
        item_cap: Option<u64>,
        page_retry_delay: Duration,
    ) -> Self {
        Self {
            board,
            store,
            admission,
            pool,
            stats,
            item_cap,
            page_retry_delay,
            offset: 0,
            total_seen: 0,
        }
    }

    /// Listing offset of the next page to fetch
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Items seen so far, including those skipped as already saved
    pub fn total_seen(&self) -> u64 {
        self.total_seen
    }

    fn cap_reached(&self) -> bool {
        self.item_cap.map_or(false, |cap| self.total_seen >= cap)
    }

    fn remaining_cap(&self) -> usize {
        match self.item_cap {
            Some(cap) => {
                let remaining = cap.saturating_sub(self.total_seen);
                usize::try_from(remaining).unwrap_or(usize::MAX)
            }
            None => usize::MAX,
        }
    }

    /// Runs until the listing is exhausted or the item cap is reached
    ///
    /// Any other failure is retried at the same offset forever, so without a
    /// cap and with a permanently broken page this never returns.
    pub async fn run(&mut self) -> DriverExit {
        tracing::info!("Starting...");

        loop {
            if self.cap_reached() {
                tracing::info!(seen = self.total_seen, "Item cap reached");
                return DriverExit::CapReached;
            }

            self.admission.wait_within_ceiling().await;

            match self.crawl_page().await {
                Ok(PageOutcome::Exhausted) => {
                    tracing::info!(offset = self.offset, "Listing exhausted");
                    return DriverExit::Exhausted;
                }
                Ok(PageOutcome::Continue) => {}
                Err(e) => {
                    tracing::error!(offset = self.offset, "An error occurred: {}", e);
                    tokio::time::sleep(self.page_retry_delay).await;
                }
            }
        }
    }

    /// Processes the listing page at the current offset
    ///
    /// Every fallible step (fetch, identity, existence check) runs before
    /// anything is submitted, so a failed page leaves no partial effects and
    /// is simply fetched again.
    async fn crawl_page(&mut self) -> Result<PageOutcome, HarvestError> {
        let listing_url = self.board.listing_url(self.offset)?;
        tracing::info!(offset = self.offset, "Fetching from \"{}\"", listing_url);

        let listing = self.board.fetch_listing(self.offset).await?;
        if listing.links.is_empty() {
            return Ok(PageOutcome::Exhausted);
        }

        let mut items = Vec::new();
        for url in listing.links.iter().take(self.remaining_cap()) {
            let item_id = extract_item_id(url)?;
            let exists = self.store.contains(&item_id).await?;
            items.push(PageItem {
                url: url.as_str(),
                item_id,
                exists,
            });
        }

        let mut queued = 0;
        for item in items {
            self.total_seen += 1;
            self.stats.record_seen();

            if item.exists {
                self.stats.record_skipped_existing();
                tracing::trace!(id = %item.item_id, "Already saved");
                continue;
            }

            self.admission.admit().await;
            self.pool.submit(item.url.to_string());
            self.stats.record_submitted();
            queued += 1;
        }

        tracing::info!(offset = self.offset, "Added {} downloads to queue.", queued);
        tracing::info!("{} downloads pending.", self.admission.in_flight());

        self.offset += listing.links.len() as u64;
        Ok(PageOutcome::Continue)
    }
}
