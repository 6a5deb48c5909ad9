//! Download worker pipeline
//!
//! One call to [`DownloadWorker::attempt`] runs a single attempt for a single
//! item: existence re-check, post page, asset fetch, validation, save, tag
//! record. The worker never resubmits anything itself; it reports an
//! [`AttemptOutcome`] and the pool applies the retry policy.

use crate::config::ValidationConfig;
use crate::harvest::validate::check_asset;
use crate::item::{extract_item_id, ItemState};
use crate::site::Board;
use crate::storage::{asset_extension, LocalStore, TagLedger, TagRecord};
use crate::HarvestError;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of one attempt at one item
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Asset written to storage
    Saved { item_id: String, path: PathBuf },

    /// Item was already saved when the worker picked it up
    AlreadyPresent { item_id: String },

    /// Transient failure; a fresh attempt may succeed
    Requeue { error: HarvestError },

    /// Failure that another attempt will not fix
    Failed { error: HarvestError },
}

impl AttemptOutcome {
    /// Lifecycle state the attempt ended in
    pub fn state(&self) -> ItemState {
        match self {
            Self::Saved { .. } | Self::AlreadyPresent { .. } => ItemState::Saved,
            Self::Requeue { .. } => ItemState::Requeued,
            Self::Failed { .. } => ItemState::FailedPermanently,
        }
    }
}

/// Tracks one attempt's lifecycle for logging
struct Lifecycle<'a> {
    item_id: &'a str,
    state: ItemState,
}

impl<'a> Lifecycle<'a> {
    fn picked_up(item_id: &'a str) -> Self {
        Self {
            item_id,
            state: ItemState::Queued,
        }
    }

    fn advance(&mut self, next: ItemState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!(id = %self.item_id, from = %self.state, to = %next, "Item transition");
        self.state = next;
    }
}

/// Runs the fetch-validate-save pipeline for posts
#[derive(Debug, Clone)]
pub struct DownloadWorker {
    board: Board,
    store: LocalStore,
    ledger: Option<Arc<TagLedger>>,
    validation: ValidationConfig,
}

impl DownloadWorker {
    /// Creates a worker; tag records are written only when `ledger` is set
    pub fn new(
        board: Board,
        store: LocalStore,
        ledger: Option<Arc<TagLedger>>,
        validation: ValidationConfig,
    ) -> Self {
        Self {
            board,
            store,
            ledger,
            validation,
        }
    }

    /// Runs one attempt for the post at `post_url` and classifies the result
    pub async fn attempt(&self, post_url: &str) -> AttemptOutcome {
        let item_id = match extract_item_id(post_url) {
            Ok(id) => id,
            Err(error) => {
                tracing::error!(url = %post_url, "{}", error);
                return AttemptOutcome::Failed { error };
            }
        };

        let mut lifecycle = Lifecycle::picked_up(&item_id);
        let result = self.run_pipeline(&item_id, post_url, &mut lifecycle).await;

        match result {
            Ok(outcome) => outcome,
            Err(error) if error.is_transient() => {
                lifecycle.advance(ItemState::Requeued);
                tracing::warn!(id = %item_id, "{}", error);
                AttemptOutcome::Requeue { error }
            }
            Err(error) => {
                lifecycle.advance(ItemState::FailedPermanently);
                tracing::error!(id = %item_id, "Attempt failed: {}", error);
                AttemptOutcome::Failed { error }
            }
        }
    }

    async fn run_pipeline(
        &self,
        item_id: &str,
        post_url: &str,
        lifecycle: &mut Lifecycle<'_>,
    ) -> Result<AttemptOutcome, HarvestError> {
        // A duplicate submission may have finished since this one was queued
        if self.store.contains(item_id).await? {
            lifecycle.advance(ItemState::Saved);
            tracing::debug!(id = %item_id, "Already saved, skipping");
            return Ok(AttemptOutcome::AlreadyPresent {
                item_id: item_id.to_string(),
            });
        }

        lifecycle.advance(ItemState::Fetching);
        tracing::info!(id = %item_id, "Starting download...");

        let post = self.board.fetch_post(post_url).await?;
        let asset_url = post
            .asset_url
            .clone()
            .ok_or_else(|| HarvestError::HtmlParse {
                url: post_url.to_string(),
                message: "post has no original image link".to_string(),
            })?;

        let asset = self.board.fetch_asset(&asset_url).await?;

        lifecycle.advance(ItemState::Validating);
        let asset = check_asset(asset, &self.validation).await?;

        let extension = asset_extension(&asset_url);
        let path = self
            .store
            .save_asset(item_id, &extension, &asset.bytes)
            .await?;

        // Recorded only once the asset is on disk rather than before the
        // asset fetch, so requeued attempts never leave duplicate records.
        if let Some(ledger) = &self.ledger {
            let record = TagRecord::new(item_id, post.rating, post.tags);
            ledger.append(&record).await?;
        }

        lifecycle.advance(ItemState::Saved);
        tracing::info!(id = %item_id, bytes = asset.bytes.len(), "Download complete.");

        Ok(AttemptOutcome::Saved {
            item_id: item_id.to_string(),
            path,
        })
    }
}
