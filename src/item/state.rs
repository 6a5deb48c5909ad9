/// Item lifecycle definitions
///
/// The lifecycle is not persisted; workers track it per attempt so that
/// transitions can be logged and checked.
use std::fmt;

/// Represents the current state of one item in the harvest pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    // ===== Active States =====
    /// Link found on a listing page
    Discovered,

    /// Accepted into the worker pool, waiting for a worker
    Queued,

    /// A worker is fetching the post page or the asset
    Fetching,

    /// Downloaded bytes are being checked
    Validating,

    /// Attempt failed transiently; a fresh attempt is scheduled
    Requeued,

    // ===== Terminal States =====
    /// Asset written to storage (or found already present)
    Saved,

    /// Attempt failed for a reason that retrying will not fix
    FailedPermanently,
}

impl ItemState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Saved | Self::FailedPermanently)
    }

    /// Returns true if the item may still make progress
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Checks whether the pipeline may move from `self` to `next`
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        use ItemState::*;

        matches!(
            (*self, next),
            (Discovered, Queued)
                | (Queued, Fetching)
                // a duplicate submission may already be on disk at pickup
                | (Queued, Saved)
                | (Queued, FailedPermanently)
                | (Fetching, Validating)
                | (Fetching, Requeued)
                | (Fetching, FailedPermanently)
                | (Validating, Saved)
                | (Validating, Requeued)
                | (Validating, FailedPermanently)
                | (Requeued, Queued)
                | (Requeued, FailedPermanently)
        )
    }

    /// Short lowercase name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Validating => "validating",
            Self::Requeued => "requeued",
            Self::Saved => "saved",
            Self::FailedPermanently => "failed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
