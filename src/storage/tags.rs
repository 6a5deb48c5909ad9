//! Append-only tag ledger
//!
//! One pipe-delimited line per saved item: `id|rating, tag1, tag2, ...`.

use crate::HarvestError;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Metadata recorded for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub item_id: String,
    pub rating: String,
    pub tags: Vec<String>,
}

impl TagRecord {
    pub fn new(item_id: impl Into<String>, rating: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            item_id: item_id.into(),
            rating: rating.into(),
            tags,
        }
    }
}

impl fmt::Display for TagRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.item_id, self.rating)?;
        for tag in &self.tags {
            write!(f, ", {}", tag)?;
        }
        Ok(())
    }
}

/// Shared ledger file; appends are serialized through a lock
#[derive(Debug)]
pub struct TagLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TagLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one complete line for `record`
    ///
    /// The line is written with a single `write_all` while the lock is held,
    /// so concurrent appenders never interleave partial lines.
    pub async fn append(&self, record: &TagRecord) -> Result<(), HarvestError> {
        let line = format!("{}\n", record);

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
