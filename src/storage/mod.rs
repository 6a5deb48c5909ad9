//! Storage module for saved assets and the tag ledger
//!
//! This module handles everything that touches the output directory:
//! - Probing whether an item has already been saved
//! - Writing asset bytes under `<id>.<ext>`
//! - Appending tag records to the shared ledger file

mod tags;

pub use tags::{TagLedger, TagRecord};

use crate::HarvestError;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Extension used when the asset URL has none
pub const FALLBACK_EXTENSION: &str = "bin";

/// Checks whether any file named `<id>.<anything>` exists in `directory`
///
/// The directory is listed on every call, so the answer always reflects the
/// filesystem at query time. A missing directory means nothing is saved yet.
pub async fn item_exists(directory: &Path, item_id: &str) -> io::Result<bool> {
    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let prefix = format!("{}.", item_id);
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Derives the file extension from the last path segment of an asset URL
///
/// Query strings and fragments are ignored; URLs without a dotted last
/// segment fall back to [`FALLBACK_EXTENSION`].
pub fn asset_extension(asset_url: &str) -> String {
    let from_url = Url::parse(asset_url).ok().and_then(|url| {
        let segment = url.path_segments()?.last()?.to_string();
        let (_, ext) = segment.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
    });

    from_url.unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Output directory holding one file per saved item
#[derive(Debug, Clone)]
pub struct LocalStore {
    directory: PathBuf,
}

impl LocalStore {
    /// Creates a store rooted at `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Creates the output directory (and parents) if missing
    pub fn ensure_directory(&self) -> Result<(), HarvestError> {
        std::fs::create_dir_all(&self.directory)?;
        Ok(())
    }

    /// Returns the output directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns true if the item has already been saved under any extension
    pub async fn contains(&self, item_id: &str) -> Result<bool, HarvestError> {
        Ok(item_exists(&self.directory, item_id).await?)
    }

    /// Path an asset is written to
    pub fn asset_path(&self, item_id: &str, extension: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", item_id, extension))
    }

    /// Writes the asset bytes, replacing any previous file of the same name
    pub async fn save_asset(
        &self,
        item_id: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, HarvestError> {
        let path = self.asset_path(item_id, extension);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}
