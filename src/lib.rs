//! Booru-Harvester: a concurrent image-board downloader
//!
//! This crate walks a paginated post listing, skips posts that are already
//! saved, and downloads the full-resolution asset of every new post through a
//! bounded pool of workers with admission control, integrity validation and
//! delayed requeueing of transient failures.

pub mod config;
pub mod harvest;
pub mod item;
pub mod output;
pub mod site;
pub mod storage;

use thiserror::Error;

/// Main error type for Booru-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("No item identifier in {url}")]
    MissingIdentifier { url: String },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("No Content-Length declared for {url}")]
    MissingContentLength { url: String },

    #[error("Expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("Image validation failed: {0}")]
    ImageValidation(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true if a fresh attempt at the same item may succeed
    ///
    /// Transport failures, overloaded upstream responses (5xx, 429) and
    /// integrity failures of the downloaded bytes are transient. Everything
    /// else ends the attempt for good.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { source, .. } | Self::Reqwest(source) => is_transient_transport(source),
            Self::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            Self::LengthMismatch { .. } | Self::ImageValidation(_) => true,
            _ => false,
        }
    }
}

fn is_transient_transport(error: &reqwest::Error) -> bool {
    if error.is_builder() || error.is_redirect() {
        return false;
    }
    if let Some(status) = error.status() {
        return status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
    }
    true
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Booru-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{run_harvest, AdmissionController};
pub use item::{extract_item_id, ItemState};
