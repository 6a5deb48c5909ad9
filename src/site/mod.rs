//! Site module: the image board as seen over HTTP
//!
//! This module contains everything that talks to the board:
//! - HTTP client construction and fetching
//! - Listing and post page extraction
//! - The `Board` facade used by the driver and the workers

mod fetcher;
mod parser;

pub use fetcher::{build_asset_client, build_http_client, fetch_asset, fetch_page, FetchedAsset};
pub use parser::{parse_listing, parse_post, PostPage, ORIGINAL_IMAGE_LABEL};

use crate::config::{CrawlerConfig, SiteConfig};
use crate::HarvestError;
use reqwest::Client;
use url::Url;

/// One fetched listing page
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// URL the page was fetched from
    pub url: Url,
    /// Absolute post URLs in page order
    pub links: Vec<String>,
}

/// Shared handle to the board: clients, origin and search query
///
/// Cloning is cheap; the underlying connection pools are shared. Pages and
/// assets go through separate clients because only pages are decompressed.
#[derive(Debug, Clone)]
pub struct Board {
    client: Client,
    asset_client: Client,
    base_url: String,
    query: String,
}

impl Board {
    /// Builds a board handle from configuration
    pub fn new(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(site, crawler.request_timeout_secs)?;
        let asset_client = build_asset_client(site, crawler.request_timeout_secs)?;
        Ok(Self::with_clients(client, asset_client, site))
    }

    /// Builds a board handle around existing page and asset clients
    pub fn with_clients(client: Client, asset_client: Client, site: &SiteConfig) -> Self {
        Self {
            client,
            asset_client,
            base_url: site.base_url.trim_end_matches('/').to_string(),
            query: site.query.clone(),
        }
    }

    /// URL of the listing page starting at item `offset`
    pub fn listing_url(&self, offset: u64) -> Result<Url, HarvestError> {
        let offset = offset.to_string();
        let url = Url::parse_with_params(
            &format!("{}/index.php", self.base_url),
            &[
                ("page", "post"),
                ("s", "list"),
                ("tags", self.query.as_str()),
                ("pid", offset.as_str()),
            ],
        )?;
        Ok(url)
    }

    /// Fetches and parses the listing page at `offset`
    pub async fn fetch_listing(&self, offset: u64) -> Result<ListingPage, HarvestError> {
        let url = self.listing_url(offset)?;
        let body = fetch_page(&self.client, url.as_str()).await?;
        let links = parse_listing(&body, &url).map_err(|message| HarvestError::HtmlParse {
            url: url.to_string(),
            message,
        })?;
        Ok(ListingPage { url, links })
    }

    /// Fetches and parses a post page
    pub async fn fetch_post(&self, post_url: &str) -> Result<PostPage, HarvestError> {
        let url = Url::parse(post_url)?;
        let body = fetch_page(&self.client, post_url).await?;
        parse_post(&body, &url).map_err(|message| HarvestError::HtmlParse {
            url: post_url.to_string(),
            message,
        })
    }

    /// Fetches asset bytes with their declared length
    pub async fn fetch_asset(&self, asset_url: &str) -> Result<FetchedAsset, HarvestError> {
        fetch_asset(&self.asset_client, asset_url).await
    }
}
