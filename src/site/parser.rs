//! HTML extraction for listing and post pages
//!
//! Listing pages hold post links inside `.thumbnail-container`. Post pages
//! carry their metadata as attributes of `.image-container` and link the
//! full-resolution asset through an anchor labelled `Original image`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Label of the anchor pointing at the full-resolution asset
pub const ORIGINAL_IMAGE_LABEL: &str = "Original image";

/// Metadata and asset link extracted from a post page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPage {
    /// Content rating (`data-rating`)
    pub rating: String,

    /// Tags in page order (`data-tags`, whitespace separated)
    pub tags: Vec<String>,

    /// Absolute URL of the full-resolution asset, if the page links one
    pub asset_url: Option<String>,
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector {}: {:?}", css, e))
}

fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base_url.join(href).ok().map(|url| url.to_string())
}

/// Extracts post links from a listing page, in page order
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Absolute post URLs; empty when the listing is exhausted
/// * `Err(String)` - The page has no thumbnail container
pub fn parse_listing(html: &str, page_url: &Url) -> Result<Vec<String>, String> {
    let document = Html::parse_document(html);
    let container_selector = selector(".thumbnail-container")?;
    let anchor_selector = selector("a[href]")?;

    let container = document
        .select(&container_selector)
        .next()
        .ok_or_else(|| "listing has no .thumbnail-container".to_string())?;

    let links = container
        .select(&anchor_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_link(href, page_url))
        .collect();

    Ok(links)
}

/// Extracts rating, tags and the asset link from a post page
///
/// # Returns
///
/// * `Ok(PostPage)` - Successfully parsed page
/// * `Err(String)` - The metadata container or one of its attributes is missing
pub fn parse_post(html: &str, page_url: &Url) -> Result<PostPage, String> {
    let document = Html::parse_document(html);
    let container_selector = selector(".image-container")?;
    let anchor_selector = selector("a")?;

    let container = document
        .select(&container_selector)
        .next()
        .ok_or_else(|| "post has no .image-container".to_string())?;

    let rating = container
        .value()
        .attr("data-rating")
        .ok_or_else(|| "post has no data-rating".to_string())?
        .trim()
        .to_string();

    let tags = container
        .value()
        .attr("data-tags")
        .ok_or_else(|| "post has no data-tags".to_string())?
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let asset_url = document
        .select(&anchor_selector)
        .find(|anchor| anchor_text(anchor) == ORIGINAL_IMAGE_LABEL)
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| resolve_link(href, page_url));

    Ok(PostPage {
        rating,
        tags,
        asset_url,
    })
}

fn anchor_text(anchor: &ElementRef<'_>) -> String {
    anchor.text().collect::<String>().trim().to_string()
}
