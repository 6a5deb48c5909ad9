//! Item identity and lifecycle
//!
//! An item is one post with one downloadable asset. Its identifier is the
//! numeric `id` query parameter of the post URL and serves as both the
//! deduplication key and the stem of the saved file name.

mod state;

pub use state::ItemState;

use crate::HarvestError;
use url::Url;

/// Extracts the item identifier from a post URL
///
/// # Arguments
///
/// * `post_url` - Absolute URL of a post page, e.g.
///   `https://booru.example.com/index.php?page=post&s=view&id=1234`
///
/// # Returns
///
/// * `Ok(String)` - The identifier (`"1234"` above)
/// * `Err(HarvestError::MissingIdentifier)` - The URL carries no numeric `id`
///
/// # Example
///
/// ```
/// use booru_harvester::item::extract_item_id;
///
/// let id = extract_item_id("https://booru.example.com/index.php?page=post&s=view&id=42").unwrap();
/// assert_eq!(id, "42");
/// ```
pub fn extract_item_id(post_url: &str) -> Result<String, HarvestError> {
    let missing = || HarvestError::MissingIdentifier {
        url: post_url.to_string(),
    };

    let url = Url::parse(post_url).map_err(|_| missing())?;

    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(missing)
}
