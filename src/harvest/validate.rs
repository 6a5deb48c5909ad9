//! Integrity checks for downloaded assets
//!
//! Two checks run on every asset before it is saved:
//! - the received length against the declared `Content-Length`
//! - optionally, a full decode plus a vertical-flip probe of the image

use crate::config::ValidationConfig;
use crate::site::FetchedAsset;
use crate::HarvestError;

/// Checks the received length against the declared length
///
/// An asset is rejected when `|actual - declared| > declared / 5`, or, unless
/// `soft` is set, when it is shorter than declared at all. Over-length
/// assets within the tolerance are always accepted.
///
/// # Example
///
/// ```
/// use booru_harvester::harvest::validate_length;
///
/// assert!(validate_length(1000, 1000, false).is_ok());
/// assert!(validate_length(1000, 850, false).is_err());
/// assert!(validate_length(1000, 850, true).is_ok());
/// assert!(validate_length(1000, 750, true).is_err());
/// ```
pub fn validate_length(declared: u64, actual: u64, soft: bool) -> Result<(), HarvestError> {
    let difference = declared.abs_diff(actual);

    // difference > declared / 5, without integer truncation
    let outside_tolerance = u128::from(difference) * 5 > u128::from(declared);
    let short = actual < declared;

    if outside_tolerance || (!soft && short) {
        return Err(HarvestError::LengthMismatch {
            expected: declared,
            actual,
        });
    }

    Ok(())
}

/// Decodes the image and probes it with a vertical flip
///
/// The bytes are decoded twice: once as a structural check, and once more to
/// flip the result, which surfaces truncations a structural pass can miss.
pub fn validate_image(bytes: &[u8]) -> Result<(), HarvestError> {
    image::load_from_memory(bytes)
        .map_err(|e| HarvestError::ImageValidation(format!("decode failed: {}", e)))?;

    let reloaded = image::load_from_memory(bytes)
        .map_err(|e| HarvestError::ImageValidation(format!("re-decode failed: {}", e)))?;
    let flipped = reloaded.flipv();

    if flipped.width() != reloaded.width() || flipped.height() != reloaded.height() {
        return Err(HarvestError::ImageValidation(
            "flip probe changed dimensions".to_string(),
        ));
    }

    Ok(())
}

/// Runs every enabled check on a fetched asset
///
/// Image decoding is CPU-bound and runs on the blocking pool. The asset is
/// handed back so the caller can persist it without copying.
pub async fn check_asset(
    asset: FetchedAsset,
    config: &ValidationConfig,
) -> Result<FetchedAsset, HarvestError> {
    validate_length(
        asset.declared_length,
        asset.actual_length(),
        config.soft_length_check,
    )?;

    if !config.validate_images {
        return Ok(asset);
    }

    tokio::task::spawn_blocking(move || validate_image(&asset.bytes).map(|()| asset))
        .await
        .map_err(|e| HarvestError::ImageValidation(format!("decoder aborted: {}", e)))?
}
