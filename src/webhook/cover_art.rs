//! Album art retrieval for cover webhooks

use base64::Engine as _;
use reqwest::StatusCode;
use thiserror::Error;

use super::transport::{DeliveryError, WebhookTransport};

/// Cover art could not be fetched
#[derive(Debug, Error)]
pub enum CoverArtError {
    /// Request failed before a response arrived
    #[error("cover art request failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Art URI answered with something other than 200
    #[error("cover art request returned {0}")]
    Status(StatusCode),
}

/// The track's absolute album art URI, if it has a usable one
#[must_use]
pub fn album_art_uri(track: &serde_json::Value) -> Option<&str> {
    track
        .get("absoluteAlbumArtUri")
        .and_then(serde_json::Value::as_str)
        .filter(|uri| !uri.is_empty())
}

/// Fetch a track's album art and base64-encode it
///
/// Resolves to `None` when the track has no art URI.
///
/// # Errors
///
/// Returns error if the request fails or the status is not 200
pub async fn fetch_cover_art(
    transport: &dyn WebhookTransport,
    track: &serde_json::Value,
) -> Result<Option<String>, CoverArtError> {
    let Some(uri) = album_art_uri(track) else {
        return Ok(None);
    };

    let fetched = transport.get_bytes(uri).await?;
    if fetched.status != StatusCode::OK {
        return Err(CoverArtError::Status(fetched.status));
    }

    tracing::debug!(uri, bytes = fetched.bytes.len(), "fetched cover art");
    Ok(Some(
        base64::engine::general_purpose::STANDARD.encode(fetched.bytes),
    ))
}
