//! Request/response types shared across the API and the pipeline.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};
use utoipa::ToSchema;

/// Audio quality tier requested by the caller.
///
/// The wire format matches the upstream track API (`LOSSLESS`,
/// `HI_RES_LOSSLESS`, `HIGH`, `LOW`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quality {
    Lossless,
    HiResLossless,
    High,
    Low,
}

/// Fixed fallback priority when a tier yields no playable stream.
const FALLBACK_PRIORITY: [Quality; 4] = [
    Quality::Lossless,
    Quality::High,
    Quality::Low,
    Quality::HiResLossless,
];

impl Quality {
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Lossless => "LOSSLESS",
            Quality::HiResLossless => "HI_RES_LOSSLESS",
            Quality::High => "HIGH",
            Quality::Low => "LOW",
        }
    }

    /// Lossless tiers are delivered as FLAC by the upstream.
    pub fn is_lossless(self) -> bool {
        matches!(self, Quality::Lossless | Quality::HiResLossless)
    }

    /// Tier list for stream resolution: the requested tier first, then the
    /// remaining tiers in fixed priority order, duplicates removed.
    pub fn fallback_order(self) -> Vec<Quality> {
        let mut tiers = vec![self];
        tiers.extend(FALLBACK_PRIORITY.iter().copied().filter(|q| *q != self));
        tiers
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Lossless
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag fields supplied by the caller. All fields are optional; absent fields
/// are never written to the container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub date: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    pub disc_number: Option<u32>,
    pub total_discs: Option<u32>,
    pub cover_url: Option<String>,
    /// Suggested output filename; used for the content-disposition header.
    pub filename: Option<String>,
}

impl TrackMetadata {
    /// True when no tag field or cover URL is populated. The filename is a
    /// transport concern, not a tag.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.album_artist.is_none()
            && self.date.is_none()
            && self.genre.is_none()
            && self.track_number.is_none()
            && self.total_tracks.is_none()
            && self.disc_number.is_none()
            && self.total_discs.is_none()
            && self.cover_url.is_none()
    }
}

/// Body of `POST /download`. Either `trackId` (resolved against the upstream
/// track API) or a pre-resolved `streamUrl` must be present.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Upstream track id; accepted as a JSON string or number.
    #[serde(default, deserialize_with = "string_or_number")]
    #[schema(value_type = Option<String>)]
    pub track_id: Option<String>,
    pub stream_url: Option<String>,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default)]
    pub metadata: TrackMetadata,
}

/// Response of `GET /stream-url`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StreamUrlResponse {
    pub url: String,
    pub quality: Quality,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "trackId must be a string or number, got {other}"
        ))),
    }
}
