//! Stream manifest decoding.
//!
//! Upstream tier responses often carry the playable URL inside a
//! base64-encoded manifest (sometimes URL-safe base64, sometimes already
//! plaintext). Decoding is a two-step pipeline: decode the payload, then
//! extract an absolute URL from it.

use std::sync::LazyLock;

use base64::{Engine as _, engine::general_purpose};
use regex::Regex;
use thiserror::Error;

/// Matches an absolute media URL embedded in XML or plain text.
static STREAM_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s"<>]+(?:\.flac|\.mp4|\.m4a|\?[^\s"<>]*)"#)
        .expect("stream url regex")
});

#[derive(Debug, Error, PartialEq)]
pub enum ManifestError {
    #[error("manifest contains no extractable stream URL")]
    Unusable,
}

/// Extract a playable URL from a manifest string.
///
/// Returns `Ok(None)` for DASH-style segmented manifests that carry a
/// `SegmentTemplate` but no `BaseURL`; those have no single resolvable URL
/// and the resolver should move on to the next candidate. If base64 decoding
/// fails, extraction is retried against the raw manifest text, since some
/// upstreams hand out plaintext manifests.
pub fn extract_stream_url(manifest: &str) -> Result<Option<String>, ManifestError> {
    match decode_base64(manifest) {
        Some(decoded) => {
            if is_segmented_without_base(&decoded) {
                return Ok(None);
            }
            extract_from_payload(&decoded)
                .map(Some)
                .ok_or(ManifestError::Unusable)
        }
        None => extract_from_payload(manifest)
            .map(Some)
            .ok_or(ManifestError::Unusable),
    }
}

/// Upgrade plain-http URLs to https. Insecure stream URLs are never emitted.
pub fn enforce_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Decode standard or URL-safe base64 into text, with or without padding.
/// `None` when the input is not base64 or does not decode to UTF-8.
fn decode_base64(manifest: &str) -> Option<String> {
    let normalized: String = manifest
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    // Upstreams hand out both padded and unpadded payloads; stripping the
    // padding and decoding pad-free accepts both.
    let bytes = general_purpose::STANDARD_NO_PAD
        .decode(normalized.trim_end_matches('=').as_bytes())
        .ok()?;
    String::from_utf8(bytes).ok()
}

fn is_segmented_without_base(payload: &str) -> bool {
    payload.contains("SegmentTemplate") && !payload.contains("BaseURL")
}

/// Pull the first usable URL out of a decoded manifest payload. JSON shapes
/// (`{"urls": [...]}`, `{"url": "..."}`) are tried before the text scan.
fn extract_from_payload(payload: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
        if let Some(url) = value
            .get("urls")
            .and_then(|urls| urls.as_array())
            .and_then(|urls| urls.first())
            .and_then(|url| url.as_str())
        {
            return Some(enforce_https(url));
        }
        if let Some(url) = value.get("url").and_then(|url| url.as_str()) {
            return Some(enforce_https(url));
        }
    }

    // URLs scanned out of XML keep entity-escaped ampersands in their query
    // strings; unescape them before use.
    STREAM_URL_RE
        .find(payload)
        .map(|m| enforce_https(&m.as_str().replace("&amp;", "&")))
}
