//! Quality-tiered stream URL resolution against the upstream track API.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::manifest::{self, ManifestError};
use crate::models::Quality;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no playable stream URL for any quality tier")]
    NoPlayableStream,
}

/// A playable URL plus the tier that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedStream {
    pub url: String,
    pub quality: Quality,
}

/// One item of a tier response. Responses vary between a direct CDN URL
/// (several field spellings in the wild) and a base64 manifest.
#[derive(Debug, Deserialize)]
struct StreamCandidate {
    #[serde(default, alias = "OriginalTrackUrl", alias = "originalTrackUrl")]
    url: Option<String>,
    #[serde(default)]
    manifest: Option<String>,
}

pub struct StreamResolver {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl StreamResolver {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Resolve a playable stream URL for `track_id`, trying the requested
    /// tier first and falling back through the remaining tiers. Fails only
    /// once every tier is exhausted.
    pub async fn resolve(
        &self,
        track_id: &str,
        requested: Quality,
    ) -> Result<ResolvedStream, ResolveError> {
        for quality in requested.fallback_order() {
            let candidates = match self.fetch_tier(track_id, quality).await {
                Ok(candidates) => candidates,
                Err(err) => {
                    tracing::warn!(track_id, %quality, error = %err, "tier lookup failed");
                    continue;
                }
            };
            tracing::debug!(
                track_id,
                %quality,
                count = candidates.len(),
                "processing tier candidates"
            );

            // Direct URLs outrank manifests within a tier.
            for candidate in &candidates {
                if let Some(url) = candidate
                    .url
                    .as_deref()
                    .filter(|url| url.starts_with("http"))
                {
                    tracing::info!(track_id, %quality, "resolved direct stream URL");
                    return Ok(ResolvedStream {
                        url: manifest::enforce_https(url),
                        quality,
                    });
                }
            }

            for candidate in &candidates {
                let Some(raw) = candidate.manifest.as_deref() else {
                    continue;
                };
                match manifest::extract_stream_url(raw) {
                    Ok(Some(url)) => {
                        tracing::info!(track_id, %quality, "resolved stream URL from manifest");
                        return Ok(ResolvedStream { url, quality });
                    }
                    Ok(None) => {
                        tracing::debug!(
                            track_id,
                            %quality,
                            "skipping segmented manifest without base URL"
                        );
                    }
                    Err(ManifestError::Unusable) => {
                        tracing::debug!(track_id, %quality, "manifest yielded no URL");
                    }
                }
            }

            tracing::warn!(track_id, %quality, "no playable URL in tier");
        }

        Err(ResolveError::NoPlayableStream)
    }

    async fn fetch_tier(&self, track_id: &str, quality: Quality) -> Result<Vec<StreamCandidate>> {
        let url = format!(
            "{}/track/?id={}&quality={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(track_id),
            quality
        );
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .context("track metadata request")?;
        if !resp.status().is_success() {
            bail!("track metadata request returned status {}", resp.status());
        }
        let value: Value = resp.json().await.context("track metadata body")?;
        Ok(normalize_candidates(value))
    }
}

/// Tier responses come in three shapes: a single object, an object wrapping
/// the item under `data`, or a bare list. All normalize to a uniform list;
/// items that are not objects are dropped.
fn normalize_candidates(value: Value) -> Vec<StreamCandidate> {
    let items = match value {
        Value::Object(mut map) if map.contains_key("data") => {
            vec![map.remove("data").unwrap_or(Value::Null)]
        }
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}
