//! Best-effort cover image download.

use std::time::Duration;

pub struct CoverArtFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl CoverArtFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            client,
            timeout,
            max_bytes,
        }
    }

    /// Fetch cover bytes, or `None` on any failure. Cover art is auxiliary:
    /// a missing image must never fail the surrounding request, so errors
    /// are logged and swallowed here.
    pub async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let resp = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(error = %err, "cover art request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "cover art fetch returned non-2xx");
            return None;
        }
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "cover art body read failed");
                return None;
            }
        };
        if bytes.is_empty() {
            tracing::warn!("cover art fetch returned empty body");
            return None;
        }
        if bytes.len() > self.max_bytes {
            tracing::warn!(
                bytes = bytes.len(),
                limit = self.max_bytes,
                "cover art exceeds size limit"
            );
            return None;
        }
        tracing::debug!(bytes = bytes.len(), "cover art fetched");
        Some(bytes.to_vec())
    }
}
