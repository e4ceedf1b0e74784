//! Chunked download of resolved stream URLs into ephemeral staging files.

use std::io::Write;
use std::time::Duration;

use futures_util::StreamExt;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::format::{self, AudioFormat};
use crate::models::Quality;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered with a non-2xx status; the code is preserved so the
    /// API boundary can proxy it instead of collapsing to a generic 500.
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16 },
    /// Distinct from a hard failure; the caller may retry.
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream transport error: {0}")]
    Transport(reqwest::Error),
    #[error("staging audio bytes: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloaded audio staged on disk. The temp file is deleted on drop, so the
/// staging bytes are released on every exit path.
#[derive(Debug)]
pub struct FetchedAudio {
    pub file: NamedTempFile,
    pub format: AudioFormat,
    pub len: u64,
}

pub struct AudioFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl AudioFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Stream the response body in chunks into a suffixed temp file rather
    /// than one allocation, bounding peak memory for large lossless files.
    pub async fn fetch(&self, url: &str, quality: Quality) -> Result<FetchedAudio, FetchError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let format = format::detect(content_type.as_deref(), quality);

        let mut file = tempfile::Builder::new()
            .suffix(format.suffix())
            .tempfile()?;
        let mut stream = resp.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify)?;
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        file.flush()?;

        tracing::debug!(bytes = written, %format, "audio staged");
        Ok(FetchedAudio {
            file,
            format,
            len: written,
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err)
    }
}
