//! The resolve → fetch → detect → tag pipeline.
//!
//! One invocation per request, stages strictly sequential, no state shared
//! between invocations. Resolver and fetch failures are fatal; tagging
//! failures degrade to returning the untagged audio.

use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::cover_art::CoverArtFetcher;
use crate::fetcher::{AudioFetcher, FetchError, FetchedAudio};
use crate::format::AudioFormat;
use crate::models::{Quality, TrackMetadata};
use crate::resolver::{ResolveError, ResolvedStream, StreamResolver};
use crate::tag_writer;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a track id or stream URL is required")]
    MissingInput,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Outcome of the tagging stage. `Failed` still yields playable audio; the
/// reason is surfaced as a diagnostic header by the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggingStatus {
    Applied,
    /// No tag fields were supplied; the container was returned as fetched.
    Skipped,
    Failed(String),
}

impl TaggingStatus {
    /// True unless the tag write itself failed. A failed cover download
    /// never flips this; cover art is best-effort.
    pub fn succeeded(&self) -> bool {
        !matches!(self, TaggingStatus::Failed(_))
    }
}

pub struct PipelineRequest {
    pub track_id: Option<String>,
    pub stream_url: Option<String>,
    pub quality: Quality,
    pub metadata: TrackMetadata,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    pub tagging: TaggingStatus,
}

pub struct Pipeline {
    resolver: StreamResolver,
    fetcher: AudioFetcher,
    covers: CoverArtFetcher,
}

impl Pipeline {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            resolver: StreamResolver::new(
                client.clone(),
                cfg.base_url.clone(),
                cfg.metadata_timeout,
            ),
            fetcher: AudioFetcher::new(client.clone(), cfg.audio_timeout),
            covers: CoverArtFetcher::new(client, cfg.cover_timeout, cfg.max_cover_bytes),
        })
    }

    /// Used by the resolver-only API endpoint.
    pub fn resolver(&self) -> &StreamResolver {
        &self.resolver
    }

    pub async fn run(&self, req: PipelineRequest) -> Result<PipelineOutput, PipelineError> {
        let resolved = self.resolve_stage(&req).await?;

        tracing::info!(quality = %resolved.quality, "pipeline fetching audio");
        let audio = self.fetcher.fetch(&resolved.url, resolved.quality).await?;
        tracing::info!(format = %audio.format, bytes = audio.len, "pipeline detected format");

        let (bytes, tagging) = self.tag_stage(&audio, &req.metadata).await?;
        tracing::info!(
            format = %audio.format,
            tagged = tagging.succeeded(),
            "pipeline ready"
        );
        Ok(PipelineOutput {
            bytes,
            format: audio.format,
            tagging,
        })
    }

    /// A caller-resolved stream URL short-circuits tier resolution.
    async fn resolve_stage(&self, req: &PipelineRequest) -> Result<ResolvedStream, PipelineError> {
        if let Some(url) = req.stream_url.as_deref().filter(|url| !url.is_empty()) {
            tracing::debug!(quality = %req.quality, "using caller-supplied stream URL");
            return Ok(ResolvedStream {
                url: url.to_string(),
                quality: req.quality,
            });
        }
        let Some(track_id) = req.track_id.as_deref().filter(|id| !id.is_empty()) else {
            return Err(PipelineError::MissingInput);
        };
        tracing::info!(track_id, quality = %req.quality, "pipeline resolving stream");
        Ok(self.resolver.resolve(track_id, req.quality).await?)
    }

    /// Tag into a copy of the staged audio so a failed save can never leak a
    /// half-written container; on any tagging error the original untagged
    /// bytes are returned instead.
    async fn tag_stage(
        &self,
        audio: &FetchedAudio,
        meta: &TrackMetadata,
    ) -> Result<(Vec<u8>, TaggingStatus), PipelineError> {
        if meta.is_empty() {
            let bytes = tokio::fs::read(audio.file.path())
                .await
                .context("read staged audio")?;
            return Ok((bytes, TaggingStatus::Skipped));
        }

        let cover = match meta.cover_url.as_deref() {
            Some(url) => self.covers.fetch(url).await,
            None => None,
        };

        tracing::info!(format = %audio.format, cover = cover.is_some(), "pipeline tagging");
        match write_tagged_copy(audio, meta, cover.as_deref()) {
            Ok(bytes) => Ok((bytes, TaggingStatus::Applied)),
            Err(err) => {
                tracing::warn!(error = %err, "tag write failed; returning untagged audio");
                let bytes = tokio::fs::read(audio.file.path())
                    .await
                    .context("read staged audio after tag failure")?;
                Ok((bytes, TaggingStatus::Failed(err.to_string())))
            }
        }
    }
}

fn write_tagged_copy(
    audio: &FetchedAudio,
    meta: &TrackMetadata,
    cover: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let staged = tempfile::Builder::new()
        .suffix(audio.format.suffix())
        .tempfile()
        .context("stage tagging copy")?;
    std::fs::copy(audio.file.path(), staged.path()).context("copy staged audio")?;
    // The tag library can panic on containers truncated at the metadata
    // boundary; a panicking save has to degrade like any other tag failure.
    let saved = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        tag_writer::write_track_tags(staged.path(), audio.format, meta, cover)
    }));
    match saved {
        Ok(Ok(())) => std::fs::read(staged.path()).context("read tagged audio"),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(anyhow::anyhow!("tag write panicked on malformed container")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::minimal_flac;
    use lofty::{Accessor, TaggedFileExt, read_from_path};

    fn pipeline_for(server: &mockito::ServerGuard) -> Pipeline {
        let cfg = UpstreamConfig {
            base_url: server.url(),
            user_agent: "pipeline-tests".to_string(),
            metadata_timeout: Duration::from_secs(5),
            audio_timeout: Duration::from_secs(5),
            cover_timeout: Duration::from_secs(5),
            max_cover_bytes: 1024 * 1024,
        };
        Pipeline::new(&cfg).unwrap()
    }

    fn request(stream_url: String, metadata: TrackMetadata) -> PipelineRequest {
        PipelineRequest {
            track_id: None,
            stream_url: Some(stream_url),
            quality: Quality::Lossless,
            metadata,
        }
    }

    fn read_tagged(bytes: &[u8]) -> lofty::TaggedFile {
        let file = tempfile::Builder::new()
            .suffix(".flac")
            .tempfile()
            .unwrap();
        std::fs::write(file.path(), bytes).unwrap();
        read_from_path(file.path()).unwrap()
    }

    #[tokio::test]
    async fn missing_input_is_rejected() {
        let server = mockito::Server::new_async().await;
        let err = pipeline_for(&server)
            .run(PipelineRequest {
                track_id: None,
                stream_url: None,
                quality: Quality::Lossless,
                metadata: TrackMetadata::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput));
    }

    #[tokio::test]
    async fn upstream_403_terminates_with_preserved_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/audio")
            .with_status(403)
            .create_async()
            .await;

        let err = pipeline_for(&server)
            .run(request(
                format!("{}/audio", server.url()),
                TrackMetadata::default(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Fetch(FetchError::UpstreamStatus { status: 403 })
        ));
    }

    #[tokio::test]
    async fn empty_metadata_returns_audio_bit_identical() {
        let mut server = mockito::Server::new_async().await;
        let fixture = minimal_flac();
        let _m = server
            .mock("GET", "/audio")
            .with_header("content-type", "audio/flac")
            .with_body(fixture.clone())
            .create_async()
            .await;

        let output = pipeline_for(&server)
            .run(request(
                format!("{}/audio", server.url()),
                TrackMetadata::default(),
            ))
            .await
            .unwrap();
        assert_eq!(output.bytes, fixture);
        assert_eq!(output.format, AudioFormat::Flac);
        assert_eq!(output.tagging, TaggingStatus::Skipped);
    }

    #[tokio::test]
    async fn failed_cover_download_does_not_fail_tagging() {
        let mut server = mockito::Server::new_async().await;
        let _audio = server
            .mock("GET", "/audio")
            .with_header("content-type", "audio/flac")
            .with_body(minimal_flac())
            .create_async()
            .await;
        let _cover = server
            .mock("GET", "/cover.jpg")
            .with_status(404)
            .create_async()
            .await;

        let metadata = TrackMetadata {
            title: Some("A".to_string()),
            artist: Some("B".to_string()),
            cover_url: Some(format!("{}/cover.jpg", server.url())),
            ..Default::default()
        };
        let output = pipeline_for(&server)
            .run(request(format!("{}/audio", server.url()), metadata))
            .await
            .unwrap();

        assert_eq!(output.tagging, TaggingStatus::Applied);
        let tagged = read_tagged(&output.bytes);
        let tag = tagged.primary_tag().unwrap();
        assert_eq!(tag.title().as_deref(), Some("A"));
        assert_eq!(tag.artist().as_deref(), Some("B"));
        assert!(tag.pictures().is_empty());
    }

    #[tokio::test]
    async fn successful_cover_is_embedded() {
        let mut server = mockito::Server::new_async().await;
        let _audio = server
            .mock("GET", "/audio")
            .with_header("content-type", "audio/flac")
            .with_body(minimal_flac())
            .create_async()
            .await;
        let _cover = server
            .mock("GET", "/cover.jpg")
            .with_body(b"jpeg-bytes")
            .create_async()
            .await;

        let metadata = TrackMetadata {
            title: Some("A".to_string()),
            cover_url: Some(format!("{}/cover.jpg", server.url())),
            ..Default::default()
        };
        let output = pipeline_for(&server)
            .run(request(format!("{}/audio", server.url()), metadata))
            .await
            .unwrap();

        assert_eq!(output.tagging, TaggingStatus::Applied);
        let tagged = read_tagged(&output.bytes);
        let tag = tagged.primary_tag().unwrap();
        assert_eq!(tag.pictures().len(), 1);
        assert_eq!(tag.pictures()[0].data(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn unparseable_audio_degrades_to_untagged_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _audio = server
            .mock("GET", "/audio")
            .with_header("content-type", "audio/flac")
            .with_body(b"definitely not a flac container")
            .create_async()
            .await;

        let metadata = TrackMetadata {
            title: Some("A".to_string()),
            ..Default::default()
        };
        let output = pipeline_for(&server)
            .run(request(format!("{}/audio", server.url()), metadata))
            .await
            .unwrap();

        assert_eq!(output.bytes, b"definitely not a flac container");
        assert!(matches!(output.tagging, TaggingStatus::Failed(_)));
    }

    #[tokio::test]
    async fn frameless_container_degrades_to_untagged_bytes() {
        // Valid header and STREAMINFO but no audio frames: the tag save
        // panics inside the container writer instead of erroring.
        let mut truncated = minimal_flac();
        truncated.truncate(42);

        let mut server = mockito::Server::new_async().await;
        let _audio = server
            .mock("GET", "/audio")
            .with_header("content-type", "audio/flac")
            .with_body(truncated.clone())
            .create_async()
            .await;

        let metadata = TrackMetadata {
            title: Some("A".to_string()),
            ..Default::default()
        };
        let output = pipeline_for(&server)
            .run(request(format!("{}/audio", server.url()), metadata))
            .await
            .unwrap();

        assert_eq!(output.bytes, truncated);
        assert!(matches!(output.tagging, TaggingStatus::Failed(_)));
    }

    #[tokio::test]
    async fn exhausted_resolution_surfaces_no_playable_stream() {
        let mut server = mockito::Server::new_async().await;
        let _any = server
            .mock("GET", "/track/")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .expect(4)
            .create_async()
            .await;

        let err = pipeline_for(&server)
            .run(PipelineRequest {
                track_id: Some("42".to_string()),
                stream_url: None,
                quality: Quality::Lossless,
                metadata: TrackMetadata::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Resolve(ResolveError::NoPlayableStream)
        ));
    }
}
