//! The download endpoint: resolve, fetch, tag, and return the audio file.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, post, web};

use crate::fetcher::FetchError;
use crate::models::{DownloadRequest, ErrorResponse};
use crate::pipeline::{PipelineError, PipelineOutput, PipelineRequest, TaggingStatus};
use crate::resolver::ResolveError;
use crate::state::AppState;

/// Longest tagging error detail carried in the diagnostic header.
const MAX_ERROR_HEADER_LEN: usize = 200;

/// Download a track as a tagged audio file.
///
/// Either `trackId` or `streamUrl` must be present. The response body is the
/// raw FLAC or MP4 file; tagging outcome is reported via the
/// `X-Tagging-Applied` header so a failed tag write still delivers audio.
#[utoipa::path(
    post,
    path = "/download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Tagged audio file (FLAC or MP4 body)"),
        (status = 400, description = "Neither trackId nor streamUrl supplied", body = ErrorResponse),
        (status = 502, description = "No playable stream or upstream failure", body = ErrorResponse),
        (status = 504, description = "Upstream timed out", body = ErrorResponse),
    )
)]
#[post("/download")]
pub async fn download_track(
    state: web::Data<AppState>,
    body: web::Json<DownloadRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let filename = req.metadata.filename.clone();
    let request = PipelineRequest {
        track_id: req.track_id,
        stream_url: req.stream_url,
        quality: req.quality,
        metadata: req.metadata,
    };

    match state.pipeline.run(request).await {
        Ok(output) => audio_response(output, filename.as_deref()),
        Err(err) => error_response(err),
    }
}

fn audio_response(output: PipelineOutput, filename: Option<&str>) -> HttpResponse {
    let name = filename
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("track.{}", output.format.extension()));

    // Tri-state so an empty-metadata request is distinguishable from a
    // failed tag write.
    let tagging_header = match &output.tagging {
        TaggingStatus::Applied => "true",
        TaggingStatus::Skipped => "skipped",
        TaggingStatus::Failed(_) => "false",
    };

    let mut resp = HttpResponse::Ok();
    resp.content_type(output.format.mime())
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{name}\""),
        ))
        .insert_header(("X-Tagging-Applied", tagging_header));
    if let TaggingStatus::Failed(reason) = &output.tagging {
        let mut detail = sanitize_filename(reason);
        detail.truncate(MAX_ERROR_HEADER_LEN);
        resp.insert_header(("X-Tagging-Error", detail));
    }
    resp.body(output.bytes)
}

fn error_response(err: PipelineError) -> HttpResponse {
    let status = match &err {
        PipelineError::MissingInput => StatusCode::BAD_REQUEST,
        PipelineError::Resolve(ResolveError::NoPlayableStream) => StatusCode::BAD_GATEWAY,
        PipelineError::Fetch(FetchError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Fetch(FetchError::UpstreamStatus { status }) => {
            // Proxy the upstream failure code when it is a valid error
            // status; anything else collapses to 502.
            StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY)
        }
        PipelineError::Fetch(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(%status, error = %err, "download request failed");
    HttpResponse::build(status).json(ErrorResponse::new(err.to_string()))
}

/// Restrict header-bound text to printable ASCII without quotes so a
/// caller-supplied filename can never break out of the header value.
fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect()
}
