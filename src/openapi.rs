use utoipa::OpenApi;

use crate::api;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health,
        api::stream::stream_url,
        api::download::download_track,
    ),
    components(
        schemas(
            models::Quality,
            models::TrackMetadata,
            models::DownloadRequest,
            models::StreamUrlResponse,
            models::ErrorResponse,
            api::health::HealthResponse,
        )
    ),
    tags(
        (name = "audio-tag-proxy", description = "Stream resolution and tagging proxy API")
    )
)]
pub struct ApiDoc;
