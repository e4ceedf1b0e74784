//! Resolver-only endpoint: return the playable URL without downloading it.

use actix_web::{HttpResponse, Responder, get, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::models::{ErrorResponse, Quality, StreamUrlResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct StreamUrlQuery {
    /// Upstream track id.
    pub id: String,
    #[serde(default)]
    pub quality: Quality,
}

/// Resolve the stream URL for a track at the best available quality tier.
#[utoipa::path(
    get,
    path = "/stream-url",
    params(StreamUrlQuery),
    responses(
        (status = 200, description = "Resolved stream URL", body = StreamUrlResponse),
        (status = 502, description = "No playable stream for any tier", body = ErrorResponse),
    )
)]
#[get("/stream-url")]
pub async fn stream_url(
    state: web::Data<AppState>,
    query: web::Query<StreamUrlQuery>,
) -> impl Responder {
    match state
        .pipeline
        .resolver()
        .resolve(&query.id, query.quality)
        .await
    {
        Ok(resolved) => HttpResponse::Ok().json(StreamUrlResponse {
            url: resolved.url,
            quality: resolved.quality,
        }),
        Err(err) => {
            tracing::warn!(track_id = %query.id, error = %err, "stream URL resolution failed");
            HttpResponse::BadGateway().json(ErrorResponse::new(err.to_string()))
        }
    }
}
