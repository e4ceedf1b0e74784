//! Actix server startup + app wiring.
//!
//! Builds the shared state, routes, middleware, and OpenAPI endpoints.

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Result;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::config;
use crate::openapi;
use crate::pipeline::Pipeline;
use crate::state::AppState;

/// Build server state and start the Actix HTTP server.
pub(crate) async fn run(args: crate::Args) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let bind = resolve_bind(args.bind, &cfg)?;
    let upstream = config::upstream_from_config(&cfg, args.upstream_base_url)?;
    tracing::info!(
        bind = %bind,
        upstream = %upstream.base_url,
        "starting audio-tag-proxy"
    );

    let pipeline = Pipeline::new(&upstream)?;
    let state = web::Data::new(AppState::new(pipeline));

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default().exclude("/health"))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
            )
            .service(api::health::health)
            .service(api::stream_url)
            .service(api::download_track)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

/// An explicit config path must exist; without one, a `config.toml` next to
/// the executable is picked up when present, else defaults apply.
fn load_config(path: Option<&PathBuf>) -> Result<config::ServerConfig> {
    if let Some(path) = path {
        return config::ServerConfig::load(path);
    }
    let auto_path = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("config.toml")));
    match auto_path {
        Some(path) if path.exists() => config::ServerConfig::load(&path),
        _ => Ok(config::ServerConfig::default()),
    }
}

fn resolve_bind(cli: Option<SocketAddr>, cfg: &config::ServerConfig) -> Result<SocketAddr> {
    if let Some(addr) = cli {
        return Ok(addr);
    }
    Ok(config::bind_from_config(cfg)?
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080))))
}
