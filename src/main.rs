mod api;
mod config;
mod cover_art;
mod fetcher;
mod format;
mod manifest;
mod models;
mod openapi;
mod pipeline;
mod resolver;
mod startup;
mod state;
mod tag_writer;
#[cfg(test)]
mod testutil;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "audio-tag-proxy")]
struct Args {
    /// HTTP bind address, e.g. 0.0.0.0:8080
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Base URL of the upstream track API
    #[arg(long)]
    upstream_base_url: Option<String>,

    /// Optional server config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,actix_web=info")),
        )
        .init();

    startup::run(args).await
}
