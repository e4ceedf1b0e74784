//! Configuration loading and parsing.
//!
//! Defines the server config schema and resolves defaults.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const DEFAULT_USER_AGENT: &str = concat!("audio-tag-proxy/", env!("CARGO_PKG_VERSION"));
const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 15;
const DEFAULT_AUDIO_TIMEOUT_SECS: u64 = 120;
const DEFAULT_COVER_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_COVER_BYTES: usize = 5_000_000;

/// Top-level server configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Bind address (host:port).
    pub bind: Option<String>,
    /// Base URL of the upstream track API.
    pub upstream_base_url: Option<String>,
    /// User-Agent sent on all upstream requests.
    pub user_agent: Option<String>,
    /// Timeout for track metadata / manifest lookups, in seconds.
    pub metadata_timeout_secs: Option<u64>,
    /// Timeout for the audio download, in seconds (lossless files are big).
    pub audio_timeout_secs: Option<u64>,
    /// Timeout for cover art downloads, in seconds.
    pub cover_timeout_secs: Option<u64>,
    /// Upper bound for accepted cover images, in bytes.
    pub max_cover_bytes: Option<usize>,
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {:?}", path))?;
        toml::from_str(&raw).with_context(|| format!("parse config {:?}", path))
    }
}

/// Upstream settings resolved to concrete values.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub user_agent: String,
    pub metadata_timeout: Duration,
    pub audio_timeout: Duration,
    pub cover_timeout: Duration,
    pub max_cover_bytes: usize,
}

pub fn bind_from_config(cfg: &ServerConfig) -> Result<Option<SocketAddr>> {
    match cfg.bind.as_deref() {
        Some(raw) => {
            let addr = raw
                .parse()
                .with_context(|| format!("invalid bind address {raw:?}"))?;
            Ok(Some(addr))
        }
        None => Ok(None),
    }
}

/// Resolve upstream settings; a CLI override takes precedence over the
/// config file. The base URL is the only setting with no default.
pub fn upstream_from_config(
    cfg: &ServerConfig,
    base_url_override: Option<String>,
) -> Result<UpstreamConfig> {
    let base_url = match base_url_override.or_else(|| cfg.upstream_base_url.clone()) {
        Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
        _ => bail!("upstream_base_url is required; set it in the config or via --upstream-base-url"),
    };
    Ok(UpstreamConfig {
        base_url,
        user_agent: cfg
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        metadata_timeout: Duration::from_secs(
            cfg.metadata_timeout_secs
                .unwrap_or(DEFAULT_METADATA_TIMEOUT_SECS),
        ),
        audio_timeout: Duration::from_secs(
            cfg.audio_timeout_secs.unwrap_or(DEFAULT_AUDIO_TIMEOUT_SECS),
        ),
        cover_timeout: Duration::from_secs(
            cfg.cover_timeout_secs.unwrap_or(DEFAULT_COVER_TIMEOUT_SECS),
        ),
        max_cover_bytes: cfg.max_cover_bytes.unwrap_or(DEFAULT_MAX_COVER_BYTES),
    })
}
