//! HTTP API handlers.

pub mod download;
pub mod health;
pub mod stream;

pub use download::download_track;
pub use stream::stream_url;
