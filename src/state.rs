//! Shared application state.

use crate::pipeline::Pipeline;

/// State shared across Actix workers. The pipeline owns the HTTP clients;
/// everything in here is immutable after startup.
pub struct AppState {
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }
}
