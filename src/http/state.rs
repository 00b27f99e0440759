use crate::pipeline::TranscriptionPipeline;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TranscriptionPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<TranscriptionPipeline>) -> Self {
        Self { pipeline }
    }
}
