//! HTTP API exposing the transcription pipeline:
//! - POST /transcribe - Download, transcribe, and persist one video
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
