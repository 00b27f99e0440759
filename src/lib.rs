//! Deeptube - transcribe YouTube audio with Deepgram and persist the results
//!
//! This library downloads the audio track of a YouTube video to scratch
//! storage under a hard time bound, submits it to the Deepgram pre-recorded
//! speech-to-text API, and stores the result in a Supabase table.

pub mod cli;
pub mod config;
pub mod features;
pub mod http;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod transcribe;

pub use config::Config;
pub use features::{Feature, FeatureValue};
pub use pipeline::{Source, TranscribeReceipt, TranscribeRequest, TranscriptionPipeline};
pub use source::{MediaSource, YoutubeSource};
pub use store::{SupabaseStore, TranscriptionStore};
pub use transcribe::{DeepgramTranscriber, Transcriber};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failures surfaced by the transcription pipeline
#[derive(thiserror::Error, Debug)]
pub enum TranscribeError {
    #[error("Download timeout exceeded")]
    DownloadTimeout,

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("{0}")]
    TranscriptionFailed(String),

    #[error("{0}")]
    PersistenceFailed(String),

    #[error("An unknown error occurred")]
    Unknown,
}
