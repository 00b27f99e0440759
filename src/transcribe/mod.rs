use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod deepgram;

pub use deepgram::DeepgramTranscriber;

use crate::features::OptionMap;
use crate::Result;

/// Vendor payload returned for one transcription job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub metadata: TranscriptionMetadata,

    /// Channel/alternative tree as returned by the vendor. Kept unshaped
    /// since it is persisted wholesale rather than interpreted.
    pub results: serde_json::Value,
}

/// Job-level metadata; `request_id` keys the stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionMetadata {
    pub request_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Audio duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,

    /// Remaining vendor metadata, preserved for persistence.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Trait for submitting audio to a speech-to-text service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Submit one audio payload with the merged vendor options.
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        content_type: &str,
        options: &OptionMap,
    ) -> Result<TranscriptionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips_unknown_fields() {
        let payload = serde_json::json!({
            "metadata": {
                "request_id": "dg-123",
                "created": "2024-05-01T12:00:00Z",
                "duration": 12.5,
                "channels": 1,
                "sha256": "abc",
                "models": ["nova-2"]
            },
            "results": { "channels": [] }
        });

        let response: TranscriptionResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(response.metadata.request_id, "dg-123");
        assert_eq!(response.metadata.duration, Some(12.5));
        assert_eq!(response.metadata.channels, Some(1));
        assert!(response.metadata.extra.contains_key("sha256"));

        let back = serde_json::to_value(&response).unwrap();
        assert_eq!(back["metadata"]["sha256"], "abc");
        assert_eq!(back["metadata"]["request_id"], "dg-123");
    }
}
