use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

use super::{Transcriber, TranscriptionResponse};
use crate::config::DeepgramConfig;
use crate::features::OptionMap;

/// Hosted pre-recorded transcription endpoint.
pub const DEFAULT_LISTEN_URL: &str = "https://api.deepgram.com/v1/listen";

/// Deepgram pre-recorded API client
pub struct DeepgramTranscriber {
    client: reqwest::Client,
    listen_url: String,
    api_key: String,
}

/// Error body returned by the listen endpoint.
#[derive(Debug, Deserialize)]
struct ApiError {
    err_code: Option<String>,
    err_msg: Option<String>,
}

impl DeepgramTranscriber {
    pub fn new(config: &DeepgramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            listen_url: config.listen_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        content_type: &str,
        options: &OptionMap,
    ) -> Result<TranscriptionResponse> {
        let query: Vec<(&str, String)> = options
            .iter()
            .map(|(key, value)| (key.as_str(), value.to_query()))
            .collect();

        tracing::debug!(bytes = audio.len(), "submitting audio for transcription");

        let response = self
            .client
            .post(&self.listen_url)
            .header(header::AUTHORIZATION, format!("Token {}", self.api_key))
            .header(header::CONTENT_TYPE, content_type)
            .query(&query)
            .body(audio)
            .send()
            .await
            .context("transcription request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Deepgram returned HTTP {}: {}",
                status,
                error_detail(&body)
            );
        }

        response
            .json::<TranscriptionResponse>()
            .await
            .context("failed to decode transcription response")
    }
}

/// Best human-readable detail from a vendor error body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .ok()
        .and_then(|error| error.err_msg.or(error.err_code))
        .unwrap_or_else(|| body.trim().to_string())
}
