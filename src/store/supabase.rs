use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

use super::{TranscriptionRecord, TranscriptionStore};
use crate::config::SupabaseConfig;

/// PostgREST-backed store for transcription rows
pub struct SupabaseStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        let endpoint = format!(
            "{}/rest/v1/{}",
            config.url.trim_end_matches('/'),
            config.table
        );

        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: config.anon_key.clone(),
        }
    }
}

#[async_trait]
impl TranscriptionStore for SupabaseStore {
    async fn insert(&self, record: &TranscriptionRecord) -> Result<()> {
        tracing::debug!(request_id = %record.request_id, "inserting transcription row");

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .context("persistence request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<PostgrestError>(&body)
                .ok()
                .and_then(|error| error.message.or(error.code))
                .unwrap_or_else(|| body.trim().to_string());
            anyhow::bail!("database insert failed (HTTP {}): {}", status, detail);
        }

        Ok(())
    }
}
