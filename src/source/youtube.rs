use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use std::process::Stdio;
use tokio::process::Command;

use super::{AudioStream, MediaSource};
use crate::Result;

/// YouTube audio source backed by yt-dlp
///
/// The direct URL of the best audio-only format is resolved with yt-dlp and
/// the bytes are streamed over HTTP, so the caller can cancel mid-download by
/// dropping the stream.
pub struct YoutubeSource {
    yt_dlp_path: String,
    client: reqwest::Client,
}

impl YoutubeSource {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> Result<bool> {
        let output = Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        Ok(output.map(|output| output.status.success()).unwrap_or(false))
    }

    /// Resolve the direct URL of the best audio-only format.
    async fn resolve_audio_url(&self, video_id: &str) -> Result<String> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        tracing::debug!(%watch_url, "resolving audio stream URL");

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--format",
                "bestaudio",
                "--get-url",
                "--no-playlist",
                watch_url.as_str(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let stdout = String::from_utf8(output.stdout)?;
        let url = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| anyhow::anyhow!("yt-dlp returned no stream URL"))?;

        Ok(url.to_string())
    }
}

#[async_trait]
impl MediaSource for YoutubeSource {
    async fn audio_stream(&self, video_id: &str) -> Result<AudioStream> {
        let audio_url = self.resolve_audio_url(video_id).await?;

        let response = self.client.get(audio_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch audio stream: HTTP {}", response.status());
        }

        Ok(response
            .bytes_stream()
            .map_err(anyhow::Error::from)
            .boxed())
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}
