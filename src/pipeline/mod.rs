use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::features::{self, Feature};
use crate::source::{parse_video_id, AudioStream, MediaSource};
use crate::store::{TranscriptionRecord, TranscriptionStore};
use crate::transcribe::{Transcriber, TranscriptionResponse};
use crate::{Result, TranscribeError};

/// How long the audio download may run before the pipeline gives up.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Content type of the scratch audio file.
const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// One transcription request as received at the boundary. Immutable once
/// received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeRequest {
    pub source: Source,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
}

/// Successful pipeline outcome: the vendor-issued request identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeReceipt {
    pub request_id: String,
}

/// Drives one request through download, transcription, and persistence.
///
/// Collaborators are injected so they can be replaced with test doubles;
/// the pipeline owns only the scratch directory.
pub struct TranscriptionPipeline {
    source: Arc<dyn MediaSource>,
    transcriber: Arc<dyn Transcriber>,
    store: Arc<dyn TranscriptionStore>,
    scratch_dir: TempDir,
}

impl TranscriptionPipeline {
    /// Create a pipeline with a fresh scratch directory.
    pub fn new(
        source: Arc<dyn MediaSource>,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<dyn TranscriptionStore>,
    ) -> Result<Self> {
        let scratch_dir = TempDir::new().context("Failed to create scratch directory")?;
        Ok(Self::with_scratch_dir(source, transcriber, store, scratch_dir))
    }

    /// Create a pipeline over a caller-provided scratch directory.
    pub fn with_scratch_dir(
        source: Arc<dyn MediaSource>,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<dyn TranscriptionStore>,
        scratch_dir: TempDir,
    ) -> Self {
        Self {
            source,
            transcriber,
            store,
            scratch_dir,
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// Returns the vendor request identifier on success. The scratch file is
    /// removed on every path once created; a failed removal is logged and
    /// never surfaced to the caller.
    pub async fn run(
        &self,
        request: &TranscribeRequest,
    ) -> std::result::Result<TranscribeReceipt, TranscribeError> {
        let video_id = parse_video_id(&request.source.url).ok_or_else(|| {
            TranscribeError::DownloadFailed(format!(
                "unrecognized video URL: {}",
                request.source.url
            ))
        })?;

        // One scratch file per video id; concurrent requests for the same
        // video share the path and are not coordinated.
        let audio_path = self.scratch_dir.path().join(format!("ytdl-{video_id}.mp3"));

        info!(%video_id, path = %audio_path.display(), "starting transcription pipeline");

        let outcome = self
            .download_and_transcribe(request, &video_id, &audio_path)
            .await;

        if let Err(err) = tokio::fs::remove_file(&audio_path).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %audio_path.display(), %err, "failed to remove scratch audio file");
            }
        }

        outcome
    }

    async fn download_and_transcribe(
        &self,
        request: &TranscribeRequest,
        video_id: &str,
        audio_path: &Path,
    ) -> std::result::Result<TranscribeReceipt, TranscribeError> {
        let file = File::create(audio_path)
            .await
            .map_err(|err| TranscribeError::DownloadFailed(err.to_string()))?;

        let stream = self
            .source
            .audio_stream(video_id)
            .await
            .map_err(|err| TranscribeError::DownloadFailed(err.to_string()))?;

        // The deadline races the copy; dropping the losing copy future drops
        // the stream and with it the underlying download.
        match tokio::time::timeout(DOWNLOAD_TIMEOUT, write_stream(stream, file)).await {
            Err(_) => return Err(TranscribeError::DownloadTimeout),
            Ok(Err(err)) => return Err(TranscribeError::DownloadFailed(err.to_string())),
            Ok(Ok(written)) => debug!(bytes = written, "audio download complete"),
        }

        let options = features::merged_options(&request.features);

        let audio = fs_err::read(audio_path).map_err(|err| {
            error!(%err, path = %audio_path.display(), "could not read scratch audio back");
            TranscribeError::Unknown
        })?;

        let response = self
            .transcriber
            .transcribe(audio, AUDIO_CONTENT_TYPE, &options)
            .await
            .map_err(|err| TranscribeError::TranscriptionFailed(err.to_string()))?;

        let request_id = response.metadata.request_id.clone();
        let record = assemble_record(request, &response)?;

        self.store
            .insert(&record)
            .await
            .map_err(|err| TranscribeError::PersistenceFailed(err.to_string()))?;

        info!(%request_id, "transcription persisted");
        Ok(TranscribeReceipt { request_id })
    }
}

/// Copy the download stream into the scratch file, returning the byte count.
async fn write_stream(mut stream: AudioStream, mut file: File) -> Result<u64> {
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// Merge the original request fields with the vendor payload into the row to
/// persist.
fn assemble_record(
    request: &TranscribeRequest,
    response: &TranscriptionResponse,
) -> std::result::Result<TranscriptionRecord, TranscribeError> {
    let payload = serde_json::to_value(response).map_err(|err| {
        error!(%err, "vendor payload failed to serialize");
        TranscribeError::Unknown
    })?;

    let serde_json::Value::Object(mut data) = payload else {
        error!("vendor payload did not serialize to an object");
        return Err(TranscribeError::Unknown);
    };

    data.insert(
        "source".to_string(),
        serde_json::json!({ "url": request.source.url }),
    );
    data.insert(
        "features".to_string(),
        serde_json::to_value(&request.features).map_err(|err| {
            error!(%err, "feature list failed to serialize");
            TranscribeError::Unknown
        })?,
    );

    Ok(TranscriptionRecord {
        url: request.source.url.clone(),
        request_id: response.metadata.request_id.clone(),
        data: serde_json::Value::Object(data),
        features: request.features.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureValue;
    use crate::source::MockMediaSource;
    use crate::store::MockTranscriptionStore;
    use crate::transcribe::{MockTranscriber, TranscriptionMetadata};
    use bytes::Bytes;
    use futures_util::stream;
    use std::path::PathBuf;

    fn request(url: &str) -> TranscribeRequest {
        TranscribeRequest {
            source: Source {
                url: url.to_string(),
            },
            features: vec![Feature {
                name: "punctuate".to_string(),
                value: FeatureValue::Bool(true),
            }],
        }
    }

    fn response(request_id: &str) -> TranscriptionResponse {
        TranscriptionResponse {
            metadata: TranscriptionMetadata {
                request_id: request_id.to_string(),
                created: None,
                duration: Some(12.5),
                channels: Some(1),
                extra: serde_json::Map::new(),
            },
            results: serde_json::json!({ "channels": [] }),
        }
    }

    fn chunked_stream(chunks: Vec<crate::Result<Bytes>>) -> AudioStream {
        stream::iter(chunks).boxed()
    }

    /// Pipeline over the given doubles, plus the scratch root so tests can
    /// check what is left on disk afterwards.
    fn pipeline(
        source: MockMediaSource,
        transcriber: MockTranscriber,
        store: MockTranscriptionStore,
    ) -> (TranscriptionPipeline, PathBuf) {
        let scratch_dir = TempDir::new().unwrap();
        let scratch_root = scratch_dir.path().to_path_buf();
        let pipeline = TranscriptionPipeline::with_scratch_dir(
            Arc::new(source),
            Arc::new(transcriber),
            Arc::new(store),
            scratch_dir,
        );
        (pipeline, scratch_root)
    }

    #[tokio::test]
    async fn success_returns_vendor_request_id_and_persists_once() {
        let mut source = MockMediaSource::new();
        source.expect_audio_stream().times(1).returning(|_| {
            Ok(chunked_stream(vec![
                Ok(Bytes::from_static(b"abc")),
                Ok(Bytes::from_static(b"def")),
            ]))
        });

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .withf(|audio, content_type, options| {
                audio.as_slice() == b"abcdef"
                    && content_type == "audio/mpeg"
                    && options
                        .iter()
                        .any(|(key, value)| key == "punctuate" && *value == FeatureValue::Bool(true))
                    && options.iter().any(|(key, _)| key == "model")
            })
            .returning(|_, _, _| Ok(response("dg-123")));

        let mut store = MockTranscriptionStore::new();
        store
            .expect_insert()
            .times(1)
            .withf(|record| {
                record.url == "https://youtu.be/abc123"
                    && record.request_id == "dg-123"
                    && record.features.len() == 1
                    && record.data["source"]["url"] == "https://youtu.be/abc123"
                    && record.data["metadata"]["request_id"] == "dg-123"
                    && record.data["features"][0]["name"] == "punctuate"
            })
            .returning(|_| Ok(()));

        let (pipeline, scratch_root) = pipeline(source, transcriber, store);
        let receipt = pipeline
            .run(&request("https://youtu.be/abc123"))
            .await
            .unwrap();

        assert_eq!(receipt.request_id, "dg-123");
        assert!(!scratch_root.join("ytdl-abc123.mp3").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_download_times_out_without_reaching_collaborators() {
        let mut source = MockMediaSource::new();
        source
            .expect_audio_stream()
            .times(1)
            .returning(|_| Ok(stream::pending().boxed()));

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(0);

        let mut store = MockTranscriptionStore::new();
        store.expect_insert().times(0);

        let (pipeline, scratch_root) = pipeline(source, transcriber, store);
        let err = pipeline
            .run(&request("https://youtu.be/abc123"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscribeError::DownloadTimeout));
        assert_eq!(err.to_string(), "Download timeout exceeded");
        assert!(!scratch_root.join("ytdl-abc123.mp3").exists());
    }

    #[tokio::test]
    async fn mid_stream_error_fails_the_download() {
        let mut source = MockMediaSource::new();
        source.expect_audio_stream().times(1).returning(|_| {
            Ok(chunked_stream(vec![
                Ok(Bytes::from_static(b"abc")),
                Err(anyhow::anyhow!("stream reset")),
            ]))
        });

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(0);

        let mut store = MockTranscriptionStore::new();
        store.expect_insert().times(0);

        let (pipeline, scratch_root) = pipeline(source, transcriber, store);
        let err = pipeline
            .run(&request("https://youtu.be/abc123"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Download failed: stream reset");
        assert!(!scratch_root.join("ytdl-abc123.mp3").exists());
    }

    #[tokio::test]
    async fn transcription_failure_still_cleans_the_scratch_file() {
        let mut source = MockMediaSource::new();
        source
            .expect_audio_stream()
            .times(1)
            .returning(|_| Ok(chunked_stream(vec![Ok(Bytes::from_static(b"abc"))])));

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("unsupported audio")));

        let mut store = MockTranscriptionStore::new();
        store.expect_insert().times(0);

        let (pipeline, scratch_root) = pipeline(source, transcriber, store);
        let err = pipeline
            .run(&request("https://youtu.be/abc123"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "unsupported audio");
        assert!(!scratch_root.join("ytdl-abc123.mp3").exists());
    }

    #[tokio::test]
    async fn persistence_failure_surfaces_the_database_detail() {
        let mut source = MockMediaSource::new();
        source
            .expect_audio_stream()
            .times(1)
            .returning(|_| Ok(chunked_stream(vec![Ok(Bytes::from_static(b"abc"))])));

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_, _, _| Ok(response("dg-123")));

        let mut store = MockTranscriptionStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("duplicate key value")));

        let (pipeline, scratch_root) = pipeline(source, transcriber, store);
        let err = pipeline
            .run(&request("https://youtu.be/abc123"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscribeError::PersistenceFailed(_)));
        assert_eq!(err.to_string(), "duplicate key value");
        assert!(!scratch_root.join("ytdl-abc123.mp3").exists());
    }

    #[tokio::test]
    async fn unrecognized_url_never_opens_a_stream() {
        let mut source = MockMediaSource::new();
        source.expect_audio_stream().times(0);

        let (pipeline, _scratch_root) =
            pipeline(source, MockTranscriber::new(), MockTranscriptionStore::new());
        let err = pipeline
            .run(&request("https://example.com/watch?v=abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscribeError::DownloadFailed(_)));
        assert!(err.to_string().starts_with("Download failed:"));
    }

    #[test]
    fn record_carries_request_fields_and_full_payload() {
        let request = request("https://youtu.be/abc123");
        let record = assemble_record(&request, &response("dg-123")).unwrap();

        assert_eq!(record.url, "https://youtu.be/abc123");
        assert_eq!(record.request_id, "dg-123");
        assert_eq!(record.features, request.features);
        assert_eq!(record.data["metadata"]["duration"], 12.5);
        assert_eq!(record.data["results"]["channels"], serde_json::json!([]));
        assert_eq!(record.data["source"]["url"], "https://youtu.be/abc123");
    }
}
