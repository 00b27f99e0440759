use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use url::Url;

pub mod youtube;

pub use youtube::YoutubeSource;

use crate::Result;

/// Byte stream produced by a media source.
///
/// Dropping the stream cancels the underlying download.
pub type AudioStream = BoxStream<'static, Result<Bytes>>;

/// Trait for obtaining the audio track of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Open an audio-only, highest-quality byte stream for the given video.
    async fn audio_stream(&self, video_id: &str) -> Result<AudioStream>;
}

/// Extract the video identifier from the common YouTube URL forms.
///
/// Handles `watch?v=`, `youtu.be/`, `embed/`, `v/`, `shorts/`, and `live/`
/// links, with or without the `www.` / `m.` host prefix. Returns `None` when
/// no identifier can be found.
pub fn parse_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed
        .host_str()?
        .trim_start_matches("www.")
        .trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") | Some("v") | Some("shorts") | Some("live") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    };

    candidate.filter(|id| is_video_id(id))
}

fn is_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
