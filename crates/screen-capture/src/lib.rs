// Screen and window recording library
//!
//! # screen-capture
//!
//! Records a screen or a single window to WebM, optionally mixing system
//! audio and a microphone into one audio track:
//! - sources and microphones are listed fresh from the host
//! - a live preview feed is bound per selected source
//! - audio inputs go through one [`MixingGraph`], routed by origin
//! - the [`Recorder`] collects encoded chunks and flushes them on stop
//! - the [`Persister`] asks where to save through a native dialog
//!
//! The platform side is behind [`CaptureHost`], [`Encoder`], [`PreviewSurface`]
//! and [`SaveDialog`]. The [`ffmpeg`] module implements the host and encoder
//! with an `ffmpeg` child process (x11grab/pulse, avfoundation, gdigrab/dshow).
//!
//! ## Example
//! ```no_run
//! use screen_capture::ffmpeg::{FfmpegEncoder, FfmpegHost};
//! use screen_capture::{CaptureHost, ComposeOptions, Recorder, RecordingConfig};
//!
//! # async fn run() -> screen_capture::Result<()> {
//! let config = RecordingConfig::default();
//! let host = FfmpegHost::new(&config);
//!
//! let sources = host.list_sources().await?;
//! let feed = host.acquire_video(&sources[0]).await?;
//! let composition =
//!     screen_capture::compose_recording_stream(&host, &feed, &ComposeOptions::default()).await;
//!
//! let mut recorder = Recorder::new(FfmpegEncoder::new(&config));
//! recorder.start(Some(composition.stream)).await?;
//! // ... record for some time ...
//! let blob = recorder.stop().await?;
//! std::fs::write("recording.webm", &blob.bytes)?;
//! recorder.finish();
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod controller;
mod error;
mod host;
mod media;
mod mixer;
mod persist;
mod preview;
mod recorder;
mod session;
mod source;
mod timer;

pub mod ffmpeg;

pub use controller::{RecordingController, StartReport, StopReport, TickListener, Toggled};
pub use error::{CaptureError, Result};
pub use host::{CaptureHost, MicrophoneRequest, PreviewSurface};
pub use media::{
    CombinedStream, InputSpec, MediaFeed, MediaTrack, TrackInfo, TrackKind, TrackOrigin,
};
pub use mixer::{compose_recording_stream, ComposeOptions, Composition, MixingGraph, MIX_OUTPUT_LABEL};
pub use persist::{default_file_name, OutputFile, Persister, SaveDialog, SaveDialogOptions, SaveOutcome};
pub use preview::{BindOutcome, BoundPreview, PreviewBinder};
pub use recorder::{ChunkSender, Encoder, EncodingSession, Recorder, RecorderState, RecordingBlob};
pub use session::{CaptureSettings, RecordingSession};
pub use source::{find_source, CaptureSource, MicrophoneDevice, SourceKind};
pub use timer::{format_elapsed, ElapsedTimer};

/// File extension of recordings
pub const CONTAINER_EXTENSION: &str = "webm";

/// Media type of recordings
pub const CONTAINER_MIME_TYPE: &str = "video/webm; codecs=vp9";

/// Save dialog filter label
pub const CONTAINER_FILTER_NAME: &str = "WebM Videos";

/// Configuration for capture and encoding
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Frames per second (default: 30)
    pub fps: u32,

    /// VP9 target bitrate in kbit/s (default: 2500)
    pub video_bitrate_kbps: u32,

    /// Opus bitrate in kbit/s (default: 128)
    pub audio_bitrate_kbps: u32,

    /// Capture mouse cursor (default: true)
    pub capture_cursor: bool,

    /// ffmpeg binary (None = discover, see [`ffmpeg::find_ffmpeg`])
    pub ffmpeg_path: Option<PathBuf>,

    /// Directory the save dialog opens in (None = platform default)
    pub default_save_dir: Option<PathBuf>,

    /// How long to wait for the encoder to flush before killing it
    pub stop_timeout: Duration,

    /// An encoder that exits within this window failed to start
    pub startup_grace: Duration,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            video_bitrate_kbps: 2500,
            audio_bitrate_kbps: 128,
            capture_cursor: true,
            ffmpeg_path: None,
            default_save_dir: None,
            stop_timeout: Duration::from_secs(10),
            startup_grace: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RecordingConfig::default();
        assert_eq!(config.fps, 30);
        assert_eq!(config.video_bitrate_kbps, 2500);
        assert!(config.capture_cursor);
        assert!(config.ffmpeg_path.is_none());
        assert_eq!(config.startup_grace, Duration::from_millis(500));
    }
}
