use base64::Engine;
use log::debug;
use std::sync::Mutex;
use std::time::Duration;
use tauri::async_runtime::JoinHandle;
use tauri::AppHandle;

use screen_capture::ffmpeg::FfmpegHost;
use screen_capture::{CaptureSource, MediaFeed, PreviewSurface};

use crate::events::{self, PreviewBoundEvent, PreviewFrameEvent};

const FRAME_INTERVAL: Duration = Duration::from_secs(1);
const FRAME_WIDTH: u32 = 480;

/// Shows the bound feed in the webview: announces the tracks, then pushes a
/// JPEG snapshot of the video track about once a second until the track ends.
pub struct TauriPreviewSurface {
    app: AppHandle,
    host: FfmpegHost,
    frames: Mutex<Option<JoinHandle<()>>>,
}

impl TauriPreviewSurface {
    pub fn new(app: AppHandle, host: FfmpegHost) -> Self {
        Self {
            app,
            host,
            frames: Mutex::new(None),
        }
    }

    fn replace_frame_task(&self, task: Option<JoinHandle<()>>) {
        let mut slot = self.frames.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = task;
    }
}

impl PreviewSurface for TauriPreviewSurface {
    fn attach(&self, source: &CaptureSource, feed: &MediaFeed) {
        let _ = events::emit_preview_bound(
            &self.app,
            PreviewBoundEvent {
                source: source.clone(),
                tracks: feed.tracks().iter().map(|t| t.info()).collect(),
            },
        );

        let Some(video) = feed.video_tracks().next().cloned() else {
            self.replace_frame_task(None);
            return;
        };
        let Some(input) = video.input().cloned() else {
            self.replace_frame_task(None);
            return;
        };

        let app = self.app.clone();
        let host = self.host.clone();
        let source_id = source.id.clone();
        let task = tauri::async_runtime::spawn(async move {
            while video.is_live() {
                match host.snapshot(&input, FRAME_WIDTH).await {
                    Ok(jpeg) => {
                        let _ = events::emit_preview_frame(
                            &app,
                            PreviewFrameEvent {
                                source_id: source_id.clone(),
                                data: base64::engine::general_purpose::STANDARD.encode(jpeg),
                            },
                        );
                    }
                    Err(e) => debug!("Preview frame for {} unavailable: {}", source_id, e),
                }
                tokio::time::sleep(FRAME_INTERVAL).await;
            }
            debug!("Preview frames for {} stopped", source_id);
        });
        self.replace_frame_task(Some(task));
    }

    fn detach(&self) {
        self.replace_frame_task(None);
        let _ = events::emit_preview_released(&self.app);
    }
}
