use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tauri::AppHandle;
use tokio::sync::RwLock;

use screen_capture::ffmpeg::{FfmpegEncoder, FfmpegHost};
use screen_capture::{RecordingConfig, RecordingController};

use crate::capture::{TauriPreviewSurface, TauriSaveDialog};
use crate::events;

/// Starting directory for the save dialog
pub const SAVE_DIR_ENV: &str = "SCREENCAST_SAVE_DIR";

pub type Controller =
    RecordingController<FfmpegHost, FfmpegEncoder, TauriPreviewSurface, TauriSaveDialog>;

/// Application state shared by commands, the hotkey and window events.
///
/// Recording transitions take the write lock; listing, preview binds and
/// toggles take the read lock.
pub struct AppState {
    pub controller: RwLock<Controller>,
    pub toggle_gate: ToggleGate,
}

impl AppState {
    pub fn new(app: &AppHandle, config: RecordingConfig) -> Self {
        let host = FfmpegHost::new(&config);
        let surface = TauriPreviewSurface::new(app.clone(), host.clone());
        let dialog = TauriSaveDialog::new(app.clone());

        let ticks = app.clone();
        let controller = RecordingController::new(
            host,
            FfmpegEncoder::new(&config),
            surface,
            dialog,
            config.default_save_dir.clone(),
        )
        .with_tick_listener(move |seconds| {
            let _ = events::emit_tick(&ticks, seconds);
        });

        Self {
            controller: RwLock::new(controller),
            toggle_gate: ToggleGate::default(),
        }
    }
}

pub fn load_config() -> RecordingConfig {
    RecordingConfig {
        default_save_dir: std::env::var_os(SAVE_DIR_ENV)
            .map(PathBuf::from)
            .or_else(default_video_dir),
        ..Default::default()
    }
}

fn default_video_dir() -> Option<PathBuf> {
    dirs::video_dir().filter(|p| p.is_dir())
}

/// Lets one start/stop run at a time. Presses that arrive while a toggle is
/// in flight (including a pending save dialog) are dropped, not queued.
#[derive(Debug, Default)]
pub struct ToggleGate {
    busy: AtomicBool,
}

impl ToggleGate {
    pub fn try_enter(&self) -> Option<ToggleGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ToggleGuard { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

pub struct ToggleGuard<'a> {
    gate: &'a ToggleGate,
}

impl Drop for ToggleGuard<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::SeqCst);
    }
}
