use screen_capture::{format_elapsed, CaptureError, CaptureSource, OutputFile, RecorderState, TrackInfo};
use serde::Serialize;
use tauri::{AppHandle, Emitter};

#[derive(Debug, Clone, Serialize)]
pub struct PreviewBoundEvent {
    pub source: CaptureSource,
    pub tracks: Vec<TrackInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrameEvent {
    pub source_id: String,
    /// Base64 JPEG
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickEvent {
    pub seconds: u64,
    pub display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub code: String,
    pub message: String,
}

/// Emit recorder state to frontend
pub fn emit_state(app: &AppHandle, state: RecorderState) -> Result<(), String> {
    app.emit("recorder:state", state)
        .map_err(|e| format!("Failed to emit state: {}", e))
}

/// Emit elapsed time to frontend
pub fn emit_tick(app: &AppHandle, seconds: u64) -> Result<(), String> {
    app.emit(
        "recorder:tick",
        TickEvent {
            seconds,
            display: format_elapsed(seconds),
        },
    )
    .map_err(|e| format!("Failed to emit tick: {}", e))
}

pub fn emit_preview_bound(app: &AppHandle, event: PreviewBoundEvent) -> Result<(), String> {
    app.emit("preview:bound", event)
        .map_err(|e| format!("Failed to emit preview:bound: {}", e))
}

pub fn emit_preview_released(app: &AppHandle) -> Result<(), String> {
    app.emit("preview:released", ())
        .map_err(|e| format!("Failed to emit preview:released: {}", e))
}

pub fn emit_preview_frame(app: &AppHandle, event: PreviewFrameEvent) -> Result<(), String> {
    app.emit("preview:frame", event)
        .map_err(|e| format!("Failed to emit preview:frame: {}", e))
}

/// Emit saved recording to frontend
pub fn emit_saved(app: &AppHandle, file: &OutputFile) -> Result<(), String> {
    app.emit("recording:saved", file)
        .map_err(|e| format!("Failed to emit recording:saved: {}", e))
}

/// Emit error event to frontend
pub fn emit_error(app: &AppHandle, error: &CaptureError) -> Result<(), String> {
    app.emit(
        "recording:error",
        ErrorEvent {
            code: error.code().to_string(),
            message: error.to_string(),
        },
    )
    .map_err(|e| format!("Failed to emit error: {}", e))
}
