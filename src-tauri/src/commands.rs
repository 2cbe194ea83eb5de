use log::{error, info, warn};
use serde::Serialize;
use tauri::{AppHandle, Manager, State};

use screen_capture::{
    BindOutcome, CaptureError, CaptureSource, RecorderState, SaveOutcome, Toggled,
};

use crate::events;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrophoneOption {
    pub device_id: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct RecorderStatus {
    pub state: RecorderState,
    pub elapsed: String,
}

fn report(app: &AppHandle, e: CaptureError) -> String {
    error!("❌ {}", e);
    let _ = events::emit_error(app, &e);
    e.to_string()
}

#[tauri::command]
pub async fn list_sources(
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Vec<CaptureSource>, String> {
    let controller = state.controller.read().await;
    controller.list_sources().await.map_err(|e| report(&app, e))
}

#[tauri::command]
pub async fn list_microphones(
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Vec<MicrophoneOption>, String> {
    let controller = state.controller.read().await;
    let devices = controller.list_microphones().await.map_err(|e| report(&app, e))?;
    Ok(devices
        .iter()
        .enumerate()
        .map(|(i, d)| MicrophoneOption {
            device_id: d.device_id.clone(),
            label: d.display_label(i),
        })
        .collect())
}

/// Bind the preview for `source_id`. Returns `None` when a later selection
/// overtook this one.
#[tauri::command]
pub async fn select_source(
    source_id: String,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Option<CaptureSource>, String> {
    let controller = state.controller.read().await;
    match controller.select_source(&source_id).await {
        Ok(BindOutcome::Bound { source, .. }) => Ok(Some(source)),
        Ok(BindOutcome::Superseded) => Ok(None),
        Err(e) => Err(report(&app, e)),
    }
}

#[tauri::command]
pub async fn set_system_audio(enabled: bool, state: State<'_, AppState>) -> Result<(), String> {
    state.controller.read().await.set_system_audio(enabled);
    info!("🔊 System audio {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

#[tauri::command]
pub async fn set_microphone(enabled: bool, state: State<'_, AppState>) -> Result<(), String> {
    state.controller.read().await.set_microphone(enabled);
    info!("🎤 Microphone {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

#[tauri::command]
pub async fn set_microphone_device(
    device_id: Option<String>,
    state: State<'_, AppState>,
) -> Result<(), String> {
    info!("🎤 Microphone device: {:?}", device_id);
    state.controller.read().await.set_microphone_device(device_id);
    Ok(())
}

#[tauri::command]
pub async fn toggle_recording(app: AppHandle) -> Result<RecorderState, String> {
    toggle_and_report(&app).await
}

#[tauri::command]
pub async fn get_recorder_state(state: State<'_, AppState>) -> Result<RecorderStatus, String> {
    let controller = state.controller.read().await;
    Ok(RecorderStatus {
        state: controller.state(),
        elapsed: controller.elapsed_display(),
    })
}

/// Release capture and exit. Unsaved media is dropped.
#[tauri::command]
pub async fn quit(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    info!("👋 Quit requested");
    state.controller.write().await.shutdown().await;
    app.exit(0);
    Ok(())
}

/// Start or stop recording, emitting state, saved and error events.
/// Shared by the button and the global shortcut.
pub async fn toggle_and_report(app: &AppHandle) -> Result<RecorderState, String> {
    let state = app.state::<AppState>();
    let Some(_gate) = state.toggle_gate.try_enter() else {
        info!("Toggle ignored, the previous one is still running");
        return Err("previous recording is still being started or saved".into());
    };
    let mut controller = state.controller.write().await;

    if controller.state() == RecorderState::Recording {
        let _ = events::emit_state(app, RecorderState::Finalizing);
    }

    let result = controller.toggle().await;
    let recorder_state = controller.state();
    drop(controller);
    let _ = events::emit_state(app, recorder_state);

    match result {
        Ok(Toggled::Started(started)) => {
            for failure in started.failures {
                warn!("⚠️  Recording without a requested input: {}", failure);
                let _ = events::emit_error(app, &failure);
            }
        }
        Ok(Toggled::Stopped(stopped)) => {
            if let Some(e) = &stopped.encoder {
                error!("❌ {}", e);
                let _ = events::emit_error(app, e);
            }
            match stopped.save {
                Ok(SaveOutcome::Saved(file)) => {
                    info!("✅ Recording saved to: {:?}", file.path);
                    let _ = events::emit_saved(app, &file);
                }
                Ok(SaveOutcome::Cancelled) => info!("Recording discarded"),
                Ok(SaveOutcome::Empty) => warn!("⚠️  Recording produced no data"),
                Err(e) => {
                    let _ = events::emit_error(app, &e);
                }
            }
            if let Some(Err(e)) = stopped.preview {
                let _ = events::emit_error(app, &e);
            }
        }
        Err(e) => return Err(report(app, e)),
    }
    Ok(recorder_state)
}
