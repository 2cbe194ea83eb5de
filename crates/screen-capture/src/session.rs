use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mixer::ComposeOptions;

/// Choices made in the window before a recording starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSettings {
    pub selected_source_id: Option<String>,
    pub system_audio_enabled: bool,
    pub microphone_enabled: bool,
    pub microphone_device_id: Option<String>,
}

impl CaptureSettings {
    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            system_audio: self.system_audio_enabled,
            microphone: self.microphone_enabled,
            microphone_device_id: self.microphone_device_id.clone(),
        }
    }
}

/// The recording in progress. Created on start, dropped once saving is done.
///
/// Encoded chunks live in the [`crate::Recorder`] and the elapsed count in the
/// [`crate::ElapsedTimer`]; both are owned by the same controller as this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    pub source_id: String,
    pub system_audio_enabled: bool,
    pub microphone_enabled: bool,
    pub microphone_device_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl RecordingSession {
    pub fn begin(source_id: String, settings: &CaptureSettings) -> Self {
        Self {
            source_id,
            system_audio_enabled: settings.system_audio_enabled,
            microphone_enabled: settings.microphone_enabled,
            microphone_device_id: settings.microphone_device_id.clone(),
            started_at: Utc::now(),
        }
    }
}
