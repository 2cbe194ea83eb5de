// Capturable sources and audio input devices as reported by the host

use serde::{Deserialize, Serialize};

use crate::media::InputSpec;

/// What a capture source shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Screen,
    Window,
}

/// A screen or window the host can expose as a video feed.
///
/// Ids look like `screen:0` or `window:0x03a00003` and are stable for the
/// lifetime of the host session. Sources are listed fresh on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSource {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,

    /// How the encoder opens this source. Never sent to the frontend.
    #[serde(skip)]
    pub input: InputSpec,
}

impl CaptureSource {
    pub fn screen(index: u32, name: impl Into<String>, input: InputSpec) -> Self {
        Self {
            id: format!("screen:{}", index),
            name: name.into(),
            kind: SourceKind::Screen,
            input,
        }
    }

    pub fn window(native_id: &str, name: impl Into<String>, input: InputSpec) -> Self {
        Self {
            id: format!("window:{}", native_id),
            name: name.into(),
            kind: SourceKind::Window,
            input,
        }
    }
}

/// An audio input device. The label may be empty before the user grants access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrophoneDevice {
    pub device_id: String,
    pub label: String,
}

impl MicrophoneDevice {
    /// Label for a dropdown entry, falling back to `Microphone <n>` (1-based).
    pub fn display_label(&self, position: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Microphone {}", position + 1)
        } else {
            self.label.clone()
        }
    }
}

/// Find a source by id in a freshly listed set.
pub fn find_source<'a>(sources: &'a [CaptureSource], id: &str) -> Option<&'a CaptureSource> {
    sources.iter().find(|s| s.id == id)
}
