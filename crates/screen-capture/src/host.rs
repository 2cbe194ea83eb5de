// Seams to the platform: capture host, preview surface

use std::future::Future;

use crate::error::Result;
use crate::media::MediaFeed;
use crate::source::{CaptureSource, MicrophoneDevice};

/// Constraints for a microphone feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrophoneRequest {
    /// Exact device to open; `None` picks the host default.
    pub device_id: Option<String>,
    pub echo_cancellation: bool,
}

impl MicrophoneRequest {
    pub fn new(device_id: Option<String>) -> Self {
        Self {
            device_id: device_id.filter(|id| !id.is_empty()),
            echo_cancellation: true,
        }
    }
}

/// Platform capture facilities.
///
/// Every acquisition returns fresh, live tracks; callers own them and must
/// stop them when done.
pub trait CaptureHost: Send + Sync {
    /// Screens and windows that can be captured right now.
    fn list_sources(&self) -> impl Future<Output = Result<Vec<CaptureSource>>> + Send;

    /// Audio input devices.
    fn list_microphones(&self) -> impl Future<Output = Result<Vec<MicrophoneDevice>>> + Send;

    /// A video-only feed for `source`.
    fn acquire_video(&self, source: &CaptureSource) -> impl Future<Output = Result<MediaFeed>> + Send;

    /// The system audio that accompanies `source`, without echo cancellation.
    fn acquire_system_audio(
        &self,
        source: &CaptureSource,
    ) -> impl Future<Output = Result<MediaFeed>> + Send;

    fn acquire_microphone(
        &self,
        request: &MicrophoneRequest,
    ) -> impl Future<Output = Result<MediaFeed>> + Send;
}

/// Where the bound preview is shown
pub trait PreviewSurface: Send + Sync {
    fn attach(&self, source: &CaptureSource, feed: &MediaFeed);
    fn detach(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microphone_request_defaults() {
        let request = MicrophoneRequest::new(None);
        assert!(request.echo_cancellation);
        assert_eq!(request.device_id, None);

        // an empty dropdown value means "default device"
        let request = MicrophoneRequest::new(Some(String::new()));
        assert_eq!(request.device_id, None);

        let request = MicrophoneRequest::new(Some("alsa_input.usb".into()));
        assert_eq!(request.device_id.as_deref(), Some("alsa_input.usb"));
    }
}
