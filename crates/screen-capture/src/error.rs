use serde::Serialize;

/// Failures surfaced by listing, preview, recording and saving.
///
/// A cancelled save dialog is not an error; see [`crate::SaveOutcome::Cancelled`].
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Capture source not found: {0}")]
    SourceNotFound(String),

    #[error("No stream available to record")]
    NoStreamAvailable,

    #[error("Device acquisition failed: {0}")]
    DeviceAcquisitionFailure(String),

    #[error("Failed to construct encoder: {0}")]
    EncoderConstructionFailure(String),

    #[error("Failed to write recording: {0}")]
    PersistWriteFailure(String),

    #[error("Capture host unavailable: {0}")]
    HostUnavailable(String),

    #[error("Invalid recorder state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Stable code for the frontend error event.
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            CaptureError::NoStreamAvailable => "NO_STREAM",
            CaptureError::DeviceAcquisitionFailure(_) => "DEVICE_ERROR",
            CaptureError::EncoderConstructionFailure(_) => "ENCODER_ERROR",
            CaptureError::PersistWriteFailure(_) => "SAVE_ERROR",
            CaptureError::HostUnavailable(_) => "HOST_ERROR",
            CaptureError::InvalidState(_) => "STATE_ERROR",
            CaptureError::Io(_) => "IO_ERROR",
        }
    }
}

impl Serialize for CaptureError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_message() {
        let err = CaptureError::SourceNotFound("window:7".into());
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            "\"Capture source not found: window:7\""
        );
        assert_eq!(err.code(), "SOURCE_NOT_FOUND");
    }
}
