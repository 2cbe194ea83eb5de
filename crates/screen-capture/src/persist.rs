// Saving a finished recording through a native "save as" dialog

use log::{error, info};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;

use crate::error::{CaptureError, Result};
use crate::recorder::RecordingBlob;
use crate::{CONTAINER_EXTENSION, CONTAINER_FILTER_NAME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDialogOptions {
    pub title: String,
    pub default_file_name: String,
    pub default_dir: Option<PathBuf>,
    pub filter_name: String,
    pub extensions: Vec<String>,
}

/// Native file chooser
pub trait SaveDialog: Send + Sync {
    /// Returns the chosen path, or `None` when the user cancels.
    fn choose_path(
        &self,
        options: SaveDialogOptions,
    ) -> impl Future<Output = Option<PathBuf>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub path: PathBuf,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SaveOutcome {
    Saved(OutputFile),
    /// The user dismissed the dialog; nothing was written.
    Cancelled,
    /// There was nothing to save; no dialog was shown.
    Empty,
}

/// `vid-<unix-millis>.webm`
pub fn default_file_name(unix_millis: i64) -> String {
    format!("vid-{}.{}", unix_millis, CONTAINER_EXTENSION)
}

pub struct Persister<D: SaveDialog> {
    dialog: D,
    default_dir: Option<PathBuf>,
}

impl<D: SaveDialog> Persister<D> {
    pub fn new(dialog: D, default_dir: Option<PathBuf>) -> Self {
        Self { dialog, default_dir }
    }

    pub fn dialog(&self) -> &D {
        &self.dialog
    }

    pub fn dialog_options(&self, unix_millis: i64) -> SaveDialogOptions {
        SaveDialogOptions {
            title: "Save video".to_string(),
            default_file_name: default_file_name(unix_millis),
            default_dir: self.default_dir.clone(),
            filter_name: CONTAINER_FILTER_NAME.to_string(),
            extensions: vec![CONTAINER_EXTENSION.to_string()],
        }
    }

    /// Ask where to save `blob` and write it there.
    ///
    /// The write is direct, not atomic.
    pub async fn save(&self, blob: &RecordingBlob) -> Result<SaveOutcome> {
        if blob.is_empty() {
            info!("Nothing recorded, skipping save dialog");
            return Ok(SaveOutcome::Empty);
        }

        let options = self.dialog_options(chrono::Utc::now().timestamp_millis());
        let Some(path) = self.dialog.choose_path(options).await else {
            info!("Save cancelled by user");
            return Ok(SaveOutcome::Cancelled);
        };

        match tokio::fs::write(&path, &blob.bytes).await {
            Ok(()) => {
                info!("💾 Video saved to {:?} ({} bytes)", path, blob.len());
                Ok(SaveOutcome::Saved(OutputFile {
                    path,
                    bytes_written: blob.len() as u64,
                }))
            }
            Err(e) => {
                error!("❌ Error saving video to {:?}: {}", path, e);
                Err(CaptureError::PersistWriteFailure(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name(1_700_000_000_123), "vid-1700000000123.webm");
    }

    struct NoDialog;

    impl SaveDialog for NoDialog {
        async fn choose_path(&self, _options: SaveDialogOptions) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn test_dialog_options() {
        let persister = Persister::new(NoDialog, Some(PathBuf::from("/home/me/Videos")));
        let options = persister.dialog_options(42);

        assert_eq!(options.title, "Save video");
        assert_eq!(options.default_file_name, "vid-42.webm");
        assert_eq!(options.filter_name, "WebM Videos");
        assert_eq!(options.extensions, vec!["webm".to_string()]);
        assert_eq!(options.default_dir, Some(PathBuf::from("/home/me/Videos")));
    }

    #[tokio::test]
    async fn test_cancel_is_not_an_error() {
        let persister = Persister::new(NoDialog, None);
        let blob = RecordingBlob {
            bytes: vec![1, 2, 3],
            mime_type: "video/webm".into(),
        };
        assert_eq!(persister.save(&blob).await.unwrap(), SaveOutcome::Cancelled);
    }
}
