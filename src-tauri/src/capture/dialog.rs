use log::warn;
use std::path::PathBuf;
use tauri::AppHandle;
use tauri_plugin_dialog::DialogExt;
use tokio::sync::oneshot;

use screen_capture::{SaveDialog, SaveDialogOptions};

/// Native "save as" chooser from `tauri-plugin-dialog`
pub struct TauriSaveDialog {
    app: AppHandle,
}

impl TauriSaveDialog {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl SaveDialog for TauriSaveDialog {
    async fn choose_path(&self, options: SaveDialogOptions) -> Option<PathBuf> {
        let (tx, rx) = oneshot::channel();
        {
            let extensions: Vec<&str> = options.extensions.iter().map(String::as_str).collect();
            let mut builder = self
                .app
                .dialog()
                .file()
                .set_title(&options.title)
                .set_file_name(&options.default_file_name)
                .add_filter(&options.filter_name, &extensions);
            if let Some(dir) = &options.default_dir {
                builder = builder.set_directory(dir);
            }
            builder.save_file(move |path| {
                let _ = tx.send(path);
            });
        }

        let chosen = rx.await.ok().flatten()?;
        match chosen.into_path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("⚠️  Save dialog returned an unusable path: {}", e);
                None
            }
        }
    }
}
