// Tauri side of capture: preview surface and native save dialog

mod dialog;
mod surface;

pub use dialog::TauriSaveDialog;
pub use surface::TauriPreviewSurface;
