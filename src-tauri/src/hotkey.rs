// Global record shortcut: toggles recording like the start/stop button

use log::{info, warn};
use tauri::AppHandle;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutState};

use crate::commands;

pub const RECORD_SHORTCUT: &str = "CmdOrCtrl+Shift+R";

/// Setup global shortcut during app initialization
pub fn setup_global_shortcut(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let shortcut: Shortcut = RECORD_SHORTCUT.parse()?;

    app.global_shortcut()
        .on_shortcut(shortcut, move |app, _shortcut, event| {
            if !matches!(event.state, ShortcutState::Pressed) {
                return;
            }
            info!("⌨️  Record shortcut pressed");
            let app = app.clone();
            tauri::async_runtime::spawn(async move {
                if let Err(e) = commands::toggle_and_report(&app).await {
                    warn!("⚠️  Shortcut toggle failed: {}", e);
                }
            });
        })?;

    info!("✅ Registered {}", RECORD_SHORTCUT);
    Ok(())
}
