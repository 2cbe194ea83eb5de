mod capture;
mod commands;
mod events;
mod hotkey;
mod state;

pub mod logging;

use log::{info, warn};
use state::AppState;
use tauri::{Manager, WindowEvent};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::list_sources,
            commands::list_microphones,
            commands::select_source,
            commands::set_system_audio,
            commands::set_microphone,
            commands::set_microphone_device,
            commands::toggle_recording,
            commands::get_recorder_state,
            commands::quit,
        ])
        .setup(|app| {
            let config = state::load_config();
            info!(
                "🎬 Screencast starting ({} fps, {} kbit/s, save dir {:?})",
                config.fps, config.video_bitrate_kbps, config.default_save_dir
            );
            app.manage(AppState::new(app.handle(), config));

            if let Err(e) = hotkey::setup_global_shortcut(app.handle()) {
                warn!("⚠️  Record shortcut unavailable: {}", e);
            }
            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::CloseRequested { api, .. } = event {
                // Release capture before exiting; a pending save dialog needs the event loop.
                api.prevent_close();
                let app = window.app_handle().clone();
                tauri::async_runtime::spawn(async move {
                    let state = app.state::<AppState>();
                    state.controller.write().await.shutdown().await;
                    app.exit(0);
                });
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
