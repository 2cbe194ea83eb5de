// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    screencast_desktop_lib::logging::init();
    screencast_desktop_lib::run()
}
