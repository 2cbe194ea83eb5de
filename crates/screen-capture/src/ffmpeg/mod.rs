// ffmpeg child-process backend
//
// Capture and encoding both go through an `ffmpeg` binary:
// - Linux: x11grab for screens and windows, pulse for audio
// - macOS: avfoundation for screens and audio
// - Windows: gdigrab for screens and windows, dshow for audio

mod encoder;
mod host;
pub mod listing;

pub use encoder::{encoder_args, FfmpegEncoder, FfmpegSession};
pub use host::FfmpegHost;

use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::{CaptureError, Result};
use crate::media::InputSpec;

/// Overrides ffmpeg discovery
pub const FFMPEG_ENV: &str = "SCREENCAST_FFMPEG";

const FALLBACK_LOCATIONS: [&str; 4] = [
    "/opt/homebrew/bin",
    "/usr/local/bin",
    "/usr/bin",
    "C:\\ffmpeg\\bin",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

fn executable_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

/// First directory in `dirs` holding `exe`
pub fn find_in_dirs<I, P>(dirs: I, exe: &str) -> Option<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    dirs.into_iter()
        .map(|dir| dir.as_ref().join(exe))
        .find(|candidate| candidate.is_file())
}

/// Locate ffmpeg: `$SCREENCAST_FFMPEG`, then `PATH`, then common install dirs.
pub fn find_ffmpeg() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(FFMPEG_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Some(path);
        }
        warn!("⚠️  {} points to {}, which is not a file", FFMPEG_ENV, path.display());
    }

    let exe = executable_name();
    let found = std::env::var_os("PATH")
        .and_then(|paths| find_in_dirs(std::env::split_paths(&paths), exe))
        .or_else(|| find_in_dirs(FALLBACK_LOCATIONS, exe));

    match &found {
        Some(path) => debug!("Using ffmpeg at {}", path.display()),
        None => warn!("⚠️  ffmpeg not found"),
    }
    found
}

/// Grab one JPEG frame from `input`, scaled to `width` pixels wide.
pub async fn snapshot(ffmpeg: &Path, input: &InputSpec, width: u32) -> Result<Vec<u8>> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
    args.extend(input.to_args());
    args.extend(
        [
            "-frames:v".to_string(),
            "1".into(),
            "-vf".into(),
            format!("scale={}:-2", width),
            "-f".into(),
            "image2pipe".into(),
            "-vcodec".into(),
            "mjpeg".into(),
            "pipe:1".into(),
        ],
    );

    let output = Command::new(ffmpeg)
        .args(&args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CaptureError::HostUnavailable(format!("{}: {}", ffmpeg.display(), e)))?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err(CaptureError::DeviceAcquisitionFailure(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_in_dirs() {
        let empty = tempfile::tempdir().unwrap();
        let with_binary = tempfile::tempdir().unwrap();
        std::fs::write(with_binary.path().join("ffmpeg"), b"").unwrap();

        let found = find_in_dirs([empty.path(), with_binary.path()], "ffmpeg");
        assert_eq!(found, Some(with_binary.path().join("ffmpeg")));
        assert_eq!(find_in_dirs([empty.path()], "ffmpeg"), None);
    }
}
