use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::listing::{self, AvFoundationDevices};
use super::{find_ffmpeg, snapshot, Platform};
use crate::error::{CaptureError, Result};
use crate::host::{CaptureHost, MicrophoneRequest};
use crate::media::{InputSpec, MediaFeed, MediaTrack};
use crate::source::{CaptureSource, MicrophoneDevice};
use crate::RecordingConfig;

const AUDIO_QUEUE_SIZE: &str = "1024";

const WINDOWS_SCREEN_SCRIPT: &str = "Add-Type -AssemblyName System.Windows.Forms; \
     [System.Windows.Forms.Screen]::AllScreens | ForEach-Object { \
     \"{0}`t{1}`t{2}`t{3}`t{4}\" -f $_.Bounds.X, $_.Bounds.Y, $_.Bounds.Width, \
     $_.Bounds.Height, $_.DeviceName }";

const WINDOWS_LISTING_SCRIPT: &str = "Get-Process | Where-Object { $_.MainWindowTitle } | \
     ForEach-Object { \"{0}`t{1}\" -f $_.Id, $_.MainWindowTitle }";

/// [`CaptureHost`] backed by the ffmpeg device demuxers and the usual
/// desktop listing tools (`xrandr`, `wmctrl`, `pactl`, PowerShell).
#[derive(Debug, Clone)]
pub struct FfmpegHost {
    ffmpeg: PathBuf,
    platform: Platform,
    display: String,
    fps: u32,
    capture_cursor: bool,
}

impl FfmpegHost {
    pub fn new(config: &RecordingConfig) -> Self {
        let ffmpeg = config
            .ffmpeg_path
            .clone()
            .or_else(find_ffmpeg)
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));
        let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string());

        Self {
            ffmpeg,
            platform: Platform::current(),
            display,
            fps: config.fps,
            capture_cursor: config.capture_cursor,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// One JPEG frame of a video track, for the preview.
    pub async fn snapshot(&self, input: &InputSpec, width: u32) -> Result<Vec<u8>> {
        snapshot(&self.ffmpeg, input, width).await
    }

    fn cursor_flag(&self) -> &'static str {
        if self.capture_cursor {
            "1"
        } else {
            "0"
        }
    }

    fn x11_screen_input(&self, monitor: &listing::Monitor) -> InputSpec {
        InputSpec::new(
            "x11grab",
            format!("{}+{},{}", self.display, monitor.x, monitor.y),
        )
        .option("framerate", self.fps.to_string())
        .option("video_size", format!("{}x{}", monitor.width, monitor.height))
        .option("draw_mouse", self.cursor_flag())
    }

    fn x11_window_input(&self, window_id: &str) -> InputSpec {
        InputSpec::new("x11grab", self.display.clone())
            .option("framerate", self.fps.to_string())
            .option("draw_mouse", self.cursor_flag())
            .option("window_id", window_id)
    }

    fn gdigrab_screen_input(&self, monitor: &listing::Monitor) -> InputSpec {
        self.gdigrab_input("desktop".to_string())
            .option("offset_x", monitor.x.to_string())
            .option("offset_y", monitor.y.to_string())
            .option("video_size", format!("{}x{}", monitor.width, monitor.height))
    }

    fn gdigrab_input(&self, target: String) -> InputSpec {
        InputSpec::new("gdigrab", target)
            .option("framerate", self.fps.to_string())
            .option("draw_mouse", self.cursor_flag())
    }

    async fn avfoundation_devices(&self) -> Result<AvFoundationDevices> {
        let stderr = self
            .device_listing(&["-f", "avfoundation", "-list_devices", "true", "-i", ""])
            .await?;
        Ok(listing::parse_avfoundation_devices(&stderr))
    }

    async fn dshow_audio_devices(&self) -> Result<Vec<String>> {
        let stderr = self
            .device_listing(&["-list_devices", "true", "-f", "dshow", "-i", "dummy"])
            .await?;
        Ok(listing::parse_dshow_audio_devices(&stderr))
    }

    // Device listings exit non-zero by design; the list is on stderr.
    async fn device_listing(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.ffmpeg)
            .arg("-hide_banner")
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CaptureError::HostUnavailable(format!("{}: {}", self.ffmpeg.display(), e))
            })?;
        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }

    async fn list_linux_sources(&self) -> Result<Vec<CaptureSource>> {
        let monitors = run_tool("xrandr", &["--listmonitors"]).await?;
        let mut sources: Vec<CaptureSource> = listing::parse_xrandr_monitors(&monitors)
            .iter()
            .map(|m| {
                CaptureSource::screen(
                    m.index,
                    format!("Display {}", m.index + 1),
                    self.x11_screen_input(m),
                )
            })
            .collect();

        match run_tool("wmctrl", &["-l"]).await {
            Ok(out) => sources.extend(
                listing::parse_wmctrl_windows(&out)
                    .into_iter()
                    .map(|w| CaptureSource::window(&w.id, w.title, self.x11_window_input(&w.id))),
            ),
            Err(e) => debug!("Window listing unavailable: {}", e),
        }
        Ok(sources)
    }

    async fn list_macos_sources(&self) -> Result<Vec<CaptureSource>> {
        let devices = self.avfoundation_devices().await?;
        Ok(devices
            .video
            .iter()
            .filter_map(|(index, name)| {
                let screen = listing::avfoundation_screen_number(name)?;
                let input = InputSpec::new("avfoundation", format!("{}:none", index))
                    .option("framerate", self.fps.to_string())
                    .option("capture_cursor", self.cursor_flag());
                Some(CaptureSource::screen(
                    screen,
                    format!("Display {}", screen + 1),
                    input,
                ))
            })
            .collect())
    }

    async fn list_windows_sources(&self) -> Result<Vec<CaptureSource>> {
        let screens = run_tool(
            "powershell",
            &["-NoProfile", "-Command", WINDOWS_SCREEN_SCRIPT],
        )
        .await;
        let monitors = match screens {
            Ok(out) => listing::parse_tabbed_screens(&out),
            Err(e) => {
                debug!("Screen listing unavailable: {}", e);
                Vec::new()
            }
        };

        // Without a listing the whole virtual desktop is one source.
        let mut sources: Vec<CaptureSource> = if monitors.is_empty() {
            vec![CaptureSource::screen(
                0,
                "Display 1",
                self.gdigrab_input("desktop".to_string()),
            )]
        } else {
            monitors
                .iter()
                .map(|m| {
                    CaptureSource::screen(
                        m.index,
                        format!("Display {}", m.index + 1),
                        self.gdigrab_screen_input(m),
                    )
                })
                .collect()
        };

        match run_tool(
            "powershell",
            &["-NoProfile", "-Command", WINDOWS_LISTING_SCRIPT],
        )
        .await
        {
            Ok(out) => sources.extend(listing::parse_tabbed_windows(&out).into_iter().map(|w| {
                let input = self.gdigrab_input(format!("title={}", w.title));
                CaptureSource::window(&w.id, w.title, input)
            })),
            Err(e) => debug!("Window listing unavailable: {}", e),
        }
        Ok(sources)
    }
}

async fn run_tool(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CaptureError::HostUnavailable(format!("{}: {}", program, e)))?;

    if !output.status.success() {
        return Err(CaptureError::HostUnavailable(format!(
            "{} failed: {}",
            program,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn acquisition_error(e: CaptureError) -> CaptureError {
    match e {
        CaptureError::DeviceAcquisitionFailure(_) => e,
        other => CaptureError::DeviceAcquisitionFailure(other.to_string()),
    }
}

/// Pick the requested device, or the first one when none is requested.
fn choose_device<'a>(
    devices: &'a [MicrophoneDevice],
    requested: Option<&str>,
) -> Result<&'a MicrophoneDevice> {
    match requested {
        Some(id) => devices.iter().find(|d| d.device_id == id).ok_or_else(|| {
            CaptureError::DeviceAcquisitionFailure(format!("microphone '{}' not found", id))
        }),
        None => devices
            .first()
            .ok_or_else(|| CaptureError::DeviceAcquisitionFailure("no microphone available".into())),
    }
}

impl CaptureHost for FfmpegHost {
    async fn list_sources(&self) -> Result<Vec<CaptureSource>> {
        let sources = match self.platform {
            Platform::Linux => self.list_linux_sources().await?,
            Platform::MacOs => self.list_macos_sources().await?,
            Platform::Windows => self.list_windows_sources().await?,
        };
        info!("🖥️  Found {} capture sources", sources.len());
        Ok(sources)
    }

    async fn list_microphones(&self) -> Result<Vec<MicrophoneDevice>> {
        let devices: Vec<MicrophoneDevice> = match self.platform {
            Platform::Linux => {
                let out = run_tool("pactl", &["list", "sources"]).await?;
                listing::parse_pactl_sources(&out)
                    .into_iter()
                    .map(|e| MicrophoneDevice {
                        device_id: e.id,
                        label: e.name,
                    })
                    .collect()
            }
            Platform::MacOs => self
                .avfoundation_devices()
                .await?
                .audio
                .into_iter()
                .filter(|(_, name)| !listing::is_loopback_device(name))
                .map(|(index, name)| MicrophoneDevice {
                    device_id: index.to_string(),
                    label: name,
                })
                .collect(),
            Platform::Windows => self
                .dshow_audio_devices()
                .await?
                .into_iter()
                .filter(|name| !listing::is_loopback_device(name))
                .map(|name| MicrophoneDevice {
                    device_id: name.clone(),
                    label: name,
                })
                .collect(),
        };
        debug!("Found {} microphones", devices.len());
        Ok(devices)
    }

    async fn acquire_video(&self, source: &CaptureSource) -> Result<MediaFeed> {
        if source.input.format.is_empty() {
            return Err(CaptureError::DeviceAcquisitionFailure(format!(
                "source {} has no capture input",
                source.id
            )));
        }
        debug!("Video feed for {}", source.id);
        Ok(MediaFeed::new(vec![MediaTrack::video(
            source.name.clone(),
            source.input.clone(),
        )]))
    }

    async fn acquire_system_audio(&self, source: &CaptureSource) -> Result<MediaFeed> {
        let input = match self.platform {
            Platform::Linux => {
                let sink = run_tool("pactl", &["get-default-sink"])
                    .await
                    .map_err(acquisition_error)?;
                let sink = sink.trim();
                if sink.is_empty() {
                    return Err(CaptureError::DeviceAcquisitionFailure(
                        "no default audio sink".into(),
                    ));
                }
                InputSpec::new("pulse", format!("{}.monitor", sink))
                    .option("thread_queue_size", AUDIO_QUEUE_SIZE)
            }
            Platform::MacOs => {
                let devices = self.avfoundation_devices().await.map_err(acquisition_error)?;
                let (index, _) = devices
                    .audio
                    .iter()
                    .find(|(_, name)| listing::is_loopback_device(name))
                    .ok_or_else(|| {
                        CaptureError::DeviceAcquisitionFailure(
                            "no loopback audio device installed (e.g. BlackHole)".into(),
                        )
                    })?;
                InputSpec::new("avfoundation", format!(":{}", index))
                    .option("thread_queue_size", AUDIO_QUEUE_SIZE)
            }
            Platform::Windows => {
                let devices = self.dshow_audio_devices().await.map_err(acquisition_error)?;
                let name = devices
                    .iter()
                    .find(|name| listing::is_loopback_device(name))
                    .ok_or_else(|| {
                        CaptureError::DeviceAcquisitionFailure(
                            "no loopback audio device enabled (e.g. Stereo Mix)".into(),
                        )
                    })?;
                InputSpec::new("dshow", format!("audio={}", name))
                    .option("thread_queue_size", AUDIO_QUEUE_SIZE)
            }
        };

        debug!("System audio for {} from {}", source.id, input.target);
        Ok(MediaFeed::new(vec![MediaTrack::system_audio(
            "System audio",
            input,
        )]))
    }

    async fn acquire_microphone(&self, request: &MicrophoneRequest) -> Result<MediaFeed> {
        let devices = self.list_microphones().await.map_err(acquisition_error)?;
        let requested = request.device_id.as_deref();

        let (label, input) = match self.platform {
            Platform::Linux => match requested {
                Some(_) => {
                    let device = choose_device(&devices, requested)?;
                    (device.label.clone(), InputSpec::new("pulse", device.device_id.clone()))
                }
                None => ("Default microphone".to_string(), InputSpec::new("pulse", "default")),
            },
            Platform::MacOs => {
                let device = choose_device(&devices, requested)?;
                (
                    device.label.clone(),
                    InputSpec::new("avfoundation", format!(":{}", device.device_id)),
                )
            }
            Platform::Windows => {
                let device = choose_device(&devices, requested)?;
                (
                    device.label.clone(),
                    InputSpec::new("dshow", format!("audio={}", device.device_id)),
                )
            }
        };

        if request.echo_cancellation {
            debug!("Microphone {} with voice cleanup", label);
        } else {
            warn!("⚠️  Microphone {} without echo cancellation", label);
        }
        Ok(MediaFeed::new(vec![MediaTrack::microphone(
            label,
            input.option("thread_queue_size", AUDIO_QUEUE_SIZE),
            request.echo_cancellation,
        )]))
    }
}
