// Parsers for the platform listing tools
//
// Each takes the raw text a tool prints and returns plain records; the host
// turns those into sources and devices.

/// A monitor from `xrandr --listmonitors`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub index: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

/// A top-level window with a title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeWindow {
    pub id: String,
    pub title: String,
}

/// An audio endpoint: `id` is what the capture backend opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEndpoint {
    pub id: String,
    pub name: String,
}

/// Devices reported by `ffmpeg -f avfoundation -list_devices true`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvFoundationDevices {
    pub video: Vec<(u32, String)>,
    pub audio: Vec<(u32, String)>,
}

/// Parses lines like ` 0: +*eDP-1 1920/344x1080/193+0+0  eDP-1`
pub fn parse_xrandr_monitors(output: &str) -> Vec<Monitor> {
    output
        .lines()
        .filter_map(|line| {
            let (index, rest) = line.trim().split_once(':')?;
            let index = index.trim().parse::<u32>().ok()?;

            let mut fields = rest.split_whitespace();
            let flagged_name = fields.next()?;
            let geometry = fields.next()?;
            let name = fields
                .next()
                .map(str::to_string)
                .unwrap_or_else(|| flagged_name.trim_start_matches(['+', '*']).to_string());

            let (width_part, rest) = geometry.split_once('x')?;
            let width = width_part.split('/').next()?.parse().ok()?;
            let mut offsets = rest.split('+');
            let height = offsets.next()?.split('/').next()?.parse().ok()?;
            let x = offsets.next()?.parse().ok()?;
            let y = offsets.next()?.parse().ok()?;

            Some(Monitor {
                index,
                name,
                width,
                height,
                x,
                y,
            })
        })
        .collect()
}

/// Parses `wmctrl -l`: `<id> <desktop> <host> <title...>`.
/// Sticky windows (desktop -1: panels, docks) and untitled ones are skipped.
pub fn parse_wmctrl_windows(output: &str) -> Vec<NativeWindow> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let id = fields.next()?;
            let desktop = fields.next()?;
            let _host = fields.next()?;
            let title = fields.collect::<Vec<_>>().join(" ");

            if !id.starts_with("0x") || desktop == "-1" || title.is_empty() {
                return None;
            }
            Some(NativeWindow {
                id: id.to_string(),
                title,
            })
        })
        .collect()
}

/// Parses `pactl list sources`, keeping inputs only (monitors are dropped).
pub fn parse_pactl_sources(output: &str) -> Vec<AudioEndpoint> {
    let mut endpoints = Vec::new();
    let mut name = String::new();
    let mut description = String::new();

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Source #") {
            push_pactl_source(&mut endpoints, &mut name, &mut description);
        } else if let Some(rest) = trimmed.strip_prefix("Name: ") {
            name = rest.to_string();
        } else if let Some(rest) = trimmed.strip_prefix("Description: ") {
            description = rest.to_string();
        }
    }
    push_pactl_source(&mut endpoints, &mut name, &mut description);

    endpoints
}

fn push_pactl_source(endpoints: &mut Vec<AudioEndpoint>, name: &mut String, description: &mut String) {
    let id = std::mem::take(name);
    let label = std::mem::take(description);
    if id.is_empty() || id.ends_with(".monitor") {
        return;
    }
    endpoints.push(AudioEndpoint { id, name: label });
}

// "[AVFoundation indev @ 0x7f8] [1] Capture screen 0" -> "[1] Capture screen 0"
fn strip_log_prefix(line: &str) -> &str {
    match line.trim().strip_prefix('[') {
        Some(rest) => rest.split_once("] ").map(|(_, msg)| msg).unwrap_or(rest),
        None => line.trim(),
    }
}

fn parse_indexed(message: &str) -> Option<(u32, String)> {
    let rest = message.strip_prefix('[')?;
    let (index, name) = rest.split_once(']')?;
    Some((index.parse().ok()?, name.trim().to_string()))
}

pub fn parse_avfoundation_devices(output: &str) -> AvFoundationDevices {
    #[derive(PartialEq)]
    enum Section {
        None,
        Video,
        Audio,
    }

    let mut devices = AvFoundationDevices::default();
    let mut section = Section::None;

    for line in output.lines() {
        let message = strip_log_prefix(line);
        if message.contains("video devices:") {
            section = Section::Video;
        } else if message.contains("audio devices:") {
            section = Section::Audio;
        } else if let Some(entry) = parse_indexed(message) {
            match section {
                Section::Video => devices.video.push(entry),
                Section::Audio => devices.audio.push(entry),
                Section::None => {}
            }
        }
    }
    devices
}

/// `Capture screen 1` -> `Some(1)`
pub fn avfoundation_screen_number(name: &str) -> Option<u32> {
    name.strip_prefix("Capture screen ")?.trim().parse().ok()
}

/// Audio device names from `ffmpeg -list_devices true -f dshow -i dummy`.
/// Handles both the `"name" (audio)` form and the older sectioned form.
pub fn parse_dshow_audio_devices(output: &str) -> Vec<String> {
    let mut in_audio_section = false;
    let mut names = Vec::new();

    for line in output.lines() {
        let message = strip_log_prefix(line).trim();
        if message.contains("DirectShow video devices") {
            in_audio_section = false;
            continue;
        }
        if message.contains("DirectShow audio devices") {
            in_audio_section = true;
            continue;
        }
        if message.starts_with("Alternative name") {
            continue;
        }
        let Some(rest) = message.strip_prefix('"') else {
            continue;
        };
        let Some((name, tail)) = rest.split_once('"') else {
            continue;
        };

        let is_audio = if tail.contains("(audio)") {
            true
        } else if tail.contains("(video)") {
            false
        } else {
            in_audio_section
        };
        if is_audio && !name.is_empty() {
            names.push(name.to_string());
        }
    }
    names
}

/// Parses `<x>\t<y>\t<width>\t<height>\t<device>` lines from the PowerShell
/// screen listing. Monitors are indexed in listing order.
pub fn parse_tabbed_screens(output: &str) -> Vec<Monitor> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\t').map(str::trim);
            let x = fields.next()?.parse().ok()?;
            let y = fields.next()?.parse().ok()?;
            let width = fields.next()?.parse().ok()?;
            let height = fields.next()?.parse().ok()?;
            let name = fields.next().unwrap_or_default().to_string();
            Some((name, width, height, x, y))
        })
        .enumerate()
        .map(|(index, (name, width, height, x, y))| Monitor {
            index: index as u32,
            name,
            width,
            height,
            x,
            y,
        })
        .collect()
}

/// Parses `<pid>\t<title>` lines from the PowerShell window listing
pub fn parse_tabbed_windows(output: &str) -> Vec<NativeWindow> {
    output
        .lines()
        .filter_map(|line| {
            let (id, title) = line.trim_end_matches('\r').split_once('\t')?;
            let title = title.trim();
            if id.trim().is_empty() || title.is_empty() {
                return None;
            }
            Some(NativeWindow {
                id: id.trim().to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}

/// Virtual devices that carry what the speakers play
pub fn is_loopback_device(name: &str) -> bool {
    const LOOPBACK_NAMES: [&str; 6] = [
        "blackhole",
        "soundflower",
        "loopback",
        "stereo mix",
        "virtual-audio-capturer",
        "cable output",
    ];
    let lower = name.to_lowercase();
    LOOPBACK_NAMES.iter().any(|n| lower.contains(n))
}
