use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

use super::find_ffmpeg;
use crate::error::{CaptureError, Result};
use crate::media::{CombinedStream, InputSpec, MediaTrack};
use crate::mixer::MIX_OUTPUT_LABEL;
use crate::recorder::{ChunkSender, Encoder, EncodingSession};
use crate::{RecordingConfig, CONTAINER_MIME_TYPE};

const CHUNK_SIZE: usize = 64 * 1024;

fn track_input(track: &MediaTrack) -> Result<&InputSpec> {
    if !track.is_live() {
        return Err(CaptureError::EncoderConstructionFailure(format!(
            "track '{}' has already ended",
            track.label()
        )));
    }
    track.input().ok_or_else(|| {
        CaptureError::EncoderConstructionFailure(format!("track '{}' has no input", track.label()))
    })
}

/// Command line that encodes `stream` to WebM on stdout.
///
/// Input 0 is the video track; mixer inputs follow in origin order and are
/// merged by the graph's `-filter_complex`.
pub fn encoder_args(stream: &CombinedStream, config: &RecordingConfig) -> Result<Vec<String>> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
    let mut maps: Vec<String> = Vec::new();
    let mut next_input = 0usize;

    if let Some(video) = &stream.video {
        args.extend(track_input(video)?.to_args());
        maps.push("-map".into());
        maps.push(format!("{}:v", next_input));
        next_input += 1;
    }

    let mixed = match (&stream.audio, &stream.graph) {
        (Some(_), Some(graph)) => {
            let mut labels = Vec::with_capacity(graph.len());
            for track in graph.inputs() {
                args.extend(track_input(track)?.to_args());
                labels.push(format!("{}:a", next_input));
                next_input += 1;
            }
            let filter = graph.filter_description(&labels).ok_or_else(|| {
                CaptureError::EncoderConstructionFailure("mixing graph has no inputs".into())
            })?;
            args.push("-filter_complex".into());
            args.push(filter);
            maps.push("-map".into());
            maps.push(format!("[{}]", MIX_OUTPUT_LABEL));
            true
        }
        (Some(_), None) => {
            return Err(CaptureError::EncoderConstructionFailure(
                "audio track without a mixing graph".into(),
            ))
        }
        (None, _) => false,
    };

    if next_input == 0 {
        return Err(CaptureError::EncoderConstructionFailure(
            "stream has no tracks".into(),
        ));
    }
    args.extend(maps);

    if stream.video.is_some() {
        args.extend([
            "-c:v".to_string(),
            "libvpx-vp9".into(),
            "-deadline".into(),
            "realtime".into(),
            "-cpu-used".into(),
            "8".into(),
            "-row-mt".into(),
            "1".into(),
            "-b:v".into(),
            format!("{}k", config.video_bitrate_kbps),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ]);
    }
    if mixed {
        args.extend([
            "-c:a".to_string(),
            "libopus".into(),
            "-b:a".into(),
            format!("{}k", config.audio_bitrate_kbps),
        ]);
    }
    args.extend(["-f".to_string(), "webm".into(), "pipe:1".into()]);
    Ok(args)
}

/// VP9/Opus WebM encoder running `ffmpeg` per recording
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    config: RecordingConfig,
}

impl FfmpegEncoder {
    pub fn new(config: &RecordingConfig) -> Self {
        let ffmpeg = config
            .ffmpeg_path
            .clone()
            .or_else(find_ffmpeg)
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));
        Self {
            ffmpeg,
            config: config.clone(),
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }
}

impl Encoder for FfmpegEncoder {
    type Session = FfmpegSession;

    fn mime_type(&self) -> &str {
        CONTAINER_MIME_TYPE
    }

    async fn open(&self, stream: &CombinedStream, chunks: ChunkSender) -> Result<FfmpegSession> {
        let args = encoder_args(stream, &self.config)?;
        debug!("ffmpeg {}", args.join(" "));

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CaptureError::EncoderConstructionFailure(format!(
                    "failed to spawn {}: {}",
                    self.ffmpeg.display(),
                    e
                ))
            })?;

        let missing = |pipe: &str| {
            CaptureError::EncoderConstructionFailure(format!("ffmpeg {} not captured", pipe))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let mut stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        // Bad devices, a missing display or a missing codec make ffmpeg exit
        // right away.
        if let Ok(exited) = tokio::time::timeout(self.config.startup_grace, child.wait()).await {
            let mut diagnostics = String::new();
            if let Err(e) = stderr.read_to_string(&mut diagnostics).await {
                debug!("Encoder stderr unreadable: {}", e);
            }
            let status = match exited {
                Ok(status) => status.to_string(),
                Err(e) => e.to_string(),
            };
            return Err(CaptureError::EncoderConstructionFailure(format!(
                "ffmpeg exited during startup ({}): {}",
                status,
                diagnostics.trim()
            )));
        }

        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if chunks.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("⚠️  Reading encoder output failed: {}", e);
                        break;
                    }
                }
            }
        });

        let diagnostics = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("ffmpeg: {}", line);
            }
        });

        info!("🎞️  Encoder started (pid {:?})", child.id());
        Ok(FfmpegSession {
            child,
            stdin: Some(stdin),
            reader,
            diagnostics,
            stop_timeout: self.config.stop_timeout,
        })
    }
}

pub struct FfmpegSession {
    child: Child,
    stdin: Option<ChildStdin>,
    reader: JoinHandle<()>,
    diagnostics: JoinHandle<()>,
    stop_timeout: Duration,
}

impl EncodingSession for FfmpegSession {
    async fn stop(mut self) -> Result<()> {
        // `q` on stdin makes ffmpeg finish the container and exit
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                debug!("Encoder stdin closed early: {}", e);
            }
            drop(stdin);
        }

        let status = match tokio::time::timeout(self.stop_timeout, self.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                warn!("⚠️  Waiting for encoder failed: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    "⚠️  Encoder did not exit within {:?}, killing it",
                    self.stop_timeout
                );
                if let Err(e) = self.child.kill().await {
                    warn!("⚠️  Failed to kill encoder: {}", e);
                }
                None
            }
        };

        // Drains stdout; the sender is dropped when the reader finishes.
        if let Err(e) = self.reader.await {
            warn!("⚠️  Encoder reader task failed: {}", e);
        }
        if let Err(e) = self.diagnostics.await {
            debug!("Encoder diagnostics task failed: {}", e);
        }

        match status {
            Some(status) if !status.success() => Err(CaptureError::EncoderConstructionFailure(
                format!("ffmpeg exited with {}", status),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::MixingGraph;
    use crate::recorder::{Recorder, RecorderState};

    fn screen() -> MediaTrack {
        MediaTrack::video(
            "Display 1",
            InputSpec::new("x11grab", ":0+0,0").option("framerate", "30"),
        )
    }

    fn position(args: &[String], value: &str) -> usize {
        args.iter()
            .position(|a| a == value)
            .unwrap_or_else(|| panic!("{} missing from {:?}", value, args))
    }

    #[test]
    fn test_video_only_args() {
        let stream = CombinedStream {
            video: Some(screen()),
            audio: None,
            graph: None,
        };
        let args = encoder_args(&stream, &RecordingConfig::default()).unwrap();

        assert!(args.contains(&"libvpx-vp9".to_string()));
        assert!(args.contains(&"2500k".to_string()));
        assert!(!args.contains(&"-filter_complex".to_string()));
        assert!(!args.contains(&"libopus".to_string()));
        assert_eq!(args[position(&args, "-map") + 1], "0:v");
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn test_mixed_audio_args() {
        let mut graph = MixingGraph::new();
        graph
            .connect(MediaTrack::microphone("Mic", InputSpec::new("pulse", "default"), true))
            .unwrap();
        graph
            .connect(MediaTrack::system_audio(
                "System audio",
                InputSpec::new("pulse", "sink.monitor"),
            ))
            .unwrap();
        let stream = CombinedStream {
            video: Some(screen()),
            audio: Some(graph.destination().clone()),
            graph: Some(graph),
        };

        let args = encoder_args(&stream, &RecordingConfig::default()).unwrap();

        // system audio is input 1, microphone input 2
        let inputs: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| flag.as_str() == "-i")
            .map(|(_, target)| target)
            .collect();
        assert_eq!(inputs, vec![":0+0,0", "sink.monitor", "default"]);

        let filter = &args[position(&args, "-filter_complex") + 1];
        assert!(filter.starts_with("[1:a]anull[m0];[2:a]highpass=f=80,afftdn[m1]"));
        assert!(filter.ends_with("amix=inputs=2:duration=longest:normalize=0[aout]"));
        assert!(args.contains(&"[aout]".to_string()));
        assert!(args.contains(&"libopus".to_string()));
        assert!(args.contains(&"128k".to_string()));
    }

    #[test]
    fn test_ended_track_is_rejected() {
        let video = screen();
        video.stop();
        let stream = CombinedStream {
            video: Some(video),
            audio: None,
            graph: None,
        };
        assert!(matches!(
            encoder_args(&stream, &RecordingConfig::default()),
            Err(CaptureError::EncoderConstructionFailure(_))
        ));
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> RecordingConfig {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        RecordingConfig {
            ffmpeg_path: Some(path),
            stop_timeout: Duration::from_secs(5),
            startup_grace: Duration::from_secs(1),
            ..Default::default()
        }
    }

    #[cfg(unix)]
    fn video_stream() -> CombinedStream {
        CombinedStream {
            video: Some(screen()),
            audio: None,
            graph: None,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_waits_for_final_output() {
        let dir = tempfile::tempdir().unwrap();
        // The tail is only written once `q` arrives and stdin closes.
        let config = fake_ffmpeg(dir.path(), "printf head\nread -r _\nprintf tail");
        let mut recorder = Recorder::new(FfmpegEncoder::new(&config));

        recorder.start(Some(video_stream())).await.unwrap();
        assert_eq!(recorder.state(), RecorderState::Recording);

        let blob = recorder.stop().await.unwrap();
        assert_eq!(blob.bytes, b"headtail");
        assert_eq!(blob.mime_type, CONTAINER_MIME_TYPE);
        assert!(recorder.take_encoder_error().is_none());
        recorder.finish();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_encoder_exiting_at_startup_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_ffmpeg(dir.path(), "echo 'Cannot open display :0' >&2\nexit 1");
        let video = screen();
        let stream = CombinedStream {
            video: Some(video.clone()),
            audio: None,
            graph: None,
        };
        let mut recorder = Recorder::new(FfmpegEncoder::new(&config));

        let err = recorder.start(Some(stream)).await.unwrap_err();
        match err {
            CaptureError::EncoderConstructionFailure(message) => {
                assert!(message.contains("Cannot open display :0"), "{}", message)
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert!(video.is_live(), "the caller owns the tracks on failure");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abnormal_exit_on_stop_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_ffmpeg(dir.path(), "printf partial\nread -r _\nexit 3");
        let mut recorder = Recorder::new(FfmpegEncoder::new(&config));

        recorder.start(Some(video_stream())).await.unwrap();
        let blob = recorder.stop().await.unwrap();

        assert_eq!(blob.bytes, b"partial");
        assert!(matches!(
            recorder.take_encoder_error(),
            Some(CaptureError::EncoderConstructionFailure(_))
        ));
        recorder.finish();
    }

    #[test]
    fn test_audio_without_graph_is_rejected() {
        let stream = CombinedStream {
            video: Some(screen()),
            audio: Some(MediaTrack::system_audio("x", InputSpec::new("pulse", "a"))),
            graph: None,
        };
        assert!(encoder_args(&stream, &RecordingConfig::default()).is_err());
    }
}
