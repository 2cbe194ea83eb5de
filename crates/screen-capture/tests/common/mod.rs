// In-memory host, encoder, surface and dialog for exercising the recording flow
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use screen_capture::{
    CaptureError, CaptureHost, CaptureSource, ChunkSender, CombinedStream, Encoder,
    EncodingSession, InputSpec, MediaFeed, MediaTrack, MicrophoneDevice, MicrophoneRequest,
    PreviewSurface, RecordingController, Result, SaveDialog, SaveDialogOptions,
};

pub type TestController = RecordingController<FakeHost, FakeEncoder, FakeSurface, FakeDialog>;

#[derive(Default)]
pub struct HostState {
    pub mic_denied: AtomicBool,
    pub system_audio_denied: AtomicBool,
    pub video_acquisitions: AtomicUsize,
    pub system_audio_acquisitions: AtomicUsize,
    pub microphone_requests: Mutex<Vec<MicrophoneRequest>>,
    /// Every track handed out, in order
    pub issued: Mutex<Vec<MediaTrack>>,
    /// Per-source delay before `acquire_video` resolves
    pub video_delays: Mutex<HashMap<String, Duration>>,
    /// Sources whose video cannot be acquired
    pub video_denied: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
pub struct FakeHost {
    pub state: Arc<HostState>,
}

impl FakeHost {
    pub fn deny_microphone(self) -> Self {
        self.state.mic_denied.store(true, Ordering::SeqCst);
        self
    }

    pub fn deny_system_audio(self) -> Self {
        self.state.system_audio_denied.store(true, Ordering::SeqCst);
        self
    }

    pub fn delay_video(self, source_id: &str, delay: Duration) -> Self {
        self.state
            .video_delays
            .lock()
            .unwrap()
            .insert(source_id.to_string(), delay);
        self
    }

    pub fn deny_video(&self, source_id: &str) {
        self.state.video_denied.lock().unwrap().push(source_id.to_string());
    }

    pub fn issued(&self) -> Vec<MediaTrack> {
        self.state.issued.lock().unwrap().clone()
    }

    pub fn video_acquisitions(&self) -> usize {
        self.state.video_acquisitions.load(Ordering::SeqCst)
    }

    fn issue(&self, track: MediaTrack) -> MediaFeed {
        self.state.issued.lock().unwrap().push(track.clone());
        MediaFeed::new(vec![track])
    }
}

impl CaptureHost for FakeHost {
    async fn list_sources(&self) -> Result<Vec<CaptureSource>> {
        Ok(vec![
            CaptureSource::screen(0, "Display 1", InputSpec::new("lavfi", "testsrc")),
            CaptureSource::screen(1, "Display 2", InputSpec::new("lavfi", "testsrc2")),
            CaptureSource::window("42", "Editor", InputSpec::new("lavfi", "smptebars")),
        ])
    }

    async fn list_microphones(&self) -> Result<Vec<MicrophoneDevice>> {
        Ok(vec![
            MicrophoneDevice {
                device_id: "mic-a".into(),
                label: "Built-in Microphone".into(),
            },
            MicrophoneDevice {
                device_id: "mic-b".into(),
                label: String::new(),
            },
        ])
    }

    async fn acquire_video(&self, source: &CaptureSource) -> Result<MediaFeed> {
        let delay = self.state.video_delays.lock().unwrap().get(&source.id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.video_denied.lock().unwrap().contains(&source.id) {
            return Err(CaptureError::DeviceAcquisitionFailure("capture revoked".into()));
        }
        self.state.video_acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(self.issue(MediaTrack::video(source.name.clone(), source.input.clone())))
    }

    async fn acquire_system_audio(&self, _source: &CaptureSource) -> Result<MediaFeed> {
        if self.state.system_audio_denied.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceAcquisitionFailure("loopback missing".into()));
        }
        self.state.system_audio_acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(self.issue(MediaTrack::system_audio(
            "System audio",
            InputSpec::new("lavfi", "sine"),
        )))
    }

    async fn acquire_microphone(&self, request: &MicrophoneRequest) -> Result<MediaFeed> {
        self.state.microphone_requests.lock().unwrap().push(request.clone());
        if self.state.mic_denied.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceAcquisitionFailure("permission denied".into()));
        }
        Ok(self.issue(MediaTrack::microphone(
            "Built-in Microphone",
            InputSpec::new("lavfi", "anoisesrc"),
            request.echo_cancellation,
        )))
    }
}

#[derive(Default)]
pub struct EncoderState {
    pub fail_open: AtomicBool,
    pub fail_stop: AtomicBool,
    /// (video tracks, audio tracks) of every opened stream
    pub opened: Mutex<Vec<(usize, usize)>>,
    pub stopped: AtomicUsize,
}

/// Emits `chunks` when opened and `flush` when stopped.
#[derive(Clone, Default)]
pub struct FakeEncoder {
    pub chunks: Vec<Vec<u8>>,
    pub flush: Vec<u8>,
    pub state: Arc<EncoderState>,
}

impl FakeEncoder {
    pub fn producing(chunks: &[&str], flush: &str) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            flush: flush.as_bytes().to_vec(),
            state: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        let encoder = Self::default();
        encoder.state.fail_open.store(true, Ordering::SeqCst);
        encoder
    }

    /// Produces its chunks but exits abnormally on stop.
    pub fn crashing_on_stop(chunks: &[&str]) -> Self {
        let encoder = Self::producing(chunks, "");
        encoder.state.fail_stop.store(true, Ordering::SeqCst);
        encoder
    }

    pub fn opened(&self) -> Vec<(usize, usize)> {
        self.state.opened.lock().unwrap().clone()
    }
}

pub struct FakeSession {
    tx: ChunkSender,
    flush: Vec<u8>,
    state: Arc<EncoderState>,
}

impl Encoder for FakeEncoder {
    type Session = FakeSession;

    fn mime_type(&self) -> &str {
        screen_capture::CONTAINER_MIME_TYPE
    }

    async fn open(&self, stream: &CombinedStream, chunks: ChunkSender) -> Result<FakeSession> {
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(CaptureError::EncoderConstructionFailure(
                "codec unsupported".into(),
            ));
        }
        self.state
            .opened
            .lock()
            .unwrap()
            .push((stream.video_track_count(), stream.audio_track_count()));
        for chunk in &self.chunks {
            let _ = chunks.send(chunk.clone());
        }
        Ok(FakeSession {
            tx: chunks,
            flush: self.flush.clone(),
            state: Arc::clone(&self.state),
        })
    }
}

impl EncodingSession for FakeSession {
    async fn stop(self) -> Result<()> {
        if !self.flush.is_empty() {
            let _ = self.tx.send(self.flush.clone());
        }
        self.state.stopped.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_stop.load(Ordering::SeqCst) {
            return Err(CaptureError::EncoderConstructionFailure(
                "ffmpeg exited with exit status: 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct SurfaceState {
    pub attached: Mutex<Vec<(String, usize)>>,
    pub detached: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FakeSurface {
    pub state: Arc<SurfaceState>,
}

impl FakeSurface {
    /// (source id, track count) of every attach
    pub fn attached(&self) -> Vec<(String, usize)> {
        self.state.attached.lock().unwrap().clone()
    }

    pub fn detached(&self) -> usize {
        self.state.detached.load(Ordering::SeqCst)
    }
}

impl PreviewSurface for FakeSurface {
    fn attach(&self, source: &CaptureSource, feed: &MediaFeed) {
        self.state
            .attached
            .lock()
            .unwrap()
            .push((source.id.clone(), feed.len()));
    }

    fn detach(&self) {
        self.state.detached.fetch_add(1, Ordering::SeqCst);
    }
}

/// Answers every request with `<dir>/<default file name>`, or cancels.
#[derive(Clone)]
pub struct FakeDialog {
    pub dir: PathBuf,
    pub cancel: bool,
    pub requests: Arc<Mutex<Vec<SaveDialogOptions>>>,
}

impl FakeDialog {
    pub fn saving_to(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cancel: false,
            requests: Arc::default(),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            dir: PathBuf::new(),
            cancel: true,
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<SaveDialogOptions> {
        self.requests.lock().unwrap().clone()
    }
}

impl SaveDialog for FakeDialog {
    async fn choose_path(&self, options: SaveDialogOptions) -> Option<PathBuf> {
        let path = self.dir.join(&options.default_file_name);
        self.requests.lock().unwrap().push(options);
        if self.cancel {
            None
        } else {
            Some(path)
        }
    }
}

pub fn controller(host: FakeHost, encoder: FakeEncoder, dialog: FakeDialog) -> TestController {
    RecordingController::new(host, encoder, FakeSurface::default(), dialog, None)
}
