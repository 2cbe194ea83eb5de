// Recording controller
//
// Owns everything the window manipulates: the bound preview, the recorder,
// the timer, the persister and the current settings. Preview binds and
// setting changes take `&self` so they can overlap; recording transitions
// take `&mut self`.

use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{CaptureError, Result};
use crate::host::{CaptureHost, PreviewSurface};
use crate::mixer::compose_recording_stream;
use crate::persist::{Persister, SaveDialog, SaveOutcome};
use crate::preview::{BindOutcome, PreviewBinder};
use crate::recorder::{Encoder, Recorder, RecorderState};
use crate::session::{CaptureSettings, RecordingSession};
use crate::source::{CaptureSource, MicrophoneDevice};
use crate::timer::ElapsedTimer;

pub type TickListener = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Debug)]
pub struct StartReport {
    pub source_id: String,
    pub video_tracks: usize,
    pub audio_tracks: usize,
    /// Acquisitions that failed and were left out of the recording.
    pub failures: Vec<CaptureError>,
}

#[derive(Debug)]
pub struct StopReport {
    pub bytes: usize,
    /// The encoder exited abnormally; whatever it produced was still saved.
    pub encoder: Option<CaptureError>,
    pub save: Result<SaveOutcome>,
    pub tracks_released: usize,
    /// Result of re-binding the idle preview, if a source was selected.
    pub preview: Option<Result<BindOutcome>>,
}

#[derive(Debug)]
pub enum Toggled {
    Started(StartReport),
    Stopped(StopReport),
}

pub struct RecordingController<H, E, S, D>
where
    H: CaptureHost,
    E: Encoder,
    S: PreviewSurface,
    D: SaveDialog,
{
    host: H,
    preview: PreviewBinder<S>,
    recorder: Recorder<E>,
    persister: Persister<D>,
    timer: ElapsedTimer,
    settings: Mutex<CaptureSettings>,
    session: Option<RecordingSession>,
    on_tick: Option<TickListener>,
}

impl<H, E, S, D> RecordingController<H, E, S, D>
where
    H: CaptureHost,
    E: Encoder,
    S: PreviewSurface,
    D: SaveDialog,
{
    pub fn new(host: H, encoder: E, surface: S, dialog: D, default_save_dir: Option<PathBuf>) -> Self {
        Self {
            host,
            preview: PreviewBinder::new(surface),
            recorder: Recorder::new(encoder),
            persister: Persister::new(dialog, default_save_dir),
            timer: ElapsedTimer::new(),
            settings: Mutex::new(CaptureSettings::default()),
            session: None,
            on_tick: None,
        }
    }

    /// Called with the elapsed seconds after every timer tick.
    pub fn with_tick_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.on_tick = Some(Arc::new(listener));
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn preview(&self) -> &PreviewBinder<S> {
        &self.preview
    }

    pub fn recorder(&self) -> &Recorder<E> {
        &self.recorder
    }

    pub fn persister(&self) -> &Persister<D> {
        &self.persister
    }

    pub fn timer(&self) -> &ElapsedTimer {
        &self.timer
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> RecorderState {
        self.recorder.state()
    }

    pub fn elapsed_display(&self) -> String {
        self.timer.display()
    }

    fn settings_slot(&self) -> MutexGuard<'_, CaptureSettings> {
        self.settings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings_slot().clone()
    }

    pub fn set_system_audio(&self, enabled: bool) {
        self.settings_slot().system_audio_enabled = enabled;
    }

    pub fn set_microphone(&self, enabled: bool) {
        self.settings_slot().microphone_enabled = enabled;
    }

    pub fn set_microphone_device(&self, device_id: Option<String>) {
        self.settings_slot().microphone_device_id = device_id.filter(|id| !id.is_empty());
    }

    pub async fn list_sources(&self) -> Result<Vec<CaptureSource>> {
        self.host.list_sources().await
    }

    pub async fn list_microphones(&self) -> Result<Vec<MicrophoneDevice>> {
        self.host.list_microphones().await
    }

    /// Select a source and bind its preview.
    pub async fn select_source(&self, source_id: &str) -> Result<BindOutcome> {
        if self.state() != RecorderState::Idle {
            return Err(CaptureError::InvalidState(
                "cannot change source while recording".into(),
            ));
        }

        let system_audio = self.settings_slot().system_audio_enabled;
        let outcome = self.preview.bind(&self.host, source_id, system_audio).await?;
        if let BindOutcome::Bound { source, .. } = &outcome {
            self.settings_slot().selected_source_id = Some(source.id.clone());
        }
        Ok(outcome)
    }

    /// Idle → Recording
    pub async fn start(&mut self) -> Result<StartReport> {
        if self.state() != RecorderState::Idle {
            return Err(CaptureError::InvalidState(format!(
                "cannot start while {:?}",
                self.state()
            )));
        }

        let settings = self.settings();
        let source_id = settings
            .selected_source_id
            .clone()
            .ok_or(CaptureError::NoStreamAvailable)?;
        if self.preview.feed().is_none() {
            return Err(CaptureError::NoStreamAvailable);
        }

        // Re-acquire so the feed matches the current system-sound toggle.
        let outcome = self
            .preview
            .bind(&self.host, &source_id, settings.system_audio_enabled)
            .await?;
        if !outcome.is_bound() {
            return Err(CaptureError::NoStreamAvailable);
        }
        let feed = self.preview.feed().ok_or(CaptureError::NoStreamAvailable)?;

        let composition =
            compose_recording_stream(&self.host, &feed, &settings.compose_options()).await;
        let stream = composition.stream;
        let video_tracks = stream.video_track_count();
        let audio_tracks = stream.audio_track_count();

        if let Err(e) = self.recorder.start(Some(stream.clone())).await {
            error!("❌ Failed to start recording: {}", e);
            stream.stop_all();
            if let Err(rebind) = self
                .preview
                .bind(&self.host, &source_id, settings.system_audio_enabled)
                .await
            {
                warn!("⚠️  Could not restore preview: {}", rebind);
            }
            return Err(e);
        }

        let listener = self.on_tick.clone();
        self.timer.start(move |seconds| {
            if let Some(listener) = &listener {
                listener(seconds);
            }
        });
        self.session = Some(RecordingSession::begin(source_id.clone(), &settings));

        info!(
            "🎬 Recording {} ({} video, {} audio, {} skipped)",
            source_id,
            video_tracks,
            audio_tracks,
            composition.failures.len()
        );
        Ok(StartReport {
            source_id,
            video_tracks,
            audio_tracks,
            failures: composition.failures,
        })
    }

    /// Recording → Finalizing → Idle
    pub async fn stop(&mut self) -> Result<StopReport> {
        let blob = self.recorder.stop().await?;
        let encoder = self.recorder.take_encoder_error();

        let save = self.persister.save(&blob).await;
        if let Err(e) = &save {
            error!("❌ Recording could not be saved: {}", e);
        }

        let tracks_released = self.recorder.finish();
        self.timer.reset();
        self.session = None;

        let settings = self.settings();
        let preview = match settings.selected_source_id {
            Some(source_id) => {
                let result = self
                    .preview
                    .bind(&self.host, &source_id, settings.system_audio_enabled)
                    .await;
                if let Err(e) = &result {
                    warn!("⚠️  Could not re-bind preview for {}: {}", source_id, e);
                }
                Some(result)
            }
            None => None,
        };

        Ok(StopReport {
            bytes: blob.len(),
            encoder,
            save,
            tracks_released,
            preview,
        })
    }

    /// The start/stop button.
    pub async fn toggle(&mut self) -> Result<Toggled> {
        match self.state() {
            RecorderState::Idle => self.start().await.map(Toggled::Started),
            RecorderState::Recording => self.stop().await.map(Toggled::Stopped),
            RecorderState::Finalizing => Err(CaptureError::InvalidState(
                "previous recording is still being saved".into(),
            )),
        }
    }

    /// Release everything before the window closes. Unsaved media is dropped.
    pub async fn shutdown(&mut self) {
        self.timer.reset();
        self.recorder.abort().await;
        self.session = None;
        self.preview.release();
        info!("Capture released for shutdown");
    }
}
