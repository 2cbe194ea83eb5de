// Media tracks and feeds
//
// A track is a shared handle: every clone observes the same live/ended state,
// so stopping the preview's audio track also stops it inside a composed
// stream. Once stopped a track never comes back.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::mixer::MixingGraph;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// An ffmpeg input: `-f <format> [-key value]... -i <target>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputSpec {
    pub format: String,
    pub options: Vec<(String, String)>,
    pub target: String,
}

impl InputSpec {
    pub fn new(format: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            options: Vec::new(),
            target: target.into(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.format.clone()];
        for (key, value) in &self.options {
            args.push(format!("-{}", key));
            args.push(value.clone());
        }
        args.push("-i".to_string());
        args.push(self.target.clone());
        args
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Where a track's media comes from. Mixer inputs are routed by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOrigin {
    Display,
    SystemAudio,
    Microphone,
    Mix,
}

#[derive(Debug)]
struct TrackInner {
    id: u64,
    kind: TrackKind,
    origin: TrackOrigin,
    label: String,
    input: Option<InputSpec>,
    echo_cancellation: bool,
    ended: AtomicBool,
}

#[derive(Debug, Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    fn build(
        kind: TrackKind,
        origin: TrackOrigin,
        label: String,
        input: Option<InputSpec>,
        echo_cancellation: bool,
    ) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed),
                kind,
                origin,
                label,
                input,
                echo_cancellation,
                ended: AtomicBool::new(false),
            }),
        }
    }

    pub fn video(label: impl Into<String>, input: InputSpec) -> Self {
        Self::build(TrackKind::Video, TrackOrigin::Display, label.into(), Some(input), false)
    }

    /// Desktop audio. Never echo-cancelled: it is not voice input.
    pub fn system_audio(label: impl Into<String>, input: InputSpec) -> Self {
        Self::build(TrackKind::Audio, TrackOrigin::SystemAudio, label.into(), Some(input), false)
    }

    pub fn microphone(label: impl Into<String>, input: InputSpec, echo_cancellation: bool) -> Self {
        Self::build(
            TrackKind::Audio,
            TrackOrigin::Microphone,
            label.into(),
            Some(input),
            echo_cancellation,
        )
    }

    /// Output of a mixing graph; it has no input of its own.
    pub(crate) fn mix() -> Self {
        Self::build(TrackKind::Audio, TrackOrigin::Mix, "Mixed audio".to_string(), None, false)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn origin(&self) -> TrackOrigin {
        self.inner.origin
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn input(&self) -> Option<&InputSpec> {
        self.inner.input.as_ref()
    }

    pub fn echo_cancellation(&self) -> bool {
        self.inner.echo_cancellation
    }

    pub fn is_live(&self) -> bool {
        !self.inner.ended.load(Ordering::SeqCst)
    }

    /// Stop the track. Returns `true` only for the call that ended it.
    pub fn stop(&self) -> bool {
        !self.inner.ended.swap(true, Ordering::SeqCst)
    }

    /// Whether both handles refer to the same underlying track.
    pub fn same_as(&self, other: &MediaTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            id: self.id(),
            kind: self.kind(),
            origin: self.origin(),
            label: self.label().to_string(),
            live: self.is_live(),
        }
    }
}

/// Frontend view of a track
#[derive(Debug, Clone, Serialize)]
pub struct TrackInfo {
    pub id: u64,
    pub kind: TrackKind,
    pub origin: TrackOrigin,
    pub label: String,
    pub live: bool,
}

/// Tracks acquired together from one request
#[derive(Debug, Clone, Default)]
pub struct MediaFeed {
    tracks: Vec<MediaTrack>,
}

impl MediaFeed {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn push(&mut self, track: MediaTrack) {
        self.tracks.push(track);
    }

    pub fn extend(&mut self, other: MediaFeed) {
        self.tracks.extend(other.tracks);
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| t.is_live())
    }

    /// Stop every track, returning how many were still live.
    pub fn stop(&self) -> usize {
        self.tracks.iter().filter(|t| t.stop()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }
}

/// The single stream handed to an encoding session.
///
/// Holds at most one video track and at most one audio track. When audio is
/// present it is the output of `graph`, whose inputs are the original
/// system-audio and microphone tracks.
#[derive(Debug, Clone, Default)]
pub struct CombinedStream {
    pub video: Option<MediaTrack>,
    pub audio: Option<MediaTrack>,
    pub graph: Option<MixingGraph>,
}

impl CombinedStream {
    pub fn video_track_count(&self) -> usize {
        usize::from(self.video.is_some())
    }

    pub fn audio_track_count(&self) -> usize {
        usize::from(self.audio.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    /// Every track the stream depends on, including mixer inputs.
    pub fn all_tracks(&self) -> Vec<MediaTrack> {
        let mut tracks = Vec::new();
        tracks.extend(self.video.iter().cloned());
        tracks.extend(self.audio.iter().cloned());
        if let Some(graph) = &self.graph {
            tracks.extend(graph.inputs().iter().cloned());
        }
        tracks
    }

    /// Release platform resources for the whole stream.
    pub fn stop_all(&self) -> usize {
        self.all_tracks().iter().filter(|t| t.stop()).count()
    }
}
