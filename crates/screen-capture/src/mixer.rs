// Track mixing
//
// All audio going into a recording passes through one MixingGraph: every
// input track is a node connected to a single destination, and the
// destination is the only audio track the encoder sees. Inputs are keyed by
// their origin, never by the order they were collected in.

use log::{debug, warn};

use crate::error::{CaptureError, Result};
use crate::host::{CaptureHost, MicrophoneRequest};
use crate::media::{CombinedStream, MediaFeed, MediaTrack, TrackKind, TrackOrigin};

/// Filter-graph label of the mixed output
pub const MIX_OUTPUT_LABEL: &str = "aout";

/// Voice cleanup applied to echo-cancelled inputs
const VOICE_CHAIN: &str = "highpass=f=80,afftdn";

#[derive(Debug, Clone)]
pub struct MixingGraph {
    inputs: Vec<MediaTrack>,
    destination: MediaTrack,
}

impl Default for MixingGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MixingGraph {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            destination: MediaTrack::mix(),
        }
    }

    /// Connect an audio track as an input node. One input per origin.
    pub fn connect(&mut self, track: MediaTrack) -> Result<()> {
        if track.kind() != TrackKind::Audio {
            return Err(CaptureError::InvalidState(format!(
                "cannot mix non-audio track '{}'",
                track.label()
            )));
        }
        if track.origin() == TrackOrigin::Mix {
            return Err(CaptureError::InvalidState("cannot feed a mix into a mix".into()));
        }
        if !track.is_live() {
            return Err(CaptureError::InvalidState(format!(
                "track '{}' has already ended",
                track.label()
            )));
        }
        if self.input(track.origin()).is_some() {
            return Err(CaptureError::InvalidState(format!(
                "an input of origin {:?} is already connected",
                track.origin()
            )));
        }

        debug!("🎚️  Mixer input connected: {} ({:?})", track.label(), track.origin());
        self.inputs.push(track);
        self.inputs.sort_by_key(|t| t.origin());
        Ok(())
    }

    /// Inputs ordered by origin: system audio before microphone.
    pub fn inputs(&self) -> &[MediaTrack] {
        &self.inputs
    }

    pub fn input(&self, origin: TrackOrigin) -> Option<&MediaTrack> {
        self.inputs.iter().find(|t| t.origin() == origin)
    }

    pub fn destination(&self) -> &MediaTrack {
        &self.destination
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Render the graph as an ffmpeg `-filter_complex` description.
    ///
    /// `stream_labels[i]` is the ffmpeg stream specifier (e.g. `1:a`) feeding
    /// `inputs()[i]`. The output is labelled [`MIX_OUTPUT_LABEL`].
    pub fn filter_description(&self, stream_labels: &[String]) -> Option<String> {
        if self.inputs.is_empty() || stream_labels.len() != self.inputs.len() {
            return None;
        }

        let chain = |track: &MediaTrack| {
            if track.echo_cancellation() {
                VOICE_CHAIN
            } else {
                "anull"
            }
        };

        if let [only] = self.inputs.as_slice() {
            return Some(format!(
                "[{}]{}[{}]",
                stream_labels[0],
                chain(only),
                MIX_OUTPUT_LABEL
            ));
        }

        let mut parts = Vec::with_capacity(self.inputs.len() + 1);
        let mut nodes = String::new();
        for (i, (track, label)) in self.inputs.iter().zip(stream_labels).enumerate() {
            parts.push(format!("[{}]{}[m{}]", label, chain(track), i));
            nodes.push_str(&format!("[m{}]", i));
        }
        parts.push(format!(
            "{}amix=inputs={}:duration=longest:normalize=0[{}]",
            nodes,
            self.inputs.len(),
            MIX_OUTPUT_LABEL
        ));
        Some(parts.join(";"))
    }
}

/// What to gather into a recording stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    pub system_audio: bool,
    pub microphone: bool,
    pub microphone_device_id: Option<String>,
}

/// A composed stream plus the acquisitions that were skipped along the way
#[derive(Debug)]
pub struct Composition {
    pub stream: CombinedStream,
    pub failures: Vec<CaptureError>,
}

/// Build the stream to record from the bound preview feed.
///
/// System audio is taken from `video_feed`; the microphone is acquired
/// fresh. A failed microphone acquisition is logged and left out.
pub async fn compose_recording_stream<H: CaptureHost>(
    host: &H,
    video_feed: &MediaFeed,
    options: &ComposeOptions,
) -> Composition {
    let mut failures = Vec::new();
    let mut collected: Vec<MediaTrack> = Vec::new();

    if options.system_audio {
        let before = collected.len();
        collected.extend(
            video_feed
                .audio_tracks()
                .filter(|t| t.origin() == TrackOrigin::SystemAudio && t.is_live())
                .cloned(),
        );
        if collected.len() == before {
            debug!("System audio requested but the preview feed carries none");
        }
    }

    if options.microphone {
        let request = MicrophoneRequest::new(options.microphone_device_id.clone());
        match host.acquire_microphone(&request).await {
            Ok(feed) => {
                let mut tracks = feed.audio_tracks().cloned();
                match tracks.next() {
                    Some(track) => collected.push(track),
                    None => warn!("⚠️  Microphone feed has no audio track"),
                }
                for extra in tracks {
                    extra.stop();
                }
                for video in feed.video_tracks() {
                    video.stop();
                }
            }
            Err(e) => {
                warn!("⚠️  Recording continues without microphone: {}", e);
                failures.push(e);
            }
        }
    }

    let video = video_feed.video_tracks().find(|t| t.is_live()).cloned();

    let mut graph = MixingGraph::new();
    for track in collected {
        if let Err(e) = graph.connect(track.clone()) {
            warn!("⚠️  Skipping audio track '{}': {}", track.label(), e);
            if track.origin() == TrackOrigin::Microphone {
                track.stop();
            }
        }
    }

    let stream = if graph.is_empty() {
        CombinedStream {
            video,
            audio: None,
            graph: None,
        }
    } else {
        CombinedStream {
            video,
            audio: Some(graph.destination().clone()),
            graph: Some(graph),
        }
    };

    Composition { stream, failures }
}
