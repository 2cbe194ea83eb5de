// Recorder state machine: Idle → Recording → Finalizing → Idle
//
// The recorder owns the encoding session and the chunk list. Stopping waits
// for the encoder to flush and for the collector task to drain the chunk
// channel, so the blob is built from the complete list.

use log::{debug, info, warn};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{CaptureError, Result};
use crate::media::CombinedStream;

/// Encoded chunks flow from the encoding session to the recorder through this
pub type ChunkSender = mpsc::UnboundedSender<Vec<u8>>;

/// Something that turns a combined stream into container chunks
pub trait Encoder: Send + Sync {
    type Session: EncodingSession;

    /// Media type of the produced container, e.g. `video/webm; codecs=vp9`.
    fn mime_type(&self) -> &str;

    /// Open a session. Chunks are sent on `chunks` as they become available.
    /// Resolves once the encoder is known to be running.
    fn open(
        &self,
        stream: &CombinedStream,
        chunks: ChunkSender,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

pub trait EncodingSession: Send {
    /// Stop encoding. Resolves only after the final chunk has been sent and
    /// every [`ChunkSender`] held by the session has been dropped. An error
    /// means the encoder did not finish cleanly; chunks already sent stay valid.
    fn stop(self) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Idle,
    Recording,
    Finalizing,
}

/// Finalized recording, held in memory until it is saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingBlob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl RecordingBlob {
    pub fn from_chunks(chunks: &[Vec<u8>], mime_type: &str) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(chunk);
        }
        Self {
            bytes,
            mime_type: mime_type.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn lock_chunks(chunks: &Mutex<Vec<Vec<u8>>>) -> MutexGuard<'_, Vec<Vec<u8>>> {
    chunks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Recorder<E: Encoder> {
    encoder: E,
    state: RecorderState,
    // Mutex keeps the recorder Sync without requiring it of sessions.
    session: Mutex<Option<E::Session>>,
    collector: Option<JoinHandle<()>>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    stream: Option<CombinedStream>,
    encoder_error: Option<CaptureError>,
}

impl<E: Encoder> Recorder<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            state: RecorderState::Idle,
            session: Mutex::new(None),
            collector: None,
            chunks: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            encoder_error: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn chunk_count(&self) -> usize {
        lock_chunks(&self.chunks).len()
    }

    pub fn stream(&self) -> Option<&CombinedStream> {
        self.stream.as_ref()
    }

    /// Idle → Recording. On failure the recorder stays Idle.
    pub async fn start(&mut self, stream: Option<CombinedStream>) -> Result<()> {
        if self.state != RecorderState::Idle {
            return Err(CaptureError::InvalidState(format!(
                "cannot start while {:?}",
                self.state
            )));
        }

        let stream = stream
            .filter(|s| !s.is_empty())
            .ok_or(CaptureError::NoStreamAvailable)?;

        lock_chunks(&self.chunks).clear();
        self.encoder_error = None;

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let session = self.encoder.open(&stream, tx).await.map_err(|e| match e {
            CaptureError::EncoderConstructionFailure(_) => e,
            other => CaptureError::EncoderConstructionFailure(other.to_string()),
        })?;

        let chunks = Arc::clone(&self.chunks);
        self.collector = Some(tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                if chunk.is_empty() {
                    continue;
                }
                lock_chunks(&chunks).push(chunk);
            }
        }));

        info!(
            "▶️  Recording started ({} video, {} audio)",
            stream.video_track_count(),
            stream.audio_track_count()
        );
        *self.session.get_mut().unwrap_or_else(|p| p.into_inner()) = Some(session);
        self.stream = Some(stream);
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Recording → Finalizing. Waits for the encoder flush, then builds the blob.
    pub async fn stop(&mut self) -> Result<RecordingBlob> {
        if self.state != RecorderState::Recording {
            return Err(CaptureError::InvalidState(format!(
                "cannot stop while {:?}",
                self.state
            )));
        }
        self.state = RecorderState::Finalizing;

        self.encoder_error = self.drain().await;

        let chunks = lock_chunks(&self.chunks);
        let blob = RecordingBlob::from_chunks(&chunks, self.encoder.mime_type());
        info!("⏹️  Recording stopped: {} chunks, {} bytes", chunks.len(), blob.len());
        Ok(blob)
    }

    async fn drain(&mut self) -> Option<CaptureError> {
        let session = self.session.get_mut().unwrap_or_else(|p| p.into_inner()).take();
        let mut failure = None;
        if let Some(session) = session {
            if let Err(e) = session.stop().await {
                warn!("⚠️  Encoder did not stop cleanly: {}", e);
                failure = Some(e);
            }
        }
        if let Some(collector) = self.collector.take() {
            if let Err(e) = collector.await {
                warn!("⚠️  Chunk collector failed: {}", e);
            }
        }
        failure
    }

    /// Error the encoder reported while the last recording was stopped.
    pub fn take_encoder_error(&mut self) -> Option<CaptureError> {
        self.encoder_error.take()
    }

    /// Finalizing → Idle. Clears the chunk list and stops every track the
    /// recorded stream held. Returns how many tracks were still live.
    pub fn finish(&mut self) -> usize {
        lock_chunks(&self.chunks).clear();
        let stopped = self.stream.take().map(|s| s.stop_all()).unwrap_or(0);
        self.state = RecorderState::Idle;
        debug!("Recorder idle, {} tracks released", stopped);
        stopped
    }

    /// Drop an in-progress recording without producing a blob.
    pub async fn abort(&mut self) {
        if self.state == RecorderState::Idle {
            return;
        }
        if let Some(e) = self.drain().await {
            debug!("Aborted encoder: {}", e);
        }
        self.finish();
    }
}
