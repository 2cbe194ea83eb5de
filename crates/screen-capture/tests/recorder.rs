mod common;

use common::FakeEncoder;
use screen_capture::{
    CaptureError, CombinedStream, InputSpec, MediaTrack, Recorder, RecorderState,
    CONTAINER_MIME_TYPE,
};

fn stream() -> CombinedStream {
    CombinedStream {
        video: Some(MediaTrack::video("Display 1", InputSpec::new("lavfi", "testsrc"))),
        audio: None,
        graph: None,
    }
}

#[tokio::test]
async fn test_stop_collects_flush_and_drops_empty_chunks() {
    let mut recorder = Recorder::new(FakeEncoder::producing(&["a", "", "b"], "c"));
    recorder.start(Some(stream())).await.unwrap();

    let blob = recorder.stop().await.unwrap();
    assert_eq!(blob.bytes, b"abc");
    assert_eq!(blob.mime_type, CONTAINER_MIME_TYPE);
    assert_eq!(recorder.state(), RecorderState::Finalizing);
    assert_eq!(recorder.chunk_count(), 3);

    let released = recorder.finish();
    assert_eq!(released, 1);
    assert_eq!(recorder.chunk_count(), 0);
    assert_eq!(recorder.state(), RecorderState::Idle);
}

#[tokio::test]
async fn test_start_requires_a_stream() {
    let mut recorder = Recorder::new(FakeEncoder::default());
    assert!(matches!(recorder.start(None).await, Err(CaptureError::NoStreamAvailable)));
    assert!(matches!(
        recorder.start(Some(CombinedStream::default())).await,
        Err(CaptureError::NoStreamAvailable)
    ));
    assert_eq!(recorder.state(), RecorderState::Idle);
}

#[tokio::test]
async fn test_double_start_and_idle_stop_are_rejected() {
    let mut recorder = Recorder::new(FakeEncoder::default());
    assert!(matches!(recorder.stop().await, Err(CaptureError::InvalidState(_))));

    recorder.start(Some(stream())).await.unwrap();
    assert!(matches!(
        recorder.start(Some(stream())).await,
        Err(CaptureError::InvalidState(_))
    ));
    assert_eq!(recorder.encoder().state.stopped.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_abort_releases_tracks_without_blob() {
    let s = stream();
    let video = s.video.clone().unwrap();
    let encoder = FakeEncoder::producing(&["a"], "b");
    let mut recorder = Recorder::new(encoder.clone());
    recorder.start(Some(s)).await.unwrap();

    recorder.abort().await;

    assert_eq!(recorder.state(), RecorderState::Idle);
    assert_eq!(recorder.chunk_count(), 0);
    assert!(!video.is_live());
    assert_eq!(encoder.state.stopped.load(std::sync::atomic::Ordering::SeqCst), 1);
}
