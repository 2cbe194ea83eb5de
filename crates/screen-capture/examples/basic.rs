// Basic screen recording example
//
// Records 5 seconds of the first screen, with microphone, to recording.webm

use screen_capture::ffmpeg::{FfmpegEncoder, FfmpegHost};
use screen_capture::{
    compose_recording_stream, CaptureHost, ComposeOptions, Recorder, RecordingConfig,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> screen_capture::Result<()> {
    println!("🎬 Starting screen recording...");

    let config = RecordingConfig {
        fps: 30,
        capture_cursor: true,
        ..Default::default()
    };
    let host = FfmpegHost::new(&config);

    let sources = host.list_sources().await?;
    for source in &sources {
        println!("   {} - {}", source.id, source.name);
    }
    let source = sources
        .first()
        .ok_or_else(|| screen_capture::CaptureError::SourceNotFound("screen:0".into()))?;

    let feed = host.acquire_video(source).await?;
    let options = ComposeOptions {
        microphone: true,
        ..Default::default()
    };
    let composition = compose_recording_stream(&host, &feed, &options).await;
    for failure in &composition.failures {
        println!("⚠️  {}", failure);
    }

    let mut recorder = Recorder::new(FfmpegEncoder::new(&config));
    recorder.start(Some(composition.stream)).await?;
    println!("▶️  Recording {}... (5 seconds)", source.name);

    tokio::time::sleep(Duration::from_secs(5)).await;

    let blob = recorder.stop().await?;
    tokio::fs::write("recording.webm", &blob.bytes).await?;
    recorder.finish();
    println!("✅ Recording saved to recording.webm ({} bytes)", blob.len());

    Ok(())
}
