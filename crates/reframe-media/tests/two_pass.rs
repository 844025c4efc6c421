//! Both passes end to end over in-memory frames and recorded detector output.

use image::{Rgb, RgbImage};

use reframe_media::reframe::{
    AnalyzerConfig, CameraPathAnalyzer, FaceBox, MeshLandmarks, PathRenderer, RecordedDetector,
    RecordedFrame,
};
use reframe_media::{MediaError, MemoryFrameSource, MemorySink};
use reframe_models::{CameraPath, ReframeSettings, VideoMetadata};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;
const FPS: f64 = 30.0;
const FRAMES: u64 = 240;

/// Red channel carries the source column so rendered crops can be located.
fn frame() -> RgbImage {
    RgbImage::from_fn(WIDTH, HEIGHT, |x, _| Rgb([x as u8, 64, 64]))
}

fn source(meta: VideoMetadata, count: usize) -> MemoryFrameSource {
    MemoryFrameSource::repeat(meta, &frame(), count)
}

/// Left subject talks for two seconds, then the right subject takes over.
/// The detector fails outright on a handful of frames.
fn conversation() -> RecordedDetector {
    RecordedDetector::new((0..FRAMES).map(|frame| {
        if [30, 33, 150].contains(&frame) {
            return RecordedFrame {
                frame,
                error: Some("inference timeout".to_string()),
                ..Default::default()
            };
        }
        let (left_lip, right_lip) = if frame < 60 { (0.56, 0.50) } else { (0.50, 0.56) };
        RecordedFrame {
            frame,
            faces: vec![
                FaceBox::new(0.25, 0.45, 0.12, 0.25, 0.92),
                FaceBox::new(0.80, 0.45, 0.12, 0.25, 0.88),
                // Below the confidence floor
                FaceBox::new(0.50, 0.45, 0.12, 0.25, 0.1),
            ],
            mesh: vec![
                MeshLandmarks::new(0.25, 0.50, left_lip),
                MeshLandmarks::new(0.80, 0.50, right_lip),
            ],
            error: None,
        }
    }))
}

fn analyzer() -> CameraPathAnalyzer {
    CameraPathAnalyzer::new(AnalyzerConfig::new(ReframeSettings::default(), FPS))
}

#[test]
fn test_path_follows_conversation() {
    let meta = VideoMetadata::new(WIDTH, HEIGHT, FPS, FRAMES);
    let analysis = analyzer()
        .analyze(&mut source(meta, FRAMES as usize), &conversation())
        .unwrap();

    assert_eq!(analysis.path.len() as u64, FRAMES);
    assert_eq!(analysis.scene_cuts, 1);
    assert_eq!(analysis.switch_count(), 1);
    analysis.path.validate(&meta, 1.15).unwrap();

    let first = analysis.path.get(0).unwrap().crop_x;
    let last = analysis.path.get(FRAMES as usize - 1).unwrap().crop_x;
    assert_eq!(first, 29);
    assert!(last.abs_diff(205) <= 1, "final crop_x {}", last);
}

#[test]
fn test_path_survives_persistence_between_passes() {
    let meta = VideoMetadata::new(WIDTH, HEIGHT, FPS, FRAMES);
    let analysis = analyzer()
        .analyze(&mut source(meta, FRAMES as usize), &conversation())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path_file = dir.path().join("camera_path.json");
    analysis.path.save(&path_file).unwrap();
    let loaded = CameraPath::load(&path_file).unwrap();
    assert_eq!(loaded, analysis.path);

    let mut sink = MemorySink::new();
    let written = PathRenderer::new(meta)
        .render(&mut source(meta, FRAMES as usize), &loaded, &mut sink)
        .unwrap();

    assert_eq!(written, FRAMES);
    assert!(sink.finished);
    for (out, config) in sink.frames.iter().zip(loaded.iter()) {
        assert_eq!(out.dimensions(), (meta.target_width, meta.target_height));
        // Unzoomed frames are a straight crop: column 0 is the crop offset.
        if config.zoom == 1.0 {
            assert_eq!(out.get_pixel(0, 0)[0] as u32, config.crop_x);
        }
    }
}

#[test]
fn test_render_with_shorter_source_stops_early() {
    let meta = VideoMetadata::new(WIDTH, HEIGHT, FPS, FRAMES);
    let path = analyzer()
        .analyze(&mut source(meta, FRAMES as usize), &conversation())
        .unwrap()
        .path;

    let mut sink = MemorySink::new();
    let written = PathRenderer::new(meta)
        .render(&mut source(meta, 100), &path, &mut sink)
        .unwrap();
    assert_eq!(written, 100);
    assert_eq!(sink.frames.len(), 100);
}

#[test]
fn test_render_without_frames_is_an_error() {
    let meta = VideoMetadata::new(WIDTH, HEIGHT, FPS, 10);
    let path = CameraPath::from(vec![reframe_models::CameraConfig::centered(&meta); 10]);
    let mut sink = MemorySink::new();

    let result = PathRenderer::new(meta).render(&mut source(meta, 0), &path, &mut sink);
    assert!(matches!(result, Err(MediaError::NoFramesProcessed)));
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe on PATH"]
async fn test_reframe_generated_clip() {
    use reframe_media::{reframe_to_portrait, FfmpegCommand, FfmpegRunner, NoopDetector, ReframeOptions};
    use std::sync::Arc;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.mp4");
    let output = dir.path().join("portrait.mp4");

    let cmd = FfmpegCommand::new("testsrc=size=640x360:rate=30:duration=2", &input)
        .input_args(["-f", "lavfi"])
        .output_args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]);
    FfmpegRunner::new().run(&cmd).await.unwrap();

    let report = reframe_to_portrait(
        &input,
        &output,
        &ReframeOptions {
            path_out: Some(dir.path().join("path.json")),
            ..Default::default()
        },
        Arc::new(NoopDetector),
    )
    .await
    .unwrap();

    assert!(!report.degraded);
    assert_eq!(report.frames, 60);
    assert_eq!((report.target_width, report.target_height), (202, 360));
    assert!(output.exists());
    assert!(dir.path().join("path.json").exists());
}
