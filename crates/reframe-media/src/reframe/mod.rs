//! Portrait reframing with activity-driven subject tracking.
//!
//! Two passes connected only by a [`CameraPath`]:
//!
//! ```text
//! Video Input
//!     │
//!     ▼
//! ┌─────────────────────┐
//! │  Scene Cut Detector │ ← Thumbnail difference per frame
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │ Observation Extract │ ← Landmark detector at ~10 Hz
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │  Activity Tracker   │ ← Per-bucket decayed activity
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │  Subject Selector   │ ← Cooldown / sustained / margin
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │  Camera Smoother    │ ← Pan filter, zoom attack/decay
//! └──────────┬──────────┘
//!            ▼
//!       CameraPath ─────────► Renderer (pass 2) ─► Encode ─► Mux
//! ```

pub mod activity;
pub mod analyzer;
pub mod config;
pub mod detector;
pub mod models;
pub mod observation;
pub mod planner;
pub mod renderer;
pub mod scene_cut;
pub mod selector;
pub mod smoother;


pub use activity::{ActivityBucket, ActivityTracker, FaceActivity};
pub use analyzer::{CameraPathAnalyzer, PathAnalysis};
pub use config::{AnalyzerConfig, SwitchPolicy, NUM_BUCKETS};
pub use detector::{LandmarkDetector, NoopDetector, RecordedDetector, RecordedFrame};
pub use models::*;
pub use observation::ObservationExtractor;
pub use planner::{CameraPlanner, Phase};
pub use renderer::PathRenderer;
pub use scene_cut::{is_scene_cut, SceneCutDetector};
pub use selector::{SubjectSelector, SwitchEvent, SwitchReason};
pub use smoother::CameraSmoother;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{info, warn};

use reframe_models::{CameraPath, EncodingConfig, ReframeSettings, VideoMetadata};

use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::mux::{center_crop_reframe, mux_audio};
use crate::probe::probe_video;
use crate::sink::FfmpegFrameSink;
use crate::source::FfmpegFrameSource;

/// Options for one reframing job.
#[derive(Debug, Clone, Default)]
pub struct ReframeOptions {
    /// Analyzer knobs
    pub settings: ReframeSettings,
    /// Output encoding
    pub encoding: EncodingConfig,
    /// Cap on analyzed duration (defaults to 300 s)
    pub max_seconds: Option<f64>,
    /// Persist the camera path as JSON here
    pub path_out: Option<PathBuf>,
    /// Parent directory for temporary files
    pub work_dir: Option<PathBuf>,
}

/// Summary of a finished reframing job.
#[derive(Debug, Clone, PartialEq)]
pub struct ReframeReport {
    /// Frames in the output (analyzed frames when degraded)
    pub frames: u64,
    /// Scene cuts seen by the analyzer
    pub scene_cuts: u64,
    /// Subject switches, initial locks excluded
    pub switches: usize,
    /// Output fell back to a static center crop
    pub degraded: bool,
    pub target_width: u32,
    pub target_height: u32,
}

/// Reframe a landscape video into a tracked 9:16 portrait video.
///
/// Pass 1 failures (no frames) fail the job. Any pass 2 or mux failure falls
/// back to a static center crop and marks the report as degraded; only a
/// failing fallback is returned as an error. Temporary files live in a
/// [`TempDir`] removed on every path.
pub async fn reframe_to_portrait(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ReframeOptions,
    detector: Arc<dyn LandmarkDetector>,
) -> MediaResult<ReframeReport> {
    let input = input.as_ref().to_path_buf();
    let output = output.as_ref();
    options.settings.validate()?;

    let info = probe_video(&input).await?;
    let meta = info.metadata();
    info!(
        "Video: {}x{} @ {:.2}fps, {} frames, portrait {}x{}",
        meta.width, meta.height, meta.fps, meta.frame_count, meta.target_width, meta.target_height
    );

    let mut config = AnalyzerConfig::new(options.settings, meta.fps);
    if let Some(secs) = options.max_seconds {
        config = config.with_max_seconds(secs);
    }

    let analysis = {
        let input = input.clone();
        tokio::task::spawn_blocking(move || {
            let mut source = FfmpegFrameSource::open(&input, meta)?;
            CameraPathAnalyzer::new(config).analyze(&mut source, detector.as_ref())
        })
        .await
        .map_err(|e| MediaError::internal(format!("Analysis task failed: {}", e)))??
    };

    if let Some(path_out) = &options.path_out {
        match analysis.path.save(path_out) {
            Ok(()) => info!("Camera path saved to {}", path_out.display()),
            Err(e) => warn!("Failed to save camera path to {}: {}", path_out.display(), e),
        }
    }

    let analyzed = analysis.path.len() as u64;
    let scene_cuts = analysis.scene_cuts;
    let switches = analysis.switch_count();

    let work_dir = create_work_dir(options.work_dir.as_deref())?;
    let rendered = render_tracked(
        &input,
        output,
        work_dir.path(),
        meta,
        analysis.path,
        &options.encoding,
    )
    .await;

    let (frames, degraded) = match rendered {
        Ok(frames) => (frames, false),
        Err(e) => {
            warn!("Tracked render failed, falling back to center crop: {}", e);
            metrics::record_render_fallback();

            let started = Instant::now();
            if let Err(fallback_err) =
                center_crop_reframe(&input, output, &meta, &options.encoding).await
            {
                if output.exists() {
                    let _ = tokio::fs::remove_file(output).await;
                }
                return Err(fallback_err);
            }
            metrics::record_pass_duration("fallback", started.elapsed().as_secs_f64());
            (analyzed, true)
        }
    };

    Ok(ReframeReport {
        frames,
        scene_cuts,
        switches,
        degraded,
        target_width: meta.target_width,
        target_height: meta.target_height,
    })
}

fn create_work_dir(parent: Option<&Path>) -> MediaResult<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("reframe-");
    let dir = match parent {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            builder.tempdir_in(parent)?
        }
        None => builder.tempdir()?,
    };
    Ok(dir)
}

/// Pass 2 into a video-only temp file, then mux the original audio.
async fn render_tracked(
    input: &Path,
    output: &Path,
    work_dir: &Path,
    meta: VideoMetadata,
    path: CameraPath,
    encoding: &EncodingConfig,
) -> MediaResult<u64> {
    let video_only = work_dir.join("video_only.mp4");

    let frames = {
        let input = input.to_path_buf();
        let video_only = video_only.clone();
        let encoding = encoding.clone();
        tokio::task::spawn_blocking(move || {
            let mut source = FfmpegFrameSource::open(&input, meta)?;
            let mut sink = FfmpegFrameSink::create(
                &video_only,
                meta.target_width,
                meta.target_height,
                meta.fps,
                &encoding,
            )?;
            PathRenderer::new(meta).render(&mut source, &path, &mut sink)
        })
        .await
        .map_err(|e| MediaError::internal(format!("Render task failed: {}", e)))??
    };

    let started = Instant::now();
    mux_audio(&video_only, input, output, encoding).await?;
    metrics::record_pass_duration("mux", started.elapsed().as_secs_f64());

    Ok(frames)
}
