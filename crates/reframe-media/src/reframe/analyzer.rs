//! Pass 1: frames and detector output in, camera path out.

use std::time::Instant;
use tracing::{info, warn};

use reframe_models::CameraPath;

use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::source::FrameSource;

use super::config::AnalyzerConfig;
use super::detector::LandmarkDetector;
use super::observation::ObservationExtractor;
use super::planner::CameraPlanner;
use super::scene_cut::SceneCutDetector;
use super::selector::SwitchEvent;

/// Result of a completed analysis pass.
#[derive(Debug, Clone)]
pub struct PathAnalysis {
    pub path: CameraPath,
    /// Subject changes, locks included
    pub switches: Vec<SwitchEvent>,
    /// Scene cuts, the first frame included
    pub scene_cuts: u64,
}

impl PathAnalysis {
    /// Subject changes that replaced a tracked subject.
    pub fn switch_count(&self) -> usize {
        self.switches.iter().filter(|s| !s.reason.is_lock()).count()
    }
}

/// Drives scene cut detection, observation extraction and planning over a
/// whole clip.
pub struct CameraPathAnalyzer {
    config: AnalyzerConfig,
}

impl CameraPathAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze every frame the source yields, up to the frame cap.
    ///
    /// A source that ends early (or fails mid-stream) finalizes the path at
    /// the frames actually produced; no frames at all is an error.
    pub fn analyze(
        &self,
        source: &mut dyn FrameSource,
        detector: &dyn LandmarkDetector,
    ) -> MediaResult<PathAnalysis> {
        let started = Instant::now();
        let meta = *source.metadata();
        let extractor = ObservationExtractor::new(&meta, &self.config);
        let mut cuts = SceneCutDetector::new(self.config.cut_threshold);
        let mut planner = CameraPlanner::new(meta, self.config.clone());

        info!(
            width = meta.width,
            height = meta.height,
            fps = meta.fps,
            target_width = meta.target_width,
            target_height = meta.target_height,
            detect_interval = self.config.detect_interval,
            "Analyzing camera path"
        );

        let mut frames: u64 = 0;
        while frames < self.config.max_frames {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if frames > 0 => {
                    warn!(frame = frames, "Decode failed, finalizing path early: {}", e);
                    break;
                }
                Err(e) => return Err(e),
            };

            let is_cut = cuts.check_frame(frames, &frame);
            planner.push(extractor.observe(detector, frames, &frame, is_cut));
            frames += 1;

            if frames % self.config.progress_interval == 0 {
                info!(
                    frame = frames,
                    total = meta.frame_count,
                    switches = planner.switches().len(),
                    "Analysis progress"
                );
            }
        }

        if frames == 0 {
            return Err(MediaError::NoFramesProcessed);
        }
        if frames < meta.frame_count && frames < self.config.max_frames {
            warn!(
                analyzed = frames,
                expected = meta.frame_count,
                "Frame source ended early"
            );
        }
        if frames == self.config.max_frames && meta.frame_count > frames {
            warn!(
                analyzed = frames,
                total = meta.frame_count,
                "Analysis capped, remaining frames are not rendered"
            );
        }

        let scene_cuts = planner.scene_cuts();
        let (path, switches) = planner.finish();
        path.validate(&meta, self.config.max_zoom())?;

        metrics::record_frames_analyzed(frames);
        metrics::record_pass_duration("analyze", started.elapsed().as_secs_f64());

        let analysis = PathAnalysis {
            path,
            switches,
            scene_cuts,
        };
        info!(
            frames,
            scene_cuts,
            switches = analysis.switch_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Camera path complete"
        );
        Ok(analysis)
    }
}
