//! Camera planning state machine.
//!
//! ```text
//! Scanning ──(window full / cut / end)──► Tracking ──(end)──► Done
//!                                          ▲    │
//!                                          │    ▼ cut
//!                                         CutReset
//! ```
//!
//! The planner consumes per-frame [`FrameSignals`] and appends one
//! [`CameraConfig`] per frame. It never sees pixels, so the whole camera
//! policy can be driven by recorded or synthetic signals.

use std::collections::BTreeMap;
use tracing::{debug, info};

use reframe_models::{CameraPath, VideoMetadata};

use crate::metrics;

use super::activity::ActivityTracker;
use super::config::AnalyzerConfig;
use super::models::FrameSignals;
use super::observation::bucket_width;
use super::selector::{SubjectSelector, SwitchEvent};
use super::smoother::CameraSmoother;

/// Planner phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Buffering the opening window to pick the first subject
    Scanning,
    /// Steady-state tracking
    Tracking,
    /// Clearing state at a scene cut
    CutReset,
    /// Input exhausted
    Done,
}

/// Movement accumulated by one bucket during the opening scan.
#[derive(Debug, Clone, Copy, Default)]
struct ScanStats {
    movement: f64,
    mouth: f64,
    sightings: u32,
    first_x: f64,
    last_x: f64,
}

/// Builds the camera path frame by frame.
pub struct CameraPlanner {
    config: AnalyzerConfig,
    center_x: f64,
    phase: Phase,
    scan_buffer: Vec<FrameSignals>,
    tracker: ActivityTracker,
    selector: SubjectSelector,
    smoother: CameraSmoother,
    path: CameraPath,
    switches: Vec<SwitchEvent>,
    scene_cuts: u64,
}

impl CameraPlanner {
    pub fn new(meta: VideoMetadata, config: AnalyzerConfig) -> Self {
        Self {
            center_x: meta.width as f64 / 2.0,
            phase: Phase::Scanning,
            scan_buffer: Vec::new(),
            tracker: ActivityTracker::new(&config),
            selector: SubjectSelector::new(config.policy, bucket_width(meta.width)),
            smoother: CameraSmoother::new(meta, &config),
            path: CameraPath::with_capacity(meta.frame_count.min(config.max_frames) as usize),
            switches: Vec::new(),
            scene_cuts: 0,
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Frames planned so far (buffered scan frames are not yet counted).
    pub fn planned(&self) -> usize {
        self.path.len()
    }

    /// Subject changes so far, including locks.
    pub fn switches(&self) -> &[SwitchEvent] {
        &self.switches
    }

    /// Scene cuts seen so far, including the first frame.
    pub fn scene_cuts(&self) -> u64 {
        self.scene_cuts
    }

    /// Consume the next frame's signals in presentation order.
    pub fn push(&mut self, signals: FrameSignals) {
        if signals.is_cut {
            self.scene_cuts += 1;
            metrics::record_scene_cut();
        }

        if self.phase == Phase::Scanning {
            if !(signals.is_cut && !self.scan_buffer.is_empty()) {
                self.scan_buffer.push(signals);
                if self.scan_buffer.len() as u64 >= self.config.scan_frames.max(1) {
                    self.flush_scan();
                }
                return;
            }
            // A new shot ends the opening window early.
            self.flush_scan();
        }

        match self.phase {
            Phase::Tracking | Phase::CutReset => {
                if signals.is_cut {
                    self.phase = Phase::CutReset;
                    info!(frame = signals.frame, "Scene cut, resetting camera state");
                    self.tracker.clear();
                    self.selector.reset();
                }
                self.track(&signals);
                self.phase = Phase::Tracking;
            }
            Phase::Scanning | Phase::Done => {
                debug!(frame = signals.frame, "Frame after planner finished, ignored");
            }
        }
    }

    /// Flush any buffered frames and return the finished path.
    pub fn finish(mut self) -> (CameraPath, Vec<SwitchEvent>) {
        if self.phase == Phase::Scanning {
            self.flush_scan();
        }
        self.phase = Phase::Done;
        (self.path, self.switches)
    }

    fn track(&mut self, signals: &FrameSignals) {
        if let Some(observations) = &signals.observations {
            let faces = self.tracker.update(signals.frame, observations);
            if let Some(event) = self.selector.step(signals.frame, &faces, &self.tracker) {
                metrics::record_subject_switch(event.reason.as_str());
                self.switches.push(event);
            }
        }

        let target = self.selector.target(self.center_x);
        let config = self.smoother.update(&target, signals.is_cut);
        self.path.push(config);
        self.selector.advance();
    }

    /// Lock onto the most active bucket of the opening window, then replay
    /// the window through normal tracking.
    fn flush_scan(&mut self) {
        let buffer = std::mem::take(&mut self.scan_buffer);
        self.tracker.clear();
        self.selector.reset();

        match initial_lock(&buffer) {
            Some((bucket, x)) => {
                info!(
                    bucket,
                    x,
                    frames = buffer.len(),
                    "Initial lock on most active bucket"
                );
                self.selector.seed(bucket, x);
            }
            None => debug!(frames = buffer.len(), "No faces in opening window"),
        }

        self.phase = Phase::Tracking;
        for signals in &buffer {
            self.track(signals);
        }
    }
}

/// Bucket with the most positional movement over the window, and where it
/// was first seen. Ties fall to mouth activity, then sightings, then the
/// lower bucket id.
fn initial_lock(buffer: &[FrameSignals]) -> Option<(u32, f64)> {
    let mut stats: BTreeMap<u32, ScanStats> = BTreeMap::new();

    for obs in buffer
        .iter()
        .filter_map(|s| s.observations.as_ref())
        .flatten()
    {
        let entry = stats.entry(obs.bucket).or_insert(ScanStats {
            first_x: obs.x,
            last_x: obs.x,
            ..Default::default()
        });
        entry.movement += (obs.x - entry.last_x).abs();
        entry.mouth += obs.mouth_open;
        entry.sightings += 1;
        entry.last_x = obs.x;
    }

    // BTreeMap iterates in ascending id; strict comparisons keep the lowest id on ties.
    let mut best: Option<(u32, ScanStats)> = None;
    for (bucket, s) in stats {
        let better = match &best {
            None => true,
            Some((_, b)) => {
                (s.movement, s.mouth, s.sightings)
                    .partial_cmp(&(b.movement, b.mouth, b.sightings))
                    == Some(std::cmp::Ordering::Greater)
            }
        };
        if better {
            best = Some((bucket, s));
        }
    }

    best.map(|(bucket, s)| (bucket, s.first_x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reframe::models::FaceObservation;
    use reframe_models::ReframeSettings;

    fn planner(frames: u64) -> CameraPlanner {
        let meta = VideoMetadata::new(1920, 1080, 30.0, frames);
        CameraPlanner::new(meta, AnalyzerConfig::new(ReframeSettings::default(), 30.0))
    }

    fn face(frame: u64, x: f64, mouth: f64) -> FaceObservation {
        FaceObservation {
            frame,
            x,
            y: 500.0,
            area: 40_000.0,
            confidence: 0.9,
            mouth_open: mouth,
            bucket: ((x / 192.0) as u32).min(9),
        }
    }

    #[test]
    fn test_initial_lock_prefers_movement_over_size() {
        let buffer = vec![
            FrameSignals::sampled(0, true, vec![face(0, 960.0, 0.0), face(0, 300.0, 0.0)]),
            FrameSignals::sampled(3, false, vec![face(3, 960.0, 0.0), face(3, 320.0, 0.0)]),
            FrameSignals::sampled(6, false, vec![face(6, 960.0, 0.0), face(6, 300.0, 0.0)]),
        ];
        assert_eq!(initial_lock(&buffer), Some((1, 300.0)));
    }

    #[test]
    fn test_initial_lock_ties_fall_to_lowest_bucket() {
        let buffer = vec![FrameSignals::sampled(
            0,
            true,
            vec![face(0, 1500.0, 0.0), face(0, 500.0, 0.0)],
        )];
        assert_eq!(initial_lock(&buffer), Some((2, 500.0)));
        assert_eq!(initial_lock(&[FrameSignals::unsampled(0, true)]), None);
    }

    #[test]
    fn test_scan_window_is_replayed() {
        let mut p = planner(60);
        for frame in 0..29 {
            p.push(FrameSignals::sampled(frame, frame == 0, vec![face(frame, 540.0, 0.0)]));
        }
        assert_eq!(p.phase(), Phase::Scanning);
        assert_eq!(p.planned(), 0);

        p.push(FrameSignals::sampled(29, false, vec![face(29, 540.0, 0.0)]));
        assert_eq!(p.phase(), Phase::Tracking);
        assert_eq!(p.planned(), 30);

        let (path, switches) = p.finish();
        assert!(switches.is_empty());
        assert!(path.iter().all(|c| c.crop_x == 236));
    }

    #[test]
    fn test_cut_during_scan_flushes_first() {
        let mut p = planner(20);
        for frame in 0..5 {
            p.push(FrameSignals::unsampled(frame, frame == 0));
        }
        p.push(FrameSignals::sampled(5, true, vec![face(5, 1700.0, 0.0)]));
        assert_eq!(p.phase(), Phase::Tracking);
        assert_eq!(p.planned(), 6);
        assert_eq!(p.scene_cuts(), 2);

        let (path, switches) = p.finish();
        assert_eq!(path.len(), 6);
        assert_eq!(switches.len(), 1);
        assert!(switches[0].reason.is_lock());
        assert!(path.get(5).map(|c| c.is_scene_cut).unwrap_or(false));
    }

    #[test]
    fn test_finish_flushes_short_clip() {
        let mut p = planner(3);
        for frame in 0..3 {
            p.push(FrameSignals::unsampled(frame, frame == 0));
        }
        let (path, _) = p.finish();
        assert_eq!(path.len(), 3);
        assert!(path.iter().all(|c| c.crop_x == 656 && c.zoom == 1.0));
    }
}
