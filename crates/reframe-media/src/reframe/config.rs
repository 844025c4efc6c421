//! Analyzer configuration derived from user settings and the frame rate.
//!
//! Every hysteresis constant the selector uses lives in [`SwitchPolicy`], so
//! the debounce behaviour can be inspected without running the analyzer.

use reframe_models::ReframeSettings;

/// Horizontal buckets used as a subject identity proxy.
pub const NUM_BUCKETS: u32 = 10;

/// Detector results below this confidence are discarded.
pub const MIN_DETECTION_CONFIDENCE: f64 = 0.3;

/// Combined activity above which a bucket counts as active.
pub const ACTIVE_THRESHOLD: f64 = 2.0;

/// Frame rate assumed when the stream reports an unusable one.
const FALLBACK_FPS: f64 = 30.0;

/// Default cap on analyzed duration.
pub const DEFAULT_MAX_SECONDS: f64 = 300.0;

/// Subject switching thresholds, in video frames where applicable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchPolicy {
    /// Sensitivity these thresholds were derived from (1-10)
    pub sensitivity: u8,
    /// Minimum frames between two subject switches
    pub cooldown_frames: u64,
    /// Sustained-active frames a candidate needs before it may take over
    pub sustained_frames_required: u64,
    /// Activity lead a candidate needs over the current subject
    pub switch_margin: f64,
    /// Activity at which a candidate wins regardless of the current subject
    pub dominant_activity: f64,
    /// Lowest sensitivity that enables the two-person dialogue fast path
    pub dialogue_min_sensitivity: u8,
    /// Minimum stay on a subject before a dialogue switch
    pub dialogue_stay_frames: u64,
    /// Candidate/current activity ratio that triggers a dialogue switch
    pub dialogue_ratio: f64,
    /// Frames without a sighting after which the subject is considered gone
    pub lost_subject_frames: u64,
}

impl SwitchPolicy {
    const COOLDOWN_SECS_SLOW: f64 = 2.0;
    const COOLDOWN_SECS_FAST: f64 = 0.47;
    const SUSTAINED_SECS_SLOW: f64 = 3.0;
    const SUSTAINED_SECS_FAST: f64 = 0.48;

    /// Map a 1-10 sensitivity linearly onto cooldown and sustained windows.
    pub fn from_sensitivity(sensitivity: u8, fps: f64) -> Self {
        let sensitivity = sensitivity.clamp(1, 10);
        let t = f64::from(sensitivity - 1) / 9.0;

        let cooldown_secs =
            Self::COOLDOWN_SECS_SLOW - t * (Self::COOLDOWN_SECS_SLOW - Self::COOLDOWN_SECS_FAST);
        let sustained_secs = Self::SUSTAINED_SECS_SLOW
            - t * (Self::SUSTAINED_SECS_SLOW - Self::SUSTAINED_SECS_FAST);

        Self {
            sensitivity,
            cooldown_frames: secs_to_frames(cooldown_secs, fps),
            sustained_frames_required: secs_to_frames(sustained_secs, fps),
            switch_margin: 2.0,
            dominant_activity: 5.0,
            dialogue_min_sensitivity: 7,
            dialogue_stay_frames: secs_to_frames(2.5, fps),
            dialogue_ratio: 2.0,
            lost_subject_frames: 15,
        }
    }

    /// Whether the two-person dialogue fast path applies at this sensitivity.
    pub fn dialogue_enabled(&self) -> bool {
        self.sensitivity >= self.dialogue_min_sensitivity
    }
}

/// Full parameter set for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// User settings, coerced into range
    pub settings: ReframeSettings,
    /// Source frame rate
    pub fps: f64,
    /// Frames between detector calls (~10 Hz)
    pub detect_interval: u64,
    /// Length of the initial lock window
    pub scan_frames: u64,
    /// Buckets unseen for longer than this decay every detection tick
    pub stale_frames: u64,
    /// Multiplicative decay applied to stale buckets
    pub stale_decay: f64,
    /// Weight of the previous score in the activity EMA
    pub activity_retain: f64,
    /// Cap on per-observation movement bonus (pixels)
    pub max_movement_bonus: f64,
    /// Mean absolute gray difference that declares a scene cut
    pub cut_threshold: f64,
    /// `very_open` mouth threshold as a multiple of `zoom_threshold`
    pub very_open_ratio: f64,
    /// Per-frame zoom rate when zooming in
    pub zoom_attack: f64,
    /// Per-frame zoom rate when relaxing
    pub zoom_decay: f64,
    /// Hard cap on analyzed frames
    pub max_frames: u64,
    /// Frames between progress log lines
    pub progress_interval: u64,
    /// Switching thresholds
    pub policy: SwitchPolicy,
}

impl AnalyzerConfig {
    /// Derive the analyzer parameters for a stream at `fps`.
    pub fn new(settings: ReframeSettings, fps: f64) -> Self {
        let settings = settings.clamped();
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            FALLBACK_FPS
        };

        Self {
            settings,
            fps,
            detect_interval: ((fps / 10.0).round() as u64).max(1),
            scan_frames: secs_to_frames(1.0, fps),
            stale_frames: secs_to_frames(1.5, fps),
            stale_decay: 0.9,
            activity_retain: 0.7,
            max_movement_bonus: 10.0,
            cut_threshold: 30.0,
            very_open_ratio: 1.25,
            zoom_attack: 0.25,
            zoom_decay: 0.04,
            max_frames: secs_to_frames(DEFAULT_MAX_SECONDS, fps),
            progress_interval: 300,
            policy: SwitchPolicy::from_sensitivity(settings.sensitivity, fps),
        }
    }

    /// Cap the analyzed duration.
    pub fn with_max_seconds(mut self, secs: f64) -> Self {
        self.max_frames = secs_to_frames(secs.max(0.0), self.fps).max(1);
        self
    }

    /// Mouth opening (px) at which zoom begins.
    #[inline]
    pub fn zoom_open(&self) -> f64 {
        self.settings.zoom_threshold
    }

    /// Mouth opening (px) at which zoom reaches its maximum.
    #[inline]
    pub fn zoom_very_open(&self) -> f64 {
        self.settings.zoom_threshold * self.very_open_ratio
    }

    /// Maximum zoom factor.
    #[inline]
    pub fn max_zoom(&self) -> f64 {
        self.settings.zoom_level
    }
}

fn secs_to_frames(secs: f64, fps: f64) -> u64 {
    (secs * fps).round().max(0.0) as u64
}
