//! Metrics emitted by the reframing pipeline.
//!
//! Recording goes through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_ANALYZED_TOTAL: &str = "reframe_frames_analyzed_total";
    pub const SCENE_CUTS_TOTAL: &str = "reframe_scene_cuts_total";
    pub const SUBJECT_SWITCHES_TOTAL: &str = "reframe_subject_switches_total";
    pub const DETECTOR_ERRORS_TOTAL: &str = "reframe_detector_errors_total";
    pub const RENDER_FALLBACKS_TOTAL: &str = "reframe_render_fallbacks_total";
    pub const JOBS_TOTAL: &str = "reframe_jobs_total";
    pub const PASS_DURATION_SECONDS: &str = "reframe_pass_duration_seconds";
}

/// Record frames consumed by the analyzer.
pub fn record_frames_analyzed(count: u64) {
    counter!(names::FRAMES_ANALYZED_TOTAL).increment(count);
}

/// Record a detected scene cut.
pub fn record_scene_cut() {
    counter!(names::SCENE_CUTS_TOTAL).increment(1);
}

/// Record a change of tracked subject.
pub fn record_subject_switch(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::SUBJECT_SWITCHES_TOTAL, &labels).increment(1);
}

/// Record a swallowed landmark detector failure.
pub fn record_detector_error() {
    counter!(names::DETECTOR_ERRORS_TOTAL).increment(1);
}

/// Record a fall back to the static center crop.
pub fn record_render_fallback() {
    counter!(names::RENDER_FALLBACKS_TOTAL).increment(1);
}

/// Record a finished job.
pub fn record_job(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::JOBS_TOTAL, &labels).increment(1);
}

/// Record the wall time of one pass ("analyze", "render", "mux", "fallback").
pub fn record_pass_duration(pass: &str, duration_secs: f64) {
    let labels = [("pass", pass.to_string())];
    histogram!(names::PASS_DURATION_SECONDS, &labels).record(duration_secs);
}
