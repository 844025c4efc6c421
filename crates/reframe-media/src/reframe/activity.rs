//! Per-bucket activity tracking.
//!
//! Turns noisy per-frame mouth and movement measurements into a stable
//! "who is active" signal. Each horizontal bucket keeps a decayed score and a
//! sustained-activity counter that builds slowly while the bucket stays
//! active and drains twice as fast when it goes quiet.

use std::collections::BTreeMap;

use super::config::{AnalyzerConfig, ACTIVE_THRESHOLD};
use super::models::FaceObservation;

/// Activity state for one horizontal bucket.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActivityBucket {
    /// Decayed activity score
    pub score: f64,
    /// Last frame this bucket was observed on
    pub last_seen: u64,
    /// Last observed horizontal position
    pub last_x: f64,
    /// Video frames of sustained activity
    pub sustained_frames: u64,
}

/// An observation together with the activity signals derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceActivity {
    pub observation: FaceObservation,
    /// Clamped displacement since the bucket's previous sighting
    pub movement: f64,
    /// Mouth opening plus movement bonus
    pub combined: f64,
}

/// Owns all bucket state for one analysis run.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    buckets: BTreeMap<u32, ActivityBucket>,
    retain: f64,
    max_movement: f64,
    stale_frames: u64,
    stale_decay: f64,
    /// Video frames represented by one detection tick
    step: u64,
}

impl ActivityTracker {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            buckets: BTreeMap::new(),
            retain: config.activity_retain,
            max_movement: config.max_movement_bonus,
            stale_frames: config.stale_frames,
            stale_decay: config.stale_decay,
            step: config.detect_interval.max(1),
        }
    }

    /// Fold one sampled frame's observations into the bucket state.
    ///
    /// Returns the per-face activity signals in observation order.
    pub fn update(&mut self, frame: u64, observations: &[FaceObservation]) -> Vec<FaceActivity> {
        let mut signals = Vec::with_capacity(observations.len());

        for obs in observations {
            let movement = match self.buckets.get(&obs.bucket) {
                Some(bucket) => (obs.x - bucket.last_x).abs().min(self.max_movement),
                None => 0.0,
            };
            let combined = obs.mouth_open + movement;

            let bucket = self.buckets.entry(obs.bucket).or_default();
            bucket.score = self.retain * bucket.score + (1.0 - self.retain) * combined;
            bucket.last_seen = frame;
            bucket.last_x = obs.x;
            bucket.sustained_frames = if combined > ACTIVE_THRESHOLD {
                bucket.sustained_frames + self.step
            } else {
                bucket.sustained_frames.saturating_sub(2 * self.step)
            };

            signals.push(FaceActivity {
                observation: *obs,
                movement,
                combined,
            });
        }

        for bucket in self.buckets.values_mut() {
            if frame.saturating_sub(bucket.last_seen) > self.stale_frames {
                bucket.score *= self.stale_decay;
                bucket.sustained_frames = bucket.sustained_frames.saturating_sub(2 * self.step);
            }
        }

        signals
    }

    /// Decayed score of a bucket (0 for unknown buckets).
    pub fn activity(&self, bucket: u32) -> f64 {
        self.buckets.get(&bucket).map(|b| b.score).unwrap_or(0.0)
    }

    /// Sustained-active frames of a bucket (0 for unknown buckets).
    pub fn sustained(&self, bucket: u32) -> u64 {
        self.buckets
            .get(&bucket)
            .map(|b| b.sustained_frames)
            .unwrap_or(0)
    }

    pub fn bucket(&self, bucket: u32) -> Option<&ActivityBucket> {
        self.buckets.get(&bucket)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Forget every bucket (scene cut).
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_models::ReframeSettings;

    fn tracker() -> ActivityTracker {
        ActivityTracker::new(&AnalyzerConfig::new(ReframeSettings::default(), 30.0))
    }

    fn obs(frame: u64, x: f64, mouth: f64, bucket: u32) -> FaceObservation {
        FaceObservation {
            frame,
            x,
            y: 500.0,
            area: 40_000.0,
            confidence: 0.9,
            mouth_open: mouth,
            bucket,
        }
    }

    #[test]
    fn test_score_is_ema_of_combined_activity() {
        let mut t = tracker();
        t.update(0, &[obs(0, 540.0, 10.0, 2)]);
        assert!((t.activity(2) - 3.0).abs() < 1e-9);

        t.update(3, &[obs(3, 540.0, 10.0, 2)]);
        assert!((t.activity(2) - 5.1).abs() < 1e-9);
    }

    #[test]
    fn test_movement_bonus_is_clamped() {
        let mut t = tracker();
        t.update(0, &[obs(0, 400.0, 0.0, 2)]);
        let signals = t.update(3, &[obs(3, 500.0, 0.0, 2)]);
        assert_eq!(signals[0].movement, 10.0);
        assert_eq!(signals[0].combined, 10.0);
    }

    #[test]
    fn test_sustained_builds_slowly_and_drains_fast() {
        let mut t = tracker();
        for i in 0..4 {
            t.update(i * 3, &[obs(i * 3, 540.0, 5.0, 2)]);
        }
        assert_eq!(t.sustained(2), 12);

        t.update(12, &[obs(12, 540.0, 0.0, 2)]);
        assert_eq!(t.sustained(2), 6);
        t.update(15, &[obs(15, 540.0, 0.0, 2)]);
        t.update(18, &[obs(18, 540.0, 0.0, 2)]);
        assert_eq!(t.sustained(2), 0);
    }

    #[test]
    fn test_stale_buckets_decay() {
        let mut t = tracker();
        t.update(0, &[obs(0, 540.0, 20.0, 2)]);
        let before = t.activity(2);

        // 1.5 s at 30 fps = 45 frames
        t.update(45, &[]);
        assert_eq!(t.activity(2), before);
        t.update(48, &[]);
        assert!((t.activity(2) - before * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut t = tracker();
        t.update(0, &[obs(0, 540.0, 20.0, 2), obs(0, 1700.0, 0.0, 8)]);
        assert_eq!(t.len(), 2);
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.activity(2), 0.0);
    }
}
