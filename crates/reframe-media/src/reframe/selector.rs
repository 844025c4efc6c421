//! Subject selection with switch debouncing.
//!
//! The selector owns the camera's notion of *who* to follow. It only changes
//! subject when a candidate has been active long enough, clearly outranks
//! the current subject and the cooldown since the last change has elapsed.
//! Two-person dialogue gets a faster path at high sensitivity, and a subject
//! that disappears is replaced by the largest visible face.

use tracing::{debug, info};

use super::activity::{ActivityTracker, FaceActivity};
use super::config::{SwitchPolicy, ACTIVE_THRESHOLD};
use super::models::{FaceObservation, TrackTarget};

/// Why the tracked subject changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    /// First subject after the opening scan or a scene cut
    Lock,
    /// Candidate outranked the current subject
    Activity,
    /// Two-person dialogue fast path
    Dialogue,
    /// Current subject left the frame
    LostSubject,
}

impl SwitchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchReason::Lock => "lock",
            SwitchReason::Activity => "activity",
            SwitchReason::Dialogue => "dialogue",
            SwitchReason::LostSubject => "lost_subject",
        }
    }

    /// Locks establish a subject rather than replace one.
    pub fn is_lock(&self) -> bool {
        matches!(self, SwitchReason::Lock)
    }
}

/// A change of tracked subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchEvent {
    pub frame: u64,
    pub from: Option<u32>,
    pub to: u32,
    pub reason: SwitchReason,
}

/// Selector score of one face.
///
/// The size term shrinks as more faces compete, so the active speaker wins
/// over the closest face in group shots.
pub fn face_score(face: &FaceActivity, tracker: &ActivityTracker, face_count: usize) -> f64 {
    let size_divisor = match face_count {
        0 | 1 => 150_000.0,
        2 => 300_000.0,
        _ => 500_000.0,
    };
    tracker.activity(face.observation.bucket) * 1.5
        + face.observation.mouth_open * 2.5
        + face.movement
        + face.observation.area / size_divisor
}

/// Tracks the current subject and decides when to change it.
#[derive(Debug, Clone)]
pub struct SubjectSelector {
    policy: SwitchPolicy,
    bucket_width: f64,
    tracked_bucket: Option<u32>,
    tracked_x: Option<f64>,
    tracked_mouth: f64,
    frames_since_switch: u64,
    frames_since_seen: u64,
    /// A subject has been established since the last reset
    locked: bool,
}

impl SubjectSelector {
    pub fn new(policy: SwitchPolicy, bucket_width: f64) -> Self {
        Self {
            policy,
            bucket_width,
            tracked_bucket: None,
            tracked_x: None,
            tracked_mouth: 0.0,
            frames_since_switch: 0,
            frames_since_seen: 0,
            locked: false,
        }
    }

    /// Forget the current subject and restart all counters.
    pub fn reset(&mut self) {
        self.tracked_bucket = None;
        self.tracked_x = None;
        self.tracked_mouth = 0.0;
        self.frames_since_switch = 0;
        self.frames_since_seen = 0;
        self.locked = false;
    }

    /// Start tracking a subject chosen outside the selector (initial scan).
    pub fn seed(&mut self, bucket: u32, x: f64) {
        self.tracked_bucket = Some(bucket);
        self.tracked_x = Some(x);
        self.tracked_mouth = 0.0;
        self.frames_since_seen = 0;
        self.locked = true;
    }

    pub fn tracked_bucket(&self) -> Option<u32> {
        self.tracked_bucket
    }

    pub fn tracked_x(&self) -> Option<f64> {
        self.tracked_x
    }

    pub fn frames_since_switch(&self) -> u64 {
        self.frames_since_switch
    }

    pub fn frames_since_seen(&self) -> u64 {
        self.frames_since_seen
    }

    /// Where the camera should aim, falling back to `center_x`.
    pub fn target(&self, center_x: f64) -> TrackTarget {
        TrackTarget {
            bucket: self.tracked_bucket,
            x: self.tracked_x.unwrap_or(center_x),
            mouth_open: if self.tracked_x.is_some() {
                self.tracked_mouth
            } else {
                0.0
            },
        }
    }

    /// Advance the frame counters; call once at the end of every frame.
    pub fn advance(&mut self) {
        self.frames_since_switch = self.frames_since_switch.saturating_add(1);
        self.frames_since_seen = self.frames_since_seen.saturating_add(1);
    }

    #[inline]
    fn cooldown_elapsed(&self) -> bool {
        self.frames_since_switch >= self.policy.cooldown_frames
    }

    /// Consume one sampled frame's faces. Returns the subject change, if any.
    pub fn step(
        &mut self,
        frame: u64,
        faces: &[FaceActivity],
        tracker: &ActivityTracker,
    ) -> Option<SwitchEvent> {
        let Some(current_bucket) = self.tracked_bucket else {
            return self.acquire(frame, faces, tracker);
        };

        let tracked_idx = self.find_tracked(current_bucket, faces);

        let Some(tracked_idx) = tracked_idx else {
            self.tracked_mouth = 0.0;
            return self.handle_lost(frame, current_bucket, faces);
        };

        let tracked = faces[tracked_idx].observation;
        self.follow(&tracked);

        // Faces find_tracked would also accept belong to the current subject.
        let candidate = faces
            .iter()
            .enumerate()
            .filter(|(i, f)| *i != tracked_idx && !self.same_subject(&tracked, &f.observation))
            .map(|(_, f)| (f, face_score(f, tracker, faces.len())))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, _)| f.observation)?;

        let highest_activity = faces
            .iter()
            .map(|f| tracker.activity(f.observation.bucket))
            .fold(0.0, f64::max);

        let reason =
            self.switch_reason(&tracked, &candidate, faces.len(), highest_activity, tracker)?;
        Some(self.switch_to(frame, &candidate, reason))
    }

    #[inline]
    fn same_subject(&self, tracked: &FaceObservation, face: &FaceObservation) -> bool {
        face.bucket == tracked.bucket || (face.x - tracked.x).abs() <= self.bucket_width
    }

    /// Index of the face that continues the tracked subject, if visible.
    fn find_tracked(&self, bucket: u32, faces: &[FaceActivity]) -> Option<usize> {
        let tracked_x = self.tracked_x?;
        faces
            .iter()
            .enumerate()
            .map(|(i, f)| (i, f.observation, (f.observation.x - tracked_x).abs()))
            .filter(|(_, obs, dist)| obs.bucket == bucket || *dist <= self.bucket_width)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(i, _, _)| i)
    }

    /// Keep following the same subject; drifting into a neighbouring bucket
    /// is not a switch.
    fn follow(&mut self, face: &FaceObservation) {
        if self.tracked_bucket != Some(face.bucket) {
            debug!(
                frame = face.frame,
                from = ?self.tracked_bucket,
                to = face.bucket,
                "Tracked subject drifted to neighbouring bucket"
            );
        }
        self.tracked_bucket = Some(face.bucket);
        self.tracked_x = Some(face.x);
        self.tracked_mouth = face.mouth_open;
        self.frames_since_seen = 0;
    }

    fn switch_reason(
        &self,
        current: &FaceObservation,
        candidate: &FaceObservation,
        face_count: usize,
        highest_activity: f64,
        tracker: &ActivityTracker,
    ) -> Option<SwitchReason> {
        if !self.cooldown_elapsed() {
            return None;
        }

        let current_activity = tracker.activity(current.bucket);
        let candidate_activity = tracker.activity(candidate.bucket);

        if face_count == 2
            && self.policy.dialogue_enabled()
            && self.frames_since_switch >= self.policy.dialogue_stay_frames
            && candidate_activity >= ACTIVE_THRESHOLD
            && candidate_activity >= self.policy.dialogue_ratio * current_activity
        {
            return Some(SwitchReason::Dialogue);
        }

        let sustained = tracker.sustained(candidate.bucket) >= self.policy.sustained_frames_required;
        // Winning outright still requires being the most active face.
        let dominant = candidate_activity > self.policy.dominant_activity
            && candidate_activity > current_activity
            && candidate_activity >= highest_activity;
        let outranks = candidate_activity > current_activity + self.policy.switch_margin || dominant;

        (sustained && outranks).then_some(SwitchReason::Activity)
    }

    fn handle_lost(
        &mut self,
        frame: u64,
        current_bucket: u32,
        faces: &[FaceActivity],
    ) -> Option<SwitchEvent> {
        if self.frames_since_seen <= self.policy.lost_subject_frames {
            return None;
        }

        match largest(faces) {
            Some(face) if self.cooldown_elapsed() => {
                Some(self.switch_to(frame, &face, SwitchReason::LostSubject))
            }
            Some(_) => None,
            None => {
                info!(frame, bucket = current_bucket, "Subject lost, framing center");
                self.tracked_bucket = None;
                self.tracked_x = None;
                self.tracked_mouth = 0.0;
                None
            }
        }
    }

    /// Pick a subject while none is tracked.
    fn acquire(
        &mut self,
        frame: u64,
        faces: &[FaceActivity],
        tracker: &ActivityTracker,
    ) -> Option<SwitchEvent> {
        if !self.locked {
            let best = faces
                .iter()
                .map(|f| (f, face_score(f, tracker, faces.len())))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(f, _)| f.observation)?;
            self.locked = true;
            return Some(self.switch_to(frame, &best, SwitchReason::Lock));
        }

        // Subject was lost earlier; re-acquire like a lost-subject switch.
        if !self.cooldown_elapsed() {
            return None;
        }
        let face = largest(faces)?;
        Some(self.switch_to(frame, &face, SwitchReason::LostSubject))
    }

    fn switch_to(&mut self, frame: u64, face: &FaceObservation, reason: SwitchReason) -> SwitchEvent {
        let event = SwitchEvent {
            frame,
            from: self.tracked_bucket,
            to: face.bucket,
            reason,
        };

        info!(
            frame,
            from = ?event.from,
            to = event.to,
            x = face.x,
            reason = reason.as_str(),
            "Subject switch"
        );

        self.tracked_bucket = Some(face.bucket);
        self.tracked_x = Some(face.x);
        self.tracked_mouth = face.mouth_open;
        self.frames_since_switch = 0;
        self.frames_since_seen = 0;
        event
    }
}

fn largest(faces: &[FaceActivity]) -> Option<FaceObservation> {
    faces
        .iter()
        .map(|f| f.observation)
        .max_by(|a, b| a.area.total_cmp(&b.area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reframe::config::AnalyzerConfig;
    use reframe_models::ReframeSettings;

    fn config(sensitivity: u8) -> AnalyzerConfig {
        AnalyzerConfig::new(
            ReframeSettings {
                sensitivity,
                ..Default::default()
            },
            30.0,
        )
    }

    fn obs(frame: u64, x: f64, mouth: f64, area: f64) -> FaceObservation {
        FaceObservation {
            frame,
            x,
            y: 500.0,
            area,
            confidence: 0.9,
            mouth_open: mouth,
            bucket: ((x / 192.0) as u32).min(9),
        }
    }

    #[test]
    fn test_face_score_weights() {
        let cfg = config(5);
        let mut tracker = ActivityTracker::new(&cfg);
        let faces = tracker.update(0, &[obs(0, 540.0, 4.0, 150_000.0)]);

        // activity 1.2 * 1.5 + 4 * 2.5 + 0 + 1
        let score = face_score(&faces[0], &tracker, 1);
        assert!((score - 12.8).abs() < 1e-9);
        assert!(face_score(&faces[0], &tracker, 3) < score);
    }

    #[test]
    fn test_first_faces_lock_immediately() {
        let cfg = config(5);
        let mut tracker = ActivityTracker::new(&cfg);
        let mut selector = SubjectSelector::new(cfg.policy, 192.0);

        let faces = tracker.update(0, &[obs(0, 540.0, 0.0, 40_000.0), obs(0, 1700.0, 8.0, 40_000.0)]);
        let event = selector.step(0, &faces, &tracker).unwrap();

        assert_eq!(event.reason, SwitchReason::Lock);
        assert_eq!(event.to, 8);
        assert_eq!(selector.tracked_x(), Some(1700.0));
    }

    #[test]
    fn test_no_switch_before_cooldown() {
        let cfg = config(5);
        let mut tracker = ActivityTracker::new(&cfg);
        let mut selector = SubjectSelector::new(cfg.policy, 192.0);
        selector.seed(2, 540.0);

        let mut switch_frame = None;
        for frame in 0..200u64 {
            if frame % 3 == 0 {
                let faces = tracker.update(
                    frame,
                    &[obs(frame, 540.0, 0.0, 40_000.0), obs(frame, 1800.0, 12.0, 40_000.0)],
                );
                if let Some(event) = selector.step(frame, &faces, &tracker) {
                    switch_frame.get_or_insert(event.frame);
                }
            }
            selector.advance();
        }

        let switched = switch_frame.unwrap();
        assert!(switched >= cfg.policy.cooldown_frames);
        assert!(switched >= cfg.policy.sustained_frames_required - cfg.detect_interval);
        assert_eq!(selector.tracked_bucket(), Some(9));
    }

    #[test]
    fn test_switch_lands_on_first_sample_after_cooldown() {
        let cfg = config(5);
        let interval = cfg.detect_interval;
        let mut tracker = ActivityTracker::new(&cfg);
        let scene = |frame: u64| [obs(frame, 540.0, 0.0, 40_000.0), obs(frame, 1800.0, 12.0, 40_000.0)];

        // Bucket 9 is already sustained when the subject is seeded.
        let start = 120u64;
        for frame in (0..start).step_by(interval as usize) {
            tracker.update(frame, &scene(frame));
        }
        assert!(tracker.sustained(9) >= cfg.policy.sustained_frames_required);

        let mut selector = SubjectSelector::new(cfg.policy, 192.0);
        selector.seed(2, 540.0);

        let expected = start + cfg.policy.cooldown_frames.div_ceil(interval) * interval;
        let mut events = Vec::new();
        for frame in start..start + 120 {
            if (frame - start) % interval == 0 {
                let faces = tracker.update(frame, &scene(frame));
                if let Some(event) = selector.step(frame, &faces, &tracker) {
                    events.push(event);
                }
            }
            selector.advance();
        }

        assert_eq!(events.len(), 1, "events: {:?}", events);
        assert_eq!(events[0].frame, expected);
        assert_eq!(events[0].reason, SwitchReason::Activity);
        assert_eq!((events[0].from, events[0].to), (Some(2), 9));
    }

    #[test]
    fn test_quieter_talker_never_wins_outright() {
        let cfg = config(5);
        let mut tracker = ActivityTracker::new(&cfg);
        let mut selector = SubjectSelector::new(cfg.policy, 192.0);
        selector.seed(2, 480.0);

        for frame in (0..300u64).step_by(3) {
            let faces = tracker.update(
                frame,
                &[obs(frame, 480.0, 12.0, 40_000.0), obs(frame, 1800.0, 8.0, 40_000.0)],
            );
            assert!(selector.step(frame, &faces, &tracker).is_none(), "frame {}", frame);
            for _ in 0..3 {
                selector.advance();
            }
        }
        // Both are well past the outright threshold
        assert!(tracker.activity(9) > cfg.policy.dominant_activity);
        assert!(tracker.sustained(9) >= cfg.policy.sustained_frames_required);
        assert_eq!(selector.tracked_bucket(), Some(2));
    }

    #[test]
    fn test_face_in_tracked_bucket_is_not_a_candidate() {
        let cfg = config(5);
        let mut tracker = ActivityTracker::new(&cfg);
        let mut selector = SubjectSelector::new(cfg.policy, 192.0);
        selector.seed(2, 400.0);

        for frame in (0..300u64).step_by(3) {
            let faces = tracker.update(
                frame,
                &[obs(frame, 400.0, 10.0, 40_000.0), obs(frame, 560.0, 10.0, 90_000.0)],
            );
            assert!(selector.step(frame, &faces, &tracker).is_none(), "frame {}", frame);
            for _ in 0..3 {
                selector.advance();
            }
        }
        assert_eq!(selector.tracked_x(), Some(400.0));
    }

    #[test]
    fn test_adjacent_drift_is_not_a_switch() {
        let cfg = config(5);
        let mut tracker = ActivityTracker::new(&cfg);
        let mut selector = SubjectSelector::new(cfg.policy, 192.0);
        selector.seed(2, 570.0);

        let faces = tracker.update(0, &[obs(0, 580.0, 0.0, 40_000.0)]);
        assert!(selector.step(0, &faces, &tracker).is_none());
        assert_eq!(selector.tracked_bucket(), Some(3));
        assert_eq!(selector.tracked_x(), Some(580.0));
    }

    #[test]
    fn test_lost_subject_goes_center_then_largest() {
        let cfg = config(5);
        let mut tracker = ActivityTracker::new(&cfg);
        let mut selector = SubjectSelector::new(cfg.policy, 192.0);
        selector.seed(2, 540.0);

        for frame in 0..=cfg.policy.lost_subject_frames {
            selector.advance();
            let faces = tracker.update(frame, &[]);
            selector.step(frame, &faces, &tracker);
        }
        assert_eq!(selector.tracked_bucket(), None);
        assert_eq!(selector.target(960.0).x, 960.0);

        // Re-acquisition waits for the cooldown
        for _ in 0..cfg.policy.cooldown_frames {
            selector.advance();
        }
        let faces = tracker.update(
            100,
            &[obs(100, 300.0, 0.0, 10_000.0), obs(100, 1500.0, 0.0, 90_000.0)],
        );
        let event = selector.step(100, &faces, &tracker).unwrap();
        assert_eq!(event.reason, SwitchReason::LostSubject);
        assert_eq!(event.to, 7);
    }

    #[test]
    fn test_dialogue_fast_path() {
        let cfg = config(9);
        assert!(cfg.policy.dialogue_enabled());
        let mut tracker = ActivityTracker::new(&cfg);
        let mut selector = SubjectSelector::new(cfg.policy, 192.0);
        selector.seed(2, 540.0);

        for _ in 0..cfg.policy.dialogue_stay_frames {
            selector.advance();
        }

        // One strong sample: activity 3.6 on bucket 9 but not yet sustained
        let faces = tracker.update(
            90,
            &[obs(90, 540.0, 0.0, 40_000.0), obs(90, 1800.0, 12.0, 40_000.0)],
        );
        assert!(tracker.sustained(9) < cfg.policy.sustained_frames_required);
        let event = selector.step(90, &faces, &tracker).unwrap();
        assert_eq!(event.reason, SwitchReason::Dialogue);
    }

    #[test]
    fn test_reset_clears_subject() {
        let cfg = config(5);
        let mut selector = SubjectSelector::new(cfg.policy, 192.0);
        selector.seed(4, 900.0);
        selector.advance();
        selector.reset();

        assert_eq!(selector.tracked_bucket(), None);
        assert_eq!(selector.frames_since_switch(), 0);
        assert_eq!(selector.target(960.0).mouth_open, 0.0);
    }
}
