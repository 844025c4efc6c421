//! Observation extraction: detector output to per-frame face observations.

use image::RgbImage;
use tracing::{debug, warn};

use reframe_models::VideoMetadata;

use crate::error::MediaResult;
use crate::metrics;

use super::config::{AnalyzerConfig, MIN_DETECTION_CONFIDENCE, NUM_BUCKETS};
use super::detector::LandmarkDetector;
use super::models::{FaceBox, FaceObservation, FrameSignals, MeshLandmarks};

/// Samples the detector at a fixed cadence and normalizes its output.
#[derive(Debug, Clone)]
pub struct ObservationExtractor {
    width: u32,
    height: u32,
    detect_interval: u64,
    bucket_width: f64,
}

impl ObservationExtractor {
    pub fn new(meta: &VideoMetadata, config: &AnalyzerConfig) -> Self {
        Self {
            width: meta.width,
            height: meta.height,
            detect_interval: config.detect_interval.max(1),
            bucket_width: bucket_width(meta.width),
        }
    }

    /// Detector runs on the fixed cadence and right after every cut.
    #[inline]
    pub fn should_sample(&self, frame_index: u64, is_cut: bool) -> bool {
        is_cut || frame_index % self.detect_interval == 0
    }

    /// Bucket id for a horizontal pixel position.
    #[inline]
    pub fn bucket_of(&self, x: f64) -> u32 {
        bucket_for(x, self.bucket_width)
    }

    pub fn bucket_width(&self) -> f64 {
        self.bucket_width
    }

    /// Sense one frame. Detector failures are logged and yield no observations.
    pub fn observe(
        &self,
        detector: &dyn LandmarkDetector,
        frame_index: u64,
        frame: &RgbImage,
        is_cut: bool,
    ) -> FrameSignals {
        if !self.should_sample(frame_index, is_cut) {
            return FrameSignals::unsampled(frame_index, is_cut);
        }

        match self.extract(detector, frame_index, frame) {
            Ok(observations) => FrameSignals::sampled(frame_index, is_cut, observations),
            Err(e) => {
                warn!(frame = frame_index, "Landmark detection failed: {}", e);
                metrics::record_detector_error();
                FrameSignals::unsampled(frame_index, is_cut)
            }
        }
    }

    /// Run both detector calls and fold their results together.
    pub fn extract(
        &self,
        detector: &dyn LandmarkDetector,
        frame_index: u64,
        frame: &RgbImage,
    ) -> MediaResult<Vec<FaceObservation>> {
        let faces = detector.detect_faces(frame_index, frame)?;
        if faces.is_empty() {
            return Ok(Vec::new());
        }
        let mesh = detector.detect_mesh(frame_index, frame)?;
        Ok(self.normalize(frame_index, &faces, &mesh))
    }

    /// Convert relative detector output to pixel observations.
    ///
    /// Each mesh is attached to at most one face: the nearest face in the
    /// same bucket or within one bucket width of the nose.
    pub fn normalize(
        &self,
        frame_index: u64,
        faces: &[FaceBox],
        mesh: &[MeshLandmarks],
    ) -> Vec<FaceObservation> {
        let width = self.width as f64;
        let height = self.height as f64;

        let mut observations: Vec<FaceObservation> = faces
            .iter()
            .filter(|f| f.confidence >= MIN_DETECTION_CONFIDENCE)
            .filter(|f| f.x_center.is_finite() && f.y_center.is_finite())
            .map(|f| {
                let x = (f.x_center * width).clamp(0.0, width);
                FaceObservation {
                    frame: frame_index,
                    x,
                    y: (f.y_center * height).clamp(0.0, height),
                    area: (f.width * width).abs() * (f.height * height).abs(),
                    confidence: f.confidence,
                    mouth_open: 0.0,
                    bucket: self.bucket_of(x),
                }
            })
            .collect();

        let mut taken = vec![false; observations.len()];
        for landmarks in mesh {
            if !landmarks.nose_x.is_finite() {
                continue;
            }
            let nose_x = (landmarks.nose_x * width).clamp(0.0, width);
            let nose_bucket = self.bucket_of(nose_x);

            let nearest = observations
                .iter()
                .enumerate()
                .filter(|(i, _)| !taken[*i])
                .map(|(i, obs)| (i, (obs.x - nose_x).abs(), obs.bucket))
                .filter(|(_, dist, bucket)| *bucket == nose_bucket || *dist <= self.bucket_width)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((i, _, _)) = nearest {
                taken[i] = true;
                observations[i].mouth_open = landmarks.mouth_opening(self.height);
            }
        }

        debug!(
            frame = frame_index,
            faces = observations.len(),
            meshes = mesh.len(),
            "Observations extracted"
        );
        observations
    }
}

/// Pixel width of one bucket for a source of the given width.
pub fn bucket_width(width: u32) -> f64 {
    (width / NUM_BUCKETS).max(1) as f64
}

/// Bucket id for `x`, always in `[0, NUM_BUCKETS)`.
pub fn bucket_for(x: f64, bucket_width: f64) -> u32 {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    ((x / bucket_width).floor() as u32).min(NUM_BUCKETS - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use reframe_models::ReframeSettings;

    fn extractor() -> ObservationExtractor {
        let meta = VideoMetadata::new(1920, 1080, 30.0, 300);
        let config = AnalyzerConfig::new(ReframeSettings::default(), 30.0);
        ObservationExtractor::new(&meta, &config)
    }

    struct FailingDetector;

    impl LandmarkDetector for FailingDetector {
        fn detect_faces(&self, _: u64, _: &RgbImage) -> MediaResult<Vec<FaceBox>> {
            Err(MediaError::detection_failed("boom"))
        }

        fn detect_mesh(&self, _: u64, _: &RgbImage) -> MediaResult<Vec<MeshLandmarks>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_bucket_ids_stay_in_range() {
        let ex = extractor();
        assert_eq!(ex.bucket_width(), 192.0);
        assert_eq!(ex.bucket_of(0.0), 0);
        assert_eq!(ex.bucket_of(540.0), 2);
        assert_eq!(ex.bucket_of(1919.9), 9);
        assert_eq!(ex.bucket_of(1920.0), 9);
        assert_eq!(ex.bucket_of(-5.0), 0);
        assert_eq!(ex.bucket_of(f64::NAN), 0);
    }

    #[test]
    fn test_sampling_cadence() {
        let ex = extractor();
        assert!(ex.should_sample(0, false));
        assert!(!ex.should_sample(1, false));
        assert!(ex.should_sample(3, false));
        assert!(ex.should_sample(4, true));
    }

    #[test]
    fn test_normalize_attaches_nearest_mesh() {
        let ex = extractor();
        let faces = [
            FaceBox::new(0.25, 0.5, 0.1, 0.2, 0.9),
            FaceBox::new(0.75, 0.5, 0.1, 0.2, 0.9),
        ];
        let mesh = [MeshLandmarks::new(0.76, 0.50, 0.52)];

        let obs = ex.normalize(7, &faces, &mesh);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].mouth_open, 0.0);
        assert!((obs[1].mouth_open - 21.6).abs() < 1e-6);
        assert_eq!(obs[1].bucket, 7);
        assert_eq!(obs[1].frame, 7);
    }

    #[test]
    fn test_normalize_drops_low_confidence_and_far_mesh() {
        let ex = extractor();
        let faces = [
            FaceBox::new(0.1, 0.5, 0.1, 0.2, 0.2),
            FaceBox::new(0.3, 0.5, 0.1, 0.2, 0.8),
        ];
        // Nose far from the only confident face
        let mesh = [MeshLandmarks::new(0.9, 0.5, 0.6)];

        let obs = ex.normalize(0, &faces, &mesh);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].mouth_open, 0.0);
    }

    #[test]
    fn test_detector_failure_yields_unsampled_frame() {
        let ex = extractor();
        let signals = ex.observe(&FailingDetector, 0, &RgbImage::new(4, 4), true);
        assert!(signals.is_cut);
        assert!(signals.observations.is_none());
    }
}
