//! Landmark detector capability.
//!
//! The analyzer never runs inference itself. It asks a [`LandmarkDetector`]
//! for face boxes and mouth landmarks on sampled frames, which keeps the
//! selection and smoothing logic testable against recorded or synthetic
//! detector output.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::error::{MediaError, MediaResult};

use super::models::{FaceBox, MeshLandmarks};

/// Face and face-mesh detection on a single RGB frame.
///
/// Implementations must not depend on call order; results are in relative
/// [0,1] coordinates.
pub trait LandmarkDetector: Send + Sync {
    /// Face bounding boxes (robust at a distance).
    fn detect_faces(&self, frame_index: u64, frame: &RgbImage) -> MediaResult<Vec<FaceBox>>;

    /// Mouth landmarks (needed for mouth opening on close-ups).
    fn detect_mesh(&self, frame_index: u64, frame: &RgbImage) -> MediaResult<Vec<MeshLandmarks>>;
}

/// Detector that never finds a face.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDetector;

impl LandmarkDetector for NoopDetector {
    fn detect_faces(&self, _frame_index: u64, _frame: &RgbImage) -> MediaResult<Vec<FaceBox>> {
        Ok(Vec::new())
    }

    fn detect_mesh(
        &self,
        _frame_index: u64,
        _frame: &RgbImage,
    ) -> MediaResult<Vec<MeshLandmarks>> {
        Ok(Vec::new())
    }
}

/// Detector output captured for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub frame: u64,
    #[serde(default)]
    pub faces: Vec<FaceBox>,
    #[serde(default)]
    pub mesh: Vec<MeshLandmarks>,
    /// Replay this frame as a detector failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Replays detector output recorded per frame index.
///
/// Frames without a recording have no faces.
#[derive(Debug, Clone, Default)]
pub struct RecordedDetector {
    frames: BTreeMap<u64, RecordedFrame>,
}

impl RecordedDetector {
    pub fn new(entries: impl IntoIterator<Item = RecordedFrame>) -> Self {
        Self {
            frames: entries.into_iter().map(|e| (e.frame, e)).collect(),
        }
    }

    /// Load a JSON array of [`RecordedFrame`]s.
    pub fn from_file(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let entries: Vec<RecordedFrame> = serde_json::from_slice(&bytes)?;
        info!(
            "Loaded {} recorded detector frames from {}",
            entries.len(),
            path.display()
        );
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn lookup(&self, frame_index: u64) -> MediaResult<Option<&RecordedFrame>> {
        match self.frames.get(&frame_index) {
            Some(RecordedFrame {
                error: Some(message),
                ..
            }) => Err(MediaError::detection_failed(message.clone())),
            entry => Ok(entry),
        }
    }
}

impl LandmarkDetector for RecordedDetector {
    fn detect_faces(&self, frame_index: u64, _frame: &RgbImage) -> MediaResult<Vec<FaceBox>> {
        Ok(self
            .lookup(frame_index)?
            .map(|e| e.faces.clone())
            .unwrap_or_default())
    }

    fn detect_mesh(&self, frame_index: u64, _frame: &RgbImage) -> MediaResult<Vec<MeshLandmarks>> {
        Ok(self
            .lookup(frame_index)?
            .map(|e| e.mesh.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_detector_replays_by_index() {
        let detector = RecordedDetector::new(vec![RecordedFrame {
            frame: 3,
            faces: vec![FaceBox::new(0.25, 0.5, 0.1, 0.2, 0.9)],
            mesh: vec![MeshLandmarks::new(0.25, 0.55, 0.57)],
            error: None,
        }]);
        let frame = RgbImage::new(8, 8);

        assert_eq!(detector.detect_faces(3, &frame).unwrap().len(), 1);
        assert_eq!(detector.detect_mesh(3, &frame).unwrap().len(), 1);
        assert!(detector.detect_faces(4, &frame).unwrap().is_empty());
    }

    #[test]
    fn test_recorded_error_is_detection_failure() {
        let detector = RecordedDetector::new(vec![RecordedFrame {
            frame: 0,
            error: Some("model crashed".to_string()),
            ..Default::default()
        }]);
        let frame = RgbImage::new(8, 8);

        assert!(matches!(
            detector.detect_faces(0, &frame),
            Err(MediaError::DetectionFailed(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.json");
        std::fs::write(
            &path,
            r#"[{"frame": 0, "faces": [{"x_center": 0.5, "y_center": 0.5,
                 "width": 0.1, "height": 0.2, "confidence": 0.8}]}]"#,
        )
        .unwrap();

        let detector = RecordedDetector::from_file(&path).unwrap();
        assert_eq!(detector.len(), 1);
        assert!(detector.detect_mesh(0, &RgbImage::new(1, 1)).unwrap().is_empty());
    }
}
