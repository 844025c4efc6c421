//! Data models for the camera path analyzer.

use serde::{Deserialize, Serialize};

/// Face bounding box as reported by the detector, in relative [0,1] coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

impl FaceBox {
    pub fn new(x_center: f64, y_center: f64, width: f64, height: f64, confidence: f64) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
            confidence,
        }
    }
}

/// Mouth landmarks from the face mesh, in relative [0,1] coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshLandmarks {
    pub nose_x: f64,
    pub upper_lip_y: f64,
    pub lower_lip_y: f64,
}

impl MeshLandmarks {
    pub fn new(nose_x: f64, upper_lip_y: f64, lower_lip_y: f64) -> Self {
        Self {
            nose_x,
            upper_lip_y,
            lower_lip_y,
        }
    }

    /// Vertical lip gap in pixels for a frame of the given height.
    #[inline]
    pub fn mouth_opening(&self, frame_height: u32) -> f64 {
        (self.lower_lip_y - self.upper_lip_y).abs() * frame_height as f64
    }
}

/// One detected face on a sampled frame, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceObservation {
    /// Frame the face was detected on
    pub frame: u64,
    /// Horizontal center
    pub x: f64,
    /// Vertical center
    pub y: f64,
    /// Bounding box area
    pub area: f64,
    /// Detection confidence
    pub confidence: f64,
    /// Lip gap in pixels (0 without landmark data)
    pub mouth_open: f64,
    /// Horizontal bucket id in `[0, NUM_BUCKETS)`
    pub bucket: u32,
}

/// Everything pass 1 knows about one frame after sensing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSignals {
    pub frame: u64,
    /// Frame starts a new shot
    pub is_cut: bool,
    /// `None` when the detector did not run (or failed) on this frame
    pub observations: Option<Vec<FaceObservation>>,
}

impl FrameSignals {
    /// A frame the detector did not look at.
    pub fn unsampled(frame: u64, is_cut: bool) -> Self {
        Self {
            frame,
            is_cut,
            observations: None,
        }
    }

    /// A frame with detector results (possibly no faces).
    pub fn sampled(frame: u64, is_cut: bool, observations: Vec<FaceObservation>) -> Self {
        Self {
            frame,
            is_cut,
            observations: Some(observations),
        }
    }
}

/// Which subject the camera follows after a selector step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackTarget {
    /// Tracked bucket, `None` when framing the center
    pub bucket: Option<u32>,
    /// Horizontal position the camera aims at
    pub x: f64,
    /// Mouth opening of the tracked subject on this frame (0 when unseen)
    pub mouth_open: f64,
}
