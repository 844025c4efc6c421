//! Per-frame camera decisions and the path that carries them between passes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::VideoMetadata;

/// Tolerance for floating-point zoom bounds.
const ZOOM_EPSILON: f64 = 1e-9;

/// Errors raised while validating or persisting a [`CameraPath`].
#[derive(Debug, Error)]
pub enum PathError {
    #[error("frame {frame}: zoom {zoom} outside [1.0, {max_zoom}]")]
    ZoomOutOfRange { frame: usize, zoom: f64, max_zoom: f64 },

    #[error("frame {frame}: crop_x {crop_x} exceeds max {max_crop_x} at zoom {zoom}")]
    CropOutOfBounds {
        frame: usize,
        crop_x: u32,
        max_crop_x: u32,
        zoom: f64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crop and zoom for one output frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraConfig {
    /// Left edge of the visible crop in source pixels
    pub crop_x: u32,
    /// Zoom factor (1.0 = no zoom)
    pub zoom: f64,
    /// True on the first frame of a new shot
    #[serde(default)]
    pub is_scene_cut: bool,
}

impl CameraConfig {
    pub fn new(crop_x: u32, zoom: f64, is_scene_cut: bool) -> Self {
        Self {
            crop_x,
            zoom,
            is_scene_cut,
        }
    }

    /// Static center crop for the given geometry.
    pub fn centered(meta: &VideoMetadata) -> Self {
        Self::new(meta.center_crop_x(), 1.0, false)
    }
}

/// Ordered camera decisions, one per analyzed frame.
///
/// Written once by the analyzer and consumed read-only by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CameraPath {
    frames: Vec<CameraConfig>,
}

impl CameraPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, config: CameraConfig) {
        self.frames.push(config);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CameraConfig> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CameraConfig> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[CameraConfig] {
        &self.frames
    }

    /// Number of frames flagged as scene cuts.
    pub fn scene_cut_count(&self) -> usize {
        self.frames.iter().filter(|c| c.is_scene_cut).count()
    }

    /// Check crop and zoom bounds of every entry against the geometry.
    pub fn validate(&self, meta: &VideoMetadata, max_zoom: f64) -> Result<(), PathError> {
        for (frame, config) in self.frames.iter().enumerate() {
            if config.zoom < 1.0 - ZOOM_EPSILON || config.zoom > max_zoom + ZOOM_EPSILON {
                return Err(PathError::ZoomOutOfRange {
                    frame,
                    zoom: config.zoom,
                    max_zoom,
                });
            }

            let max_crop_x = meta.max_crop_x(config.zoom);
            if config.crop_x > max_crop_x {
                return Err(PathError::CropOutOfBounds {
                    frame,
                    crop_x: config.crop_x,
                    max_crop_x,
                    zoom: config.zoom,
                });
            }
        }
        Ok(())
    }

    /// Persist the path as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PathError> {
        let json = serde_json::to_vec(&self.frames)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a path previously written by [`CameraPath::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PathError> {
        let bytes = std::fs::read(path)?;
        let frames: Vec<CameraConfig> = serde_json::from_slice(&bytes)?;
        Ok(Self { frames })
    }
}

impl From<Vec<CameraConfig>> for CameraPath {
    fn from(frames: Vec<CameraConfig>) -> Self {
        Self { frames }
    }
}

impl<'a> IntoIterator for &'a CameraPath {
    type Item = &'a CameraConfig;
    type IntoIter = std::slice::Iter<'a, CameraConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
