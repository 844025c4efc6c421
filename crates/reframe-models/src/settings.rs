//! User-facing knobs for the camera path analyzer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest tracking sensitivity (slow, stable camera).
pub const MIN_SENSITIVITY: u8 = 1;
/// Highest tracking sensitivity (fast, responsive camera).
pub const MAX_SENSITIVITY: u8 = 10;
/// Slowest allowed pan smoothing factor.
pub const MIN_CAMERA_SMOOTHING: f64 = 0.05;
/// Fastest allowed pan smoothing factor.
pub const MAX_CAMERA_SMOOTHING: f64 = 0.5;
/// Upper bound for the expression zoom factor.
pub const MAX_ZOOM_LEVEL: f64 = 2.0;

/// Validation errors for [`ReframeSettings`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("sensitivity must be between 1 and 10, got {0}")]
    Sensitivity(u8),

    #[error("camera_smoothing must be between 0.05 and 0.5, got {0}")]
    CameraSmoothing(f64),

    #[error("zoom_threshold must be a positive pixel distance, got {0}")]
    ZoomThreshold(f64),

    #[error("zoom_level must be between 1.0 and 2.0, got {0}")]
    ZoomLevel(f64),
}

/// Analyzer configuration accepted from the job submitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReframeSettings {
    /// 1 = slow, stable subject switching; 10 = fast, responsive switching
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u8,

    /// How fast the camera pans toward its target (per frame)
    #[serde(default = "default_camera_smoothing")]
    pub camera_smoothing: f64,

    /// Mouth opening in pixels at which the expression zoom begins
    #[serde(default = "default_zoom_threshold")]
    pub zoom_threshold: f64,

    /// Maximum zoom factor applied on strong expressions
    #[serde(default = "default_zoom_level")]
    pub zoom_level: f64,
}

fn default_sensitivity() -> u8 {
    5
}
fn default_camera_smoothing() -> f64 {
    0.15
}
fn default_zoom_threshold() -> f64 {
    20.0
}
fn default_zoom_level() -> f64 {
    1.15
}

impl Default for ReframeSettings {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            camera_smoothing: default_camera_smoothing(),
            zoom_threshold: default_zoom_threshold(),
            zoom_level: default_zoom_level(),
        }
    }
}

impl ReframeSettings {
    /// Validate every knob against its accepted range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&self.sensitivity) {
            return Err(SettingsError::Sensitivity(self.sensitivity));
        }

        if !(MIN_CAMERA_SMOOTHING..=MAX_CAMERA_SMOOTHING).contains(&self.camera_smoothing) {
            return Err(SettingsError::CameraSmoothing(self.camera_smoothing));
        }

        if !(self.zoom_threshold.is_finite() && self.zoom_threshold > 0.0) {
            return Err(SettingsError::ZoomThreshold(self.zoom_threshold));
        }

        if !(1.0..=MAX_ZOOM_LEVEL).contains(&self.zoom_level) {
            return Err(SettingsError::ZoomLevel(self.zoom_level));
        }

        Ok(())
    }

    /// Coerce out-of-range values into their accepted ranges.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            sensitivity: self.sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY),
            camera_smoothing: if self.camera_smoothing.is_finite() {
                self.camera_smoothing
                    .clamp(MIN_CAMERA_SMOOTHING, MAX_CAMERA_SMOOTHING)
            } else {
                defaults.camera_smoothing
            },
            zoom_threshold: if self.zoom_threshold.is_finite() && self.zoom_threshold > 0.0 {
                self.zoom_threshold
            } else {
                defaults.zoom_threshold
            },
            zoom_level: if self.zoom_level.is_finite() {
                self.zoom_level.clamp(1.0, MAX_ZOOM_LEVEL)
            } else {
                defaults.zoom_level
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ReframeSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.sensitivity, 5);
        assert!((settings.zoom_level - 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut settings = ReframeSettings::default();
        settings.sensitivity = 11;
        assert_eq!(settings.validate(), Err(SettingsError::Sensitivity(11)));

        let mut settings = ReframeSettings::default();
        settings.camera_smoothing = 0.9;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::CameraSmoothing(_))
        ));

        let mut settings = ReframeSettings::default();
        settings.zoom_level = 0.5;
        assert!(matches!(settings.validate(), Err(SettingsError::ZoomLevel(_))));
    }

    #[test]
    fn test_clamped_coerces_into_range() {
        let settings = ReframeSettings {
            sensitivity: 0,
            camera_smoothing: 2.0,
            zoom_threshold: -3.0,
            zoom_level: 5.0,
        }
        .clamped();

        assert_eq!(settings.sensitivity, 1);
        assert_eq!(settings.camera_smoothing, MAX_CAMERA_SMOOTHING);
        assert_eq!(settings.zoom_threshold, 20.0);
        assert_eq!(settings.zoom_level, MAX_ZOOM_LEVEL);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let settings: ReframeSettings = serde_json::from_str(r#"{"sensitivity": 8}"#).unwrap();
        assert_eq!(settings.sensitivity, 8);
        assert_eq!(settings.camera_smoothing, 0.15);
    }
}
