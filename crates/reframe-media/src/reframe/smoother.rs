//! Camera smoothing for jitter-free virtual camera motion.
//!
//! Two independent first-order filters: horizontal position with a fixed
//! pan factor, and zoom with a fast attack and a slow decay. Both snap to
//! their targets on a scene cut.

use reframe_models::{CameraConfig, VideoMetadata};

use super::config::AnalyzerConfig;
use super::models::TrackTarget;

/// Zoom is snapped to its target once closer than this.
const ZOOM_SNAP: f64 = 0.001;

/// Camera smoother producing one [`CameraConfig`] per frame.
#[derive(Debug, Clone)]
pub struct CameraSmoother {
    meta: VideoMetadata,
    smoothing: f64,
    zoom_open: f64,
    zoom_very_open: f64,
    max_zoom: f64,
    attack: f64,
    decay: f64,
    center: Option<f64>,
    zoom: f64,
}

impl CameraSmoother {
    pub fn new(meta: VideoMetadata, config: &AnalyzerConfig) -> Self {
        Self {
            meta,
            smoothing: config.settings.camera_smoothing,
            zoom_open: config.zoom_open(),
            zoom_very_open: config.zoom_very_open(),
            max_zoom: config.max_zoom(),
            attack: config.zoom_attack,
            decay: config.zoom_decay,
            center: None,
            zoom: 1.0,
        }
    }

    /// Target zoom for a mouth opening, linear between the two thresholds.
    pub fn zoom_for_mouth(&self, mouth_open: f64) -> f64 {
        if !mouth_open.is_finite() || mouth_open <= self.zoom_open {
            return 1.0;
        }
        if mouth_open >= self.zoom_very_open || self.zoom_very_open <= self.zoom_open {
            return self.max_zoom;
        }
        let t = (mouth_open - self.zoom_open) / (self.zoom_very_open - self.zoom_open);
        1.0 + t * (self.max_zoom - 1.0)
    }

    /// Smoothed crop center (before clamping), if initialized.
    pub fn center(&self) -> Option<f64> {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Advance one frame toward `target`.
    pub fn update(&mut self, target: &TrackTarget, is_cut: bool) -> CameraConfig {
        let center = match self.center {
            Some(center) if !is_cut => center + self.smoothing * (target.x - center),
            _ => target.x,
        };
        self.center = Some(center);

        if is_cut {
            self.zoom = 1.0;
        } else {
            let target_zoom = self.zoom_for_mouth(target.mouth_open);
            let rate = if target_zoom > self.zoom {
                self.attack
            } else {
                self.decay
            };
            self.zoom += rate * (target_zoom - self.zoom);
            if (target_zoom - self.zoom).abs() < ZOOM_SNAP {
                self.zoom = target_zoom;
            }
            self.zoom = self.zoom.clamp(1.0, self.max_zoom.max(1.0));
        }

        let visible_width = self.meta.visible_width(self.zoom);
        let left = (center - visible_width / 2.0).floor().max(0.0);
        let crop_x = (left as u32).min(self.meta.max_crop_x(self.zoom));

        CameraConfig::new(crop_x, self.zoom, is_cut)
    }
}
