//! Source stream metadata and the derived portrait geometry.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Portrait aspect numerator (9:16).
pub const PORTRAIT_ASPECT_W: f64 = 9.0;
/// Portrait aspect denominator (9:16).
pub const PORTRAIT_ASPECT_H: f64 = 16.0;

/// Immutable per-job description of the source stream and output size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Source width in pixels
    pub width: u32,
    /// Source height in pixels
    pub height: u32,
    /// Source frame rate
    pub fps: f64,
    /// Total frame count reported by the container (may be an estimate)
    pub frame_count: u64,
    /// Portrait output width (never wider than the source)
    pub target_width: u32,
    /// Portrait output height
    pub target_height: u32,
}

impl VideoMetadata {
    /// Build metadata and derive the 9:16 output size.
    ///
    /// The portrait crop keeps the full source height. When the source is
    /// narrower than that crop, the width is clamped to the source and the
    /// height is recomputed from it instead.
    pub fn new(width: u32, height: u32, fps: f64, frame_count: u64) -> Self {
        let portrait_width = even_round(height as f64 * PORTRAIT_ASPECT_W / PORTRAIT_ASPECT_H);

        let (target_width, target_height) = if portrait_width <= width {
            (portrait_width, even_floor(height))
        } else {
            let w = even_floor(width);
            (w, even_round(w as f64 * PORTRAIT_ASPECT_H / PORTRAIT_ASPECT_W))
        };

        Self {
            width,
            height,
            fps,
            frame_count,
            target_width,
            target_height,
        }
    }

    /// Width of the source region shown at the given zoom.
    #[inline]
    pub fn visible_width(&self, zoom: f64) -> f64 {
        self.target_width as f64 / zoom.max(1.0)
    }

    /// Height of the source region shown at the given zoom, clamped to the source.
    #[inline]
    pub fn visible_height(&self, zoom: f64) -> f64 {
        (self.target_height as f64 / zoom.max(1.0)).min(self.height as f64)
    }

    /// Largest legal crop left edge at the given zoom.
    pub fn max_crop_x(&self, zoom: f64) -> u32 {
        (self.width as f64 - self.visible_width(zoom)).max(0.0).floor() as u32
    }

    /// Crop left edge of a static center crop at zoom 1.0.
    pub fn center_crop_x(&self) -> u32 {
        self.width.saturating_sub(self.target_width) / 2
    }

    /// Clip duration implied by frame count and frame rate.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }
}

fn even_round(value: f64) -> u32 {
    (((value / 2.0).round() as u32) * 2).max(2)
}

fn even_floor(value: u32) -> u32 {
    (value / 2 * 2).max(2)
}
