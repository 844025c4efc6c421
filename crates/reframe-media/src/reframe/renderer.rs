//! Pass 2: apply a camera path to re-read frames.

use image::{imageops, RgbImage};
use std::time::Instant;
use tracing::{info, warn};

use reframe_models::{CameraConfig, CameraPath, VideoMetadata};

use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::sink::FrameSink;
use crate::source::FrameSource;

/// Crops, zooms and resizes frames to the portrait output size.
pub struct PathRenderer {
    meta: VideoMetadata,
}

impl PathRenderer {
    pub fn new(meta: VideoMetadata) -> Self {
        Self { meta }
    }

    /// Render one frame according to its camera config.
    pub fn render_frame(&self, frame: &RgbImage, config: &CameraConfig) -> MediaResult<RgbImage> {
        let meta = &self.meta;
        if frame.dimensions() != (meta.width, meta.height) {
            return Err(MediaError::decode_failed(format!(
                "frame is {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                meta.width,
                meta.height
            )));
        }

        let zoom = config.zoom.max(1.0);
        let crop_w = (meta.visible_width(zoom).round() as u32).clamp(1, meta.width);
        let crop_h = (meta.visible_height(zoom).round() as u32).clamp(1, meta.height);
        let crop_x = config.crop_x.min(meta.width - crop_w);
        let crop_y = (meta.height - crop_h) / 2;

        let region = imageops::crop_imm(frame, crop_x, crop_y, crop_w, crop_h).to_image();
        if region.dimensions() == (meta.target_width, meta.target_height) {
            return Ok(region);
        }

        Ok(imageops::resize(
            &region,
            meta.target_width,
            meta.target_height,
            imageops::FilterType::Triangle,
        ))
    }

    /// Render every path entry in order and close the sink.
    ///
    /// Returns the number of frames written. Stops early if the source runs
    /// out before the path does.
    pub fn render(
        &self,
        source: &mut dyn FrameSource,
        path: &CameraPath,
        sink: &mut dyn FrameSink,
    ) -> MediaResult<u64> {
        let started = Instant::now();
        let mut written: u64 = 0;

        for config in path {
            let Some(frame) = source.next_frame()? else {
                warn!(
                    rendered = written,
                    planned = path.len(),
                    "Frame source ended before camera path"
                );
                break;
            };
            let output = self.render_frame(&frame, config)?;
            sink.write_frame(&output)?;
            written += 1;
        }

        sink.finish()?;

        if written == 0 {
            return Err(MediaError::NoFramesProcessed);
        }

        metrics::record_pass_duration("render", started.elapsed().as_secs_f64());
        info!(
            frames = written,
            width = self.meta.target_width,
            height = self.meta.target_height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered portrait frames"
        );
        Ok(written)
    }
}
