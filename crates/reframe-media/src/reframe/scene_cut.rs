//! Scene cut detection.
//!
//! Each frame is reduced to a small grayscale thumbnail and compared with the
//! previous one by mean absolute difference. The first frame is always a cut
//! so that every shot, including the opening one, starts from a clean state.
//! Cuts are only a hint: frames that cannot be compared are reported as
//! "not a cut".

use image::{imageops, GrayImage, RgbImage};
use tracing::{debug, warn};

/// Thumbnail width used for comparison.
const THUMB_WIDTH: u32 = 64;
/// Thumbnail height used for comparison.
const THUMB_HEIGHT: u32 = 36;

/// Reduce a frame to the fixed comparison thumbnail.
///
/// Returns `None` for frames with no pixels.
pub fn thumbnail(frame: &RgbImage) -> Option<GrayImage> {
    if frame.width() == 0 || frame.height() == 0 {
        return None;
    }
    let small = imageops::thumbnail(frame, THUMB_WIDTH, THUMB_HEIGHT);
    Some(imageops::grayscale(&small))
}

/// Mean absolute intensity difference between two thumbnails.
pub fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> Option<f64> {
    if a.dimensions() != b.dimensions() || a.as_raw().is_empty() {
        return None;
    }
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&p, &q)| u64::from(p.abs_diff(q)))
        .sum();
    Some(total as f64 / a.as_raw().len() as f64)
}

/// Whether `current` starts a new shot relative to `previous`.
pub fn is_scene_cut(previous: Option<&RgbImage>, current: &RgbImage, threshold: f64) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    match (thumbnail(previous), thumbnail(current)) {
        (Some(a), Some(b)) => mean_abs_diff(&a, &b).is_some_and(|diff| diff > threshold),
        _ => {
            warn!("Scene cut comparison skipped: empty frame");
            false
        }
    }
}

/// Frame-by-frame cut detector that keeps the previous thumbnail.
#[derive(Debug)]
pub struct SceneCutDetector {
    threshold: f64,
    previous: Option<GrayImage>,
    cut_count: u64,
}

impl SceneCutDetector {
    /// Create a detector declaring a cut above `threshold` (0-255 scale).
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            previous: None,
            cut_count: 0,
        }
    }

    /// Classify the next frame in presentation order.
    pub fn check_frame(&mut self, frame_index: u64, frame: &RgbImage) -> bool {
        let Some(current) = thumbnail(frame) else {
            warn!(frame = frame_index, "Scene cut comparison skipped: empty frame");
            return false;
        };

        let is_cut = match self.previous.as_ref() {
            None => true,
            Some(previous) => match mean_abs_diff(previous, &current) {
                Some(diff) => {
                    if diff > self.threshold {
                        debug!(frame = frame_index, diff, "Frame difference above cut threshold");
                        true
                    } else {
                        false
                    }
                }
                None => {
                    warn!(frame = frame_index, "Scene cut comparison failed");
                    false
                }
            },
        };

        self.previous = Some(current);
        if is_cut {
            self.cut_count += 1;
        }
        is_cut
    }

    /// Cuts reported so far, including the first frame.
    pub fn cut_count(&self) -> u64 {
        self.cut_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(value: u8) -> RgbImage {
        RgbImage::from_pixel(320, 180, Rgb([value, value, value]))
    }

    #[test]
    fn test_first_frame_is_cut() {
        assert!(is_scene_cut(None, &solid(10), 30.0));

        let mut detector = SceneCutDetector::new(30.0);
        assert!(detector.check_frame(0, &solid(10)));
        assert_eq!(detector.cut_count(), 1);
    }

    #[test]
    fn test_similar_frames_are_not_cuts() {
        let mut detector = SceneCutDetector::new(30.0);
        detector.check_frame(0, &solid(100));
        assert!(!detector.check_frame(1, &solid(110)));
        assert!(!is_scene_cut(Some(&solid(100)), &solid(110), 30.0));
    }

    #[test]
    fn test_hard_transition_is_cut() {
        let mut detector = SceneCutDetector::new(30.0);
        detector.check_frame(0, &solid(20));
        assert!(detector.check_frame(1, &solid(200)));
        assert!(!detector.check_frame(2, &solid(200)));
        assert_eq!(detector.cut_count(), 2);
    }

    #[test]
    fn test_empty_frame_is_not_cut() {
        let empty = RgbImage::new(0, 0);
        assert!(!is_scene_cut(Some(&solid(0)), &empty, 30.0));

        let mut detector = SceneCutDetector::new(30.0);
        assert!(!detector.check_frame(0, &empty));
    }

    #[test]
    fn test_mean_abs_diff() {
        let a = GrayImage::from_pixel(4, 4, image::Luma([10]));
        let b = GrayImage::from_pixel(4, 4, image::Luma([40]));
        assert_eq!(mean_abs_diff(&a, &b), Some(30.0));
        assert_eq!(mean_abs_diff(&a, &GrayImage::new(2, 2)), None);
    }
}
