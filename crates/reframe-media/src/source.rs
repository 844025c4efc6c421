//! Decoded frame sources.
//!
//! Frames are delivered strictly in presentation order as `RgbImage`s. The
//! FFmpeg source decodes to `rgb24` rawvideo over a pipe; the memory source
//! replays frames that are already decoded.

use image::RgbImage;
use std::collections::VecDeque;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

use reframe_models::VideoMetadata;

use crate::command::{check_ffmpeg, FfmpegCommand};
use crate::error::{MediaError, MediaResult};

/// Ordered supplier of decoded frames.
pub trait FrameSource {
    /// Geometry and timing of the stream being decoded.
    fn metadata(&self) -> &VideoMetadata;

    /// Next frame in presentation order, `None` once the stream ends.
    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>>;
}

/// Decodes a video file through an `ffmpeg` child process.
pub struct FfmpegFrameSource {
    meta: VideoMetadata,
    child: Child,
    reader: BufReader<ChildStdout>,
    frame_bytes: usize,
    frames_read: u64,
}

impl FfmpegFrameSource {
    /// Start decoding `path`, whose geometry was probed beforehand.
    pub fn open(path: impl AsRef<Path>, meta: VideoMetadata) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        check_ffmpeg()?;

        let args = FfmpegCommand::new(path, "pipe:1")
            .rawvideo_output()
            .no_audio()
            .build_args();

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None)
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None)
        })?;

        debug!("Decoding {} as {}x{} rgb24", path.display(), meta.width, meta.height);

        Ok(Self {
            meta,
            child,
            reader: BufReader::new(stdout),
            frame_bytes: meta.width as usize * meta.height as usize * 3,
            frames_read: 0,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.meta
    }

    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        let mut buffer = vec![0u8; self.frame_bytes];
        let mut filled = 0;

        while filled < self.frame_bytes {
            match self.reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(MediaError::decode_failed(e.to_string())),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < self.frame_bytes {
            warn!(
                frame = self.frames_read,
                bytes = filled,
                "Truncated frame at end of stream, discarding"
            );
            return Ok(None);
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.meta.width, self.meta.height, buffer)
            .map(Some)
            .ok_or_else(|| MediaError::decode_failed("Frame buffer size mismatch"))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        // Decoding may stop early (frame cap); don't leave ffmpeg blocked on a full pipe.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Replays frames held in memory.
pub struct MemoryFrameSource {
    meta: VideoMetadata,
    frames: VecDeque<RgbImage>,
}

impl MemoryFrameSource {
    pub fn new(meta: VideoMetadata, frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            meta,
            frames: frames.into_iter().collect(),
        }
    }

    /// `count` copies of one frame, sized to the metadata.
    pub fn repeat(meta: VideoMetadata, frame: &RgbImage, count: usize) -> Self {
        Self::new(meta, std::iter::repeat(frame.clone()).take(count))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemoryFrameSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.meta
    }

    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_preserves_order() {
        let meta = VideoMetadata::new(4, 4, 30.0, 2);
        let frames = vec![
            RgbImage::from_pixel(4, 4, image::Rgb([1, 1, 1])),
            RgbImage::from_pixel(4, 4, image::Rgb([2, 2, 2])),
        ];
        let mut source = MemoryFrameSource::new(meta, frames);

        assert_eq!(source.next_frame().unwrap().unwrap().get_pixel(0, 0)[0], 1);
        assert_eq!(source.next_frame().unwrap().unwrap().get_pixel(0, 0)[0], 2);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_ffmpeg_source_missing_file() {
        let meta = VideoMetadata::new(1920, 1080, 30.0, 0);
        let result = FfmpegFrameSource::open("/nonexistent/clip.mp4", meta);
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
