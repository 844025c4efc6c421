//! Frame sinks for rendered portrait frames.

use image::RgbImage;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::debug;

use reframe_models::EncodingConfig;

use crate::command::{check_ffmpeg, stderr_tail, FfmpegCommand};
use crate::error::{MediaError, MediaResult};

/// Ordered consumer of fixed-size output frames.
pub trait FrameSink {
    /// Append one frame. Every frame must have the sink's dimensions.
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()>;

    /// Flush and close the stream. No frames may be written afterwards.
    fn finish(&mut self) -> MediaResult<()>;
}

/// Encodes rawvideo from stdin into a video-only file.
pub struct FfmpegFrameSink {
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    frames_written: u64,
}

impl FfmpegFrameSink {
    /// Start an encoder writing `width`x`height` frames at `fps` to `output`.
    pub fn create(
        output: impl AsRef<Path>,
        width: u32,
        height: u32,
        fps: f64,
        encoding: &EncodingConfig,
    ) -> MediaResult<Self> {
        check_ffmpeg()?;

        let args = FfmpegCommand::new("pipe:0", output.as_ref())
            .rawvideo_input(width, height, fps)
            .output_args(encoding.to_video_args())
            .no_audio()
            .build_args();

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None)
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdin", None, None)
        })?;

        debug!(
            "Encoding {}x{} @ {:.2} fps to {}",
            width,
            height,
            fps,
            output.as_ref().display()
        );

        Ok(Self {
            width,
            height,
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl FrameSink for FfmpegFrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(MediaError::encode_failed(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::encode_failed("Encoder already finished"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| MediaError::encode_failed(e.to_string()))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> MediaResult<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .flush()
                .map_err(|e| MediaError::encode_failed(e.to_string()))?;
        }

        let Some(child) = self.child.take() else {
            return Ok(());
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg encoder exited with non-zero status",
                Some(stderr_tail(&output.stderr)),
                output.status.code(),
            ));
        }
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Collects frames in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<RgbImage>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if self.finished {
            return Err(MediaError::encode_failed("Sink already finished"));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> MediaResult<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_rejects_writes_after_finish() {
        let mut sink = MemorySink::new();
        let frame = RgbImage::new(2, 2);

        sink.write_frame(&frame).unwrap();
        sink.finish().unwrap();

        assert!(sink.write_frame(&frame).is_err());
        assert_eq!(sink.frames.len(), 1);
    }
}
