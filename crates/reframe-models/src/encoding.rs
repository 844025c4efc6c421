//! Output encoding for rendered portrait clips.
//!
//! Video is always H.264 in yuv420p so the clips play everywhere; only the
//! speed/quality trade-off is configurable. Audio is re-encoded to AAC when
//! the source carries any.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const VIDEO_CODEC: &str = "libx264";
pub const PIXEL_FORMAT: &str = "yuv420p";
pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_BITRATE: &str = "192k";

pub const DEFAULT_PRESET: &str = "fast";
pub const DEFAULT_CRF: u8 = 18;
/// Highest CRF libx264 accepts.
pub const MAX_CRF: u8 = 51;

/// x264 preset and quality for the rendered video stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    /// x264 preset ("ultrafast" through "veryslow")
    pub preset: String,
    /// Constant Rate Factor, 0-51, lower is better
    pub crf: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
        }
    }
}

impl EncodingConfig {
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Encoder arguments for the video stream only.
    pub fn to_video_args(&self) -> Vec<String> {
        let crf = self.crf.to_string();
        [
            "-c:v",
            VIDEO_CODEC,
            "-preset",
            self.preset.as_str(),
            "-crf",
            crf.as_str(),
            "-pix_fmt",
            PIXEL_FORMAT,
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Encoder arguments for the audio stream only.
    pub fn to_audio_args(&self) -> Vec<String> {
        ["-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Video then audio arguments, for single-step encodes.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = self.to_video_args();
        args.extend(self.to_audio_args());
        args
    }
}
