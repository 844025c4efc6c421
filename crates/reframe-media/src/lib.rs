#![deny(unreachable_patterns)]
//! Portrait reframing media pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and ffprobe metadata
//! - Raw RGB frame sources and sinks over FFmpeg pipes
//! - Camera path analysis (scene cuts, activity tracking, subject selection, smoothing)
//! - Path rendering, audio muxing and the static center-crop fallback

pub mod command;
pub mod error;
pub mod metrics;
pub mod mux;
pub mod probe;
pub mod reframe;
pub mod sink;
pub mod source;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use mux::{center_crop_reframe, mux_audio};
pub use probe::{probe_video, VideoInfo};
pub use reframe::{
    reframe_to_portrait, AnalyzerConfig, CameraPathAnalyzer, LandmarkDetector, NoopDetector,
    PathAnalysis, PathRenderer, RecordedDetector, RecordedFrame, ReframeOptions, ReframeReport,
};
pub use sink::{FfmpegFrameSink, FrameSink, MemorySink};
pub use source::{FfmpegFrameSource, FrameSource, MemoryFrameSource};
