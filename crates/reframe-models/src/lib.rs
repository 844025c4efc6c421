//! Shared data models for the portrait reframing pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source geometry and the derived 9:16 output size
//! - Per-frame camera decisions and the camera path
//! - Analyzer settings and encoding configuration
//! - Reframe jobs and their outcomes

pub mod camera;
pub mod encoding;
pub mod job;
pub mod settings;
pub mod video;

// Re-export common types
pub use camera::{CameraConfig, CameraPath, PathError};
pub use encoding::EncodingConfig;
pub use job::{JobId, JobOutcome, JobState, ReframeJob};
pub use settings::{ReframeSettings, SettingsError};
pub use video::VideoMetadata;
