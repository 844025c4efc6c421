//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use reframe_media::ReframeOptions;
use reframe_models::encoding::MAX_CRF;
use reframe_models::{EncodingConfig, ReframeSettings};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    /// Analyzer knobs
    pub settings: ReframeSettings,
    /// Output encoding
    pub encoding: EncodingConfig,
    /// Parent directory for temporary files (system temp dir when unset)
    pub work_dir: Option<PathBuf>,
    /// Recorded detector output to replay (JSON array of frames)
    pub observations: Option<PathBuf>,
    /// Persist the camera path here
    pub path_out: Option<PathBuf>,
    /// Serve Prometheus metrics on this address
    pub metrics_addr: Option<SocketAddr>,
    /// Cap on analyzed duration in seconds
    pub max_seconds: Option<f64>,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup. Unparseable values fall back to
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ReframeSettings::default();
        let settings = ReframeSettings {
            sensitivity: lookup("REFRAME_SENSITIVITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sensitivity),
            camera_smoothing: lookup("REFRAME_CAMERA_SMOOTHING")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.camera_smoothing),
            zoom_threshold: lookup("REFRAME_ZOOM_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.zoom_threshold),
            zoom_level: lookup("REFRAME_ZOOM_LEVEL")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.zoom_level),
        };

        let mut encoding = EncodingConfig::default();
        if let Some(crf) = lookup("REFRAME_CRF").and_then(|s| s.parse().ok()) {
            encoding = encoding.with_crf(crf);
        }
        if let Some(preset) = lookup("REFRAME_PRESET").filter(|s| !s.is_empty()) {
            encoding = encoding.with_preset(preset);
        }

        Self {
            settings,
            encoding,
            work_dir: lookup("REFRAME_WORK_DIR").map(PathBuf::from),
            observations: lookup("REFRAME_OBSERVATIONS").map(PathBuf::from),
            path_out: lookup("REFRAME_PATH_OUT").map(PathBuf::from),
            metrics_addr: lookup("REFRAME_METRICS_ADDR").and_then(|s| s.parse().ok()),
            max_seconds: lookup("REFRAME_MAX_SECONDS").and_then(|s| s.parse().ok()),
        }
    }

    /// Reject settings the analyzer would otherwise have to coerce.
    pub fn validate(&self) -> WorkerResult<()> {
        self.settings.validate()?;
        if self.encoding.crf > MAX_CRF {
            return Err(WorkerError::config_error(format!(
                "REFRAME_CRF must be between 0 and {}, got {}",
                MAX_CRF, self.encoding.crf
            )));
        }
        if let Some(secs) = self.max_seconds {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(WorkerError::config_error(format!(
                    "REFRAME_MAX_SECONDS must be positive, got {}",
                    secs
                )));
            }
        }
        Ok(())
    }

    /// Options for one reframing run.
    pub fn reframe_options(&self) -> ReframeOptions {
        ReframeOptions {
            settings: self.settings,
            encoding: self.encoding.clone(),
            max_seconds: self.max_seconds,
            path_out: self.path_out.clone(),
            work_dir: self.work_dir.clone(),
        }
    }
}
