//! Worker error types.

use thiserror::Error;

use reframe_media::MediaError;
use reframe_models::SettingsError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Errors caused by the caller rather than the input video.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WorkerError::ConfigError(_) | WorkerError::Usage(_) | WorkerError::Settings(_)
        )
    }
}
