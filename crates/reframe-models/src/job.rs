//! Job definitions for portrait reframing.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{EncodingConfig, ReframeSettings};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a reframe job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job has not started yet
    #[default]
    Pending,
    /// Analysis or rendering in progress
    Processing,
    /// Output written (possibly with degraded framing)
    Completed,
    /// Job failed with a captured error message
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// How a finished job ended, used as a metrics label and exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Tracked portrait render succeeded
    Completed,
    /// Output written with a static center crop
    Degraded,
    /// No output produced
    Failed,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Completed => "completed",
            JobOutcome::Degraded => "degraded",
            JobOutcome::Failed => "failed",
        }
    }
}

/// A single landscape-to-portrait reframing job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReframeJob {
    /// Unique job ID
    pub id: JobId,

    /// Source landscape video
    #[schemars(with = "String")]
    pub input: PathBuf,

    /// Final portrait output
    #[schemars(with = "String")]
    pub output: PathBuf,

    /// Analyzer knobs
    #[serde(default)]
    pub settings: ReframeSettings,

    /// Output encoding
    #[serde(default)]
    pub encoding: EncodingConfig,

    /// Job state
    #[serde(default)]
    pub state: JobState,

    /// True when the output fell back to a static center crop
    #[serde(default)]
    pub degraded: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Started at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Completed at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ReframeJob {
    /// Create a new pending job.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, settings: ReframeSettings) -> Self {
        Self {
            id: JobId::new(),
            input: input.into(),
            output: output.into(),
            settings,
            encoding: EncodingConfig::default(),
            state: JobState::Pending,
            degraded: false,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// Use a specific encoding configuration.
    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    /// Start processing the job.
    pub fn start(mut self) -> Self {
        self.state = JobState::Processing;
        self.started_at = Some(Utc::now());
        self
    }

    /// Mark job as completed.
    pub fn complete(mut self, degraded: bool) -> Self {
        self.state = JobState::Completed;
        self.degraded = degraded;
        self.completed_at = Some(Utc::now());
        self
    }

    /// Outcome of a terminal job, `None` while it is still running.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match self.state {
            JobState::Completed if self.degraded => Some(JobOutcome::Degraded),
            JobState::Completed => Some(JobOutcome::Completed),
            JobState::Failed => Some(JobOutcome::Failed),
            _ => None,
        }
    }

    /// Mark job as failed.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.state = JobState::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = ReframeJob::new("in.mp4", "out.mp4", ReframeSettings::default());

        assert_eq!(job.state, JobState::Pending);
        assert!(!job.degraded);
        assert!(!job.id.as_str().is_empty());
    }

    #[test]
    fn test_job_state_transitions() {
        let job = ReframeJob::new("in.mp4", "out.mp4", ReframeSettings::default());

        let started = job.start();
        assert_eq!(started.state, JobState::Processing);
        assert!(started.started_at.is_some());

        let completed = started.complete(true);
        assert_eq!(completed.state, JobState::Completed);
        assert!(completed.degraded);
        assert!(completed.state.is_terminal());
        assert_eq!(completed.outcome(), Some(JobOutcome::Degraded));
    }

    #[test]
    fn test_job_failure_captures_message() {
        let job = ReframeJob::new("in.mp4", "out.mp4", ReframeSettings::default())
            .start()
            .fail("No frames processed");

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_message.as_deref(), Some("No frames processed"));
        assert_eq!(job.outcome().map(|o| o.as_str()), Some("failed"));
    }
}
