//! Single-job execution.

use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use reframe_media::metrics;
use reframe_media::{
    reframe_to_portrait, LandmarkDetector, NoopDetector, RecordedDetector, ReframeOptions,
    ReframeReport,
};
use reframe_models::{JobOutcome, ReframeJob};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;

/// Exit status for a finished job.
pub fn exit_code(outcome: JobOutcome) -> i32 {
    match outcome {
        JobOutcome::Completed => 0,
        JobOutcome::Failed => 1,
        JobOutcome::Degraded => 3,
    }
}

/// A job in a terminal state, with the pipeline report when output was written.
#[derive(Debug)]
pub struct FinishedJob {
    pub job: ReframeJob,
    pub report: Option<ReframeReport>,
}

impl FinishedJob {
    pub fn outcome(&self) -> JobOutcome {
        self.job.outcome().unwrap_or(JobOutcome::Failed)
    }
}

/// Runs reframing jobs against one detector.
pub struct JobRunner {
    config: WorkerConfig,
    detector: Arc<dyn LandmarkDetector>,
}

impl JobRunner {
    /// Build a runner, loading recorded detector output when configured.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let detector: Arc<dyn LandmarkDetector> = match &config.observations {
            Some(path) => Arc::new(RecordedDetector::from_file(path)?),
            None => {
                tracing::warn!("No landmark source configured, every frame is treated as faceless");
                Arc::new(NoopDetector)
            }
        };
        Ok(Self::with_detector(config, detector))
    }

    pub fn with_detector(config: WorkerConfig, detector: Arc<dyn LandmarkDetector>) -> Self {
        Self { config, detector }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run a job to a terminal state. Failures are captured on the job.
    pub async fn run(&self, job: ReframeJob) -> FinishedJob {
        let logger = JobLogger::new(&job.id, "reframe");
        let span = logger.create_span();
        self.run_logged(job, logger).instrument(span).await
    }

    async fn run_logged(&self, job: ReframeJob, logger: JobLogger) -> FinishedJob {
        let started = Instant::now();
        logger.log_start(&format!(
            "{} -> {}",
            job.input.display(),
            job.output.display()
        ));

        let job = job.start();
        let options = ReframeOptions {
            settings: job.settings,
            encoding: job.encoding.clone(),
            ..self.config.reframe_options()
        };

        let finished = match reframe_to_portrait(
            &job.input,
            &job.output,
            &options,
            Arc::clone(&self.detector),
        )
        .await
        {
            Ok(report) => {
                if report.degraded {
                    logger.log_warning("tracked render failed, output uses a static center crop");
                }
                logger.log_completion(&format!(
                    "{} frames at {}x{}, {} scene cuts, {} subject switches in {:.1}s",
                    report.frames,
                    report.target_width,
                    report.target_height,
                    report.scene_cuts,
                    report.switches,
                    started.elapsed().as_secs_f64()
                ));
                FinishedJob {
                    job: job.complete(report.degraded),
                    report: Some(report),
                }
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                FinishedJob {
                    job: job.fail(e.to_string()),
                    report: None,
                }
            }
        };

        metrics::record_job(finished.outcome().as_str());
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use reframe_media::MediaError;
    use reframe_models::{JobState, ReframeSettings};

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(JobOutcome::Completed), 0);
        assert_eq!(exit_code(JobOutcome::Failed), 1);
        assert_eq!(exit_code(JobOutcome::Degraded), 3);
    }

    #[test]
    fn test_missing_observations_file_is_an_error() {
        let config = WorkerConfig {
            observations: Some("/nonexistent/faces.json".into()),
            ..Default::default()
        };
        let result = JobRunner::new(config);
        assert!(matches!(
            result,
            Err(WorkerError::Media(MediaError::FileNotFound(_)))
        ));
    }

    #[test]
    fn test_failed_job_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let runner = JobRunner::new(WorkerConfig::default()).unwrap();
        let job = ReframeJob::new(
            dir.path().join("missing.mp4"),
            dir.path().join("out.mp4"),
            ReframeSettings::default(),
        );

        let finished = tokio_test::block_on(runner.run(job));
        assert_eq!(finished.job.state, JobState::Failed);
        assert_eq!(finished.outcome(), JobOutcome::Failed);
        assert!(finished.report.is_none());
        assert!(finished.job.error_message.is_some());
        assert!(finished.job.started_at.is_some());
        assert!(!dir.path().join("out.mp4").exists());
    }
}
