//! Portrait reframing worker.
//!
//! This crate provides:
//! - Environment configuration for the analyzer and encoder
//! - Tracing setup and structured job logging
//! - A job runner that drives one reframe job to a terminal state

pub mod config;
pub mod error;
pub mod job;
pub mod logging;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use job::{exit_code, FinishedJob, JobRunner};
pub use logging::{init_tracing, JobLogger};
