//! Portrait reframing worker binary.
//!
//! Usage: `reframe-worker <input> <output>`; everything else comes from
//! `REFRAME_*` environment variables.

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

use reframe_models::ReframeJob;
use reframe_worker::{exit_code, init_tracing, JobRunner, WorkerConfig, WorkerError, WorkerResult};

/// Exit status for usage and configuration errors.
const EXIT_USAGE: i32 = 2;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            if e.is_configuration() {
                EXIT_USAGE
            } else {
                1
            }
        }
    };
    std::process::exit(code);
}

async fn run() -> WorkerResult<i32> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        return Err(WorkerError::usage("reframe-worker <input> <output>"));
    };

    let config = WorkerConfig::from_env();
    config.validate()?;
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))?;
        info!("Prometheus metrics exporter listening on {}", addr);
    }

    let job = ReframeJob::new(input, output, config.settings).with_encoding(config.encoding.clone());
    let runner = JobRunner::new(config)?;

    let finished = runner.run(job).await;
    match serde_json::to_string(&finished.job) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize job record: {}", e),
    }
    Ok(exit_code(finished.outcome()))
}
