
use crate::aggregate::{self, AggregateError};
use crate::config::MonitorConfig;
use crate::lifecycle::Lifecycle;
use crate::report::{self, RunReport};
use crate::sampler::Sampler;
use crate::source::TelemetrySource;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use tokio::time::Instant;

/// Runs one monitoring session against an already connected `source` and
/// returns the path of the written report.
///
/// Sampling continues until `lifecycle` is asked to stop. The source is closed
/// right after finalization whatever the outcome. A run that collected nothing
/// fails with [`AggregateError::NoSamples`] and writes no report.
pub async fn run<S: TelemetrySource>(
    config: &MonitorConfig,
    source: S,
    lifecycle: Lifecycle,
) -> Result<PathBuf> {
    let start_ts = Utc::now();
    tracing::info!(
        outlet = %config.run.outlet,
        device_ip = %config.run.device_ip,
        interval_secs = config.run.interval_secs,
        "monitoring outlet; send SIGTERM or press Ctrl-C to stop"
    );

    let begin = Instant::now();
    let samples = Sampler::new(&source, config)
        .run(lifecycle.token())
        .await;
    let finalized = lifecycle.finalize();
    source.close();

    let elapsed = finalized.end_mark.duration_since(begin);
    let summary = match aggregate::summarize(&samples, start_ts, finalized.end_ts, elapsed) {
        Ok(summary) => summary,
        Err(err @ AggregateError::NoSamples) => {
            tracing::error!(
                outlet = %config.run.outlet,
                "no samples collected; report not written"
            );
            return Err(err).context("monitoring run produced no report");
        }
    };

    tracing::info!(
        samples = summary.sample_count(),
        total_rt = summary.total_runtime_secs(),
        avg_ptime = summary.mean_probe_secs(),
        avg_power = summary.mean_power_watts(),
        "run summary"
    );

    let report = RunReport::build(&config.run, &samples, &summary);
    let path = report::write_report(&config.output_dir, &report)?;
    tracing::info!(path = %path.display(), "wrote report");
    Ok(path)
}
