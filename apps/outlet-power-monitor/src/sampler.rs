use crate::aggregate::round_to;
use crate::config::MonitorConfig;
use crate::source::TelemetrySource;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One successful probe. Failed probes never produce a `Sample`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// 1-based, gap free.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub outlet: String,
    pub power_watts: f64,
    /// Monotonic duration of the probe call, rounded to 0.01 s.
    pub probe_secs: f64,
}

pub struct Sampler<'a, S> {
    source: &'a S,
    outlet: String,
    interval: Duration,
    probe_timeout: Duration,
}

impl<'a, S: TelemetrySource> Sampler<'a, S> {
    pub fn new(source: &'a S, config: &MonitorConfig) -> Self {
        Self {
            source,
            outlet: config.run.outlet.clone(),
            interval: config.interval(),
            probe_timeout: config.probe_timeout(),
        }
    }

    /// Polls until `cancel` fires. The flag is checked before each probe; a
    /// probe already in flight always runs to completion (bounded by the probe
    /// timeout) while the pacing sleep is cut short.
    pub async fn run(&self, cancel: &CancellationToken) -> Vec<Sample> {
        let mut samples: Vec<Sample> = Vec::new();
        let mut failed_probes = 0u64;

        while !cancel.is_cancelled() {
            let sequence = samples.len() as u64 + 1;
            let started = Instant::now();
            let result = self
                .source
                .read_outlet(&self.outlet, self.probe_timeout)
                .await;
            let probe_secs = round_to(started.elapsed().as_secs_f64(), 2);

            match result {
                Ok(reading) => {
                    let timestamp = Utc::now();
                    tracing::info!(
                        outlet = %reading.outlet_id,
                        sample = sequence,
                        power_w = reading.power_watts,
                        probe_secs,
                        "captured sample"
                    );
                    samples.push(Sample {
                        sequence,
                        timestamp,
                        outlet: reading.outlet_id,
                        power_watts: reading.power_watts,
                        probe_secs,
                    });
                }
                Err(err) => {
                    failed_probes += 1;
                    tracing::warn!(
                        outlet = %self.outlet,
                        error = %err,
                        probe_secs,
                        "probe failed; sample skipped"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(
            samples = samples.len(),
            failed_probes,
            "sampling loop exited"
        );
        samples
    }
}
