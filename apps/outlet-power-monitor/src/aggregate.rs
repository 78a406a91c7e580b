use crate::sampler::Sample;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no samples collected")]
    NoSamples,
}

/// Shutdown statistics for one run.
///
/// Only [`summarize`] builds one, so every field is derived from the sample
/// sequence and the two lifecycle marks.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    start_ts: DateTime<Utc>,
    end_ts: DateTime<Utc>,
    sample_count: usize,
    total_runtime_secs: f64,
    mean_probe_secs: f64,
    mean_power_watts: f64,
}

impl RunSummary {
    pub fn start_ts(&self) -> DateTime<Utc> {
        self.start_ts
    }

    pub fn end_ts(&self) -> DateTime<Utc> {
        self.end_ts
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn total_runtime_secs(&self) -> f64 {
        self.total_runtime_secs
    }

    pub fn mean_probe_secs(&self) -> f64 {
        self.mean_probe_secs
    }

    pub fn mean_power_watts(&self) -> f64 {
        self.mean_power_watts
    }
}

/// `elapsed` is the monotonic span from loop start to finalization, measured
/// directly rather than summed from probe times and pauses.
pub fn summarize(
    samples: &[Sample],
    start_ts: DateTime<Utc>,
    end_ts: DateTime<Utc>,
    elapsed: Duration,
) -> Result<RunSummary, AggregateError> {
    let mean_probe_secs =
        mean(samples.iter().map(|s| s.probe_secs)).ok_or(AggregateError::NoSamples)?;
    let mean_power_watts =
        mean(samples.iter().map(|s| s.power_watts)).ok_or(AggregateError::NoSamples)?;

    Ok(RunSummary {
        start_ts,
        end_ts,
        sample_count: samples.len(),
        total_runtime_secs: round_to(elapsed.as_secs_f64(), 1),
        mean_probe_secs: round_to(mean_probe_secs, 2),
        mean_power_watts: round_to(mean_power_watts, 2),
    })
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
