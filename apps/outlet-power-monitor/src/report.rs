use crate::aggregate::RunSummary;
use crate::config::{RunConfig, TEST_TYPE};
use crate::sampler::Sample;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S-UTC";
const REPORT_PREFIX: &str = "Results";
const MAX_NAME_SUFFIX: u32 = 999;

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

// Field order below is the on-disk key order.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub start_ts: String,
    pub test_type: String,
    pub test_config: TestConfig,
    pub test_results: Vec<SampleRecord>,
    pub test_summary: SummaryRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    pub device_type: String,
    pub device_ip: String,
    pub interval: String,
    pub outlet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub sample: u64,
    pub timestamp: String,
    pub outlet: String,
    pub power: f64,
    pub probetime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub start_ts: String,
    pub end_ts: String,
    pub numsamples: usize,
    pub total_rt: f64,
    pub avg_ptime: f64,
    pub avg_power: f64,
}

impl RunReport {
    pub fn build(config: &RunConfig, samples: &[Sample], summary: &RunSummary) -> Self {
        let start_ts = format_timestamp(&summary.start_ts());
        Self {
            start_ts: start_ts.clone(),
            test_type: TEST_TYPE.to_string(),
            test_config: TestConfig {
                device_type: config.device_type.clone(),
                device_ip: config.device_ip.clone(),
                interval: config.interval_secs.to_string(),
                outlet: config.outlet.clone(),
            },
            test_results: samples
                .iter()
                .map(|sample| SampleRecord {
                    sample: sample.sequence,
                    timestamp: format_timestamp(&sample.timestamp),
                    outlet: sample.outlet.clone(),
                    power: sample.power_watts,
                    probetime: sample.probe_secs,
                })
                .collect(),
            test_summary: SummaryRecord {
                start_ts,
                end_ts: format_timestamp(&summary.end_ts()),
                numsamples: summary.sample_count(),
                total_rt: summary.total_runtime_secs(),
                avg_ptime: summary.mean_probe_secs(),
                avg_power: summary.mean_power_watts(),
            },
        }
    }

    pub fn file_name(&self) -> String {
        self.numbered_file_name(0)
    }

    /// `Results_<start_ts>.json`, or `Results_<start_ts>_<n>.json` for `n > 0`.
    fn numbered_file_name(&self, n: u32) -> String {
        if n == 0 {
            format!("{REPORT_PREFIX}_{}.json", self.start_ts)
        } else {
            format!("{REPORT_PREFIX}_{}_{n}.json", self.start_ts)
        }
    }

    /// Pretty JSON with 4-space indentation and a trailing newline.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .context("failed to serialize run report")?;
        out.push(b'\n');
        Ok(out)
    }
}

/// Writes the report into `dir` through a temporary file that is renamed into
/// place, so a failed write never leaves a partial report behind. Reports are
/// never overwritten: runs started in the same second get a numeric suffix.
pub fn write_report(dir: &Path, report: &RunReport) -> Result<PathBuf> {
    let bytes = report.to_json()?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary report in {}", dir.display()))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .with_context(|| format!("failed to write report in {}", dir.display()))?;

    let mut n = 0;
    loop {
        let path = dir.join(report.numbered_file_name(n));
        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(err)
                if err.error.kind() == io::ErrorKind::AlreadyExists && n < MAX_NAME_SUFFIX =>
            {
                tracing::debug!(path = %path.display(), "report name taken");
                tmp = err.file;
                n += 1;
            }
            Err(err) => {
                return Err(err.error)
                    .with_context(|| format!("failed to write report {}", path.display()));
            }
        }
    }
}
