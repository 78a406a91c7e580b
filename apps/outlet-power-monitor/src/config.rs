use crate::cli::Args;
use anyhow::{bail, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Only Raritan PRO3X PDUs expose outlet readings at the Redfish paths we poll.
pub const DEVICE_TYPE: &str = "PRO3X";
pub const TEST_TYPE: &str = "power-usage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// What was monitored. Copied verbatim into the report's `test_config` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub device_type: String,
    pub device_ip: String,
    pub interval_secs: u64,
    pub outlet: String,
}

impl RunConfig {
    pub fn new(device_ip: impl Into<String>, interval_secs: u64, outlet: impl Into<String>) -> Self {
        Self {
            device_type: DEVICE_TYPE.to_string(),
            device_ip: device_ip.into(),
            interval_secs,
            outlet: outlet.into(),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub run: RunConfig,
    pub credentials: Credentials,
    pub scheme: Scheme,
    pub verify_tls: bool,
    pub probe_timeout_secs: u64,
    pub output_dir: PathBuf,
}

impl MonitorConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let device_ip = args.ip.trim().to_string();
        if device_ip.is_empty() {
            bail!("--ip must not be empty");
        }
        let outlet = args.outlet.trim().to_string();
        if outlet.is_empty() {
            bail!("--outlet must not be empty");
        }
        // Used verbatim as a Redfish URL path segment.
        if !outlet
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("--outlet {outlet:?} may only contain letters, digits, '_' and '-'");
        }
        if args.probe_timeout == 0 {
            bail!("--probe-timeout must be at least 1 second");
        }

        Ok(Self {
            run: RunConfig::new(device_ip, args.interval, outlet),
            credentials: Credentials {
                username: args.user,
                password: args.passwd,
            },
            scheme: args.scheme,
            verify_tls: args.verify_tls,
            probe_timeout_secs: args.probe_timeout,
            output_dir: args.output_dir,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.run.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.run.device_ip)
    }
}
