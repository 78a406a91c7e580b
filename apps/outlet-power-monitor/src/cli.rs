use crate::config::Scheme;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "outlet-power-monitor",
    version,
    about = "Redfish outlet power monitor"
)]
pub struct Args {
    /// Address of the PDU's Redfish service (host or host:port)
    #[arg(long)]
    pub ip: String,
    /// Delay in seconds between readings; fractional seconds are dropped
    #[arg(long, value_parser = parse_interval_secs)]
    pub interval: u64,
    /// PDU outlet number to monitor
    #[arg(long)]
    pub outlet: String,
    #[arg(long, default_value = "labuser")]
    pub user: String,
    #[arg(long, default_value = "100Yard-")]
    pub passwd: String,
    /// Upper bound in seconds for a single Redfish request
    #[arg(long, default_value_t = 10)]
    pub probe_timeout: u64,
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
    #[arg(long, default_value_t = false)]
    pub verify_tls: bool,
    #[arg(long, value_enum, default_value_t = Scheme::Https)]
    pub scheme: Scheme,
}

fn parse_interval_secs(raw: &str) -> Result<u64, String> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid interval {raw:?}: expected seconds"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid interval {raw:?}: must be a non-negative number"));
    }
    Ok(value.trunc() as u64)
}
