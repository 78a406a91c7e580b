use anyhow::{Context, Result};
use clap::Parser;
use outlet_power_monitor::cli::Args;
use outlet_power_monitor::config::MonitorConfig;
use outlet_power_monitor::lifecycle::Lifecycle;
use outlet_power_monitor::monitor;
use outlet_power_monitor::redfish::RedfishClient;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,outlet_power_monitor=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;
    let config = MonitorConfig::from_args(args)?;

    // A device we cannot reach aborts the run before any sample or report.
    let client = RedfishClient::connect(&config).await.with_context(|| {
        format!(
            "connection to {} failed; no report written",
            config.base_url()
        )
    })?;

    let lifecycle = Lifecycle::new();
    let signals = lifecycle.spawn_signal_listener();
    let result = monitor::run(&config, client, lifecycle).await;
    signals.abort();

    let path = result?;
    tracing::info!(path = %path.display(), "monitoring run complete");
    Ok(())
}
