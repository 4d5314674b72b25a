use std::{fs, io, time::Duration};

use clap::Parser;
use psi_trigger::{Config, Flow, Resource, StallType};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
struct Cli {
    /// cpu, io or memory
    #[arg(long, default_value = "cpu")]
    resource: Resource,
    /// some or full
    #[arg(long, default_value = "some")]
    stall_type: StallType,
    /// Stall window in milliseconds
    #[arg(long, default_value_t = 100)]
    stall_window_ms: u64,
    /// Time window in milliseconds
    #[arg(long, default_value_t = 1_000)]
    window_ms: u64,
    /// Stop after this many events, 0 keeps going forever
    #[arg(long, default_value_t = 0)]
    count: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive("info".parse()?)
                .with_env_var("PSI_LOG")
                .from_env()?,
        )
        .init();

    let cli = Cli::parse();
    let config = Config::builder()
        .resource(cli.resource)
        .stall_type(cli.stall_type)
        .stall_window(Duration::from_millis(cli.stall_window_ms))
        .window(Duration::from_millis(cli.window_ms))
        .build()?;
    if !config.resource.is_supported() {
        warn!(path = %config.resource.path().display(), "psi is not available for this resource");
    }
    info!("{}", config.explain().trim_end());

    let mut events = 0;
    psi_trigger::monitor(config, || {
        events += 1;
        let pressure = match fs::read_to_string(config.resource.path()) {
            Ok(pressure) => pressure,
            Err(e) => return Flow::<io::Error>::Fail(e),
        };
        info!(events, "psi event triggered:\n{}", pressure.trim_end());
        if cli.count != 0 && events >= cli.count {
            Flow::Stop
        } else {
            Flow::Continue
        }
    })?;
    Ok(())
}
