use std::{io, time::Duration};

use psi_trigger::{Config, Flow, Resource, StallType};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive("info".parse()?)
                .with_env_var("PSI_LOG")
                .from_env()?,
        )
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            _ = tokio::signal::ctrl_c().await;
            info!("interrupted, stopping");
            cancel.cancel();
        }
    });

    let watch = |resource, stall_type| {
        let config = Config::new(
            resource,
            stall_type,
            Duration::from_millis(150),
            Duration::from_secs(2),
        );
        let cancel = cancel.clone();
        async move {
            psi_trigger::monitor_async(config, &cancel, || {
                info!("psi event triggered on {resource} ({stall_type})");
                Flow::<io::Error>::Continue
            })
            .await
        }
    };

    tokio::try_join!(
        watch(Resource::Cpu, StallType::Some),
        watch(Resource::Memory, StallType::Full),
    )?;
    Ok(())
}
