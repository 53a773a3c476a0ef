use relay_daemon::{DaemonConfig, RelayDaemon};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DaemonConfig::from_env();
    let daemon = RelayDaemon::bootstrap(config)?;

    tracing::info!("relay daemon started");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    daemon.shutdown().await;
    Ok(())
}
