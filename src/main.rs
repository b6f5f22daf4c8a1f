use embedded_redis::ClusterBuilder;
use embedded_redis::Error;
use embedded_redis::Result;
use embedded_redis::Settings;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

/// Group monitored when the topology section declares none.
const DEFAULT_GROUP: &str = "mymaster";

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    init_observability();

    let settings = Settings::new()?.validate()?;

    let mut builder = ClusterBuilder::from_settings(&settings);
    if settings.topology.groups.is_empty() {
        builder = builder.replication_group(DEFAULT_GROUP, 0);
    }
    let cluster = builder.build()?;

    if let Err(e) = cluster.start().await {
        error!("cluster failed to start: {}", e);
        if let Err(e) = cluster.stop().await {
            error!("cleanup after failed start: {}", e);
        }
        return Err(e);
    }

    info!("sentinel ports: {:?}", cluster.sentinel_ports());
    info!("server ports: {:?}", cluster.server_ports());
    info!("Application started. Waiting for CTRL+C signal...");

    if let Err(e) = graceful_shutdown().await {
        error!("Failed to listen for shutdown: {:?}", e);
    }

    cluster.stop().await?;
    info!("Shutdown completed");
    Ok(())
}

async fn graceful_shutdown() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| Error::Fatal(format!("failed to install SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| Error::Fatal(format!("failed to install SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    info!("Shutdown cluster..");
    Ok(())
}

fn init_observability() {
    let base_subscriber = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();
}
