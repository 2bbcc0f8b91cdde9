use dispatch_batch::{
    api::{AppState, Server},
    batch::BatchAccumulator,
    clock::{Clock, SystemClock},
    config::Config,
    registry::CourierRegistry,
    transport::{DryRunFileTransfer, DryRunMailer, InMemoryTransportLog, TransportDispatcher},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/default.toml";

/// The main entry point for the dispatch batch service.
///
/// This function initializes logging, loads the configuration, registers the
/// configured couriers, wires the batch to its transport dispatcher and
/// starts the API server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load(&config_path)?;
    info!("Dispatch service starting with config from {}", config_path);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let registry = CourierRegistry::from_config(&config.couriers, clock.clone());
    if registry.is_empty() {
        warn!("No couriers configured, every consignment request will be rejected");
    }
    for (reference, courier) in registry.iter() {
        info!(
            courier = reference,
            name = courier.name(),
            method = %courier.transport_method(),
            "Courier registered"
        );
    }

    // Real SMTP and FTP channels are not bundled; transports are logged only.
    let log = Arc::new(InMemoryTransportLog::new());
    let dispatcher = TransportDispatcher::new(
        Arc::new(DryRunMailer),
        Arc::new(DryRunFileTransfer),
        log.clone(),
        config.batch.scratch_dir.clone(),
        &config.transport,
    );

    let batch = BatchAccumulator::new(
        Arc::new(registry),
        Arc::new(dispatcher),
        clock,
        config.batch.clone(),
    );

    let server = Server::new(config.api.clone(), AppState { batch: Arc::new(batch), log });
    server.start().await?;

    Ok(())
}
