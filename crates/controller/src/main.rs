use std::sync::Arc;

use kube::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use batch_controller::{
    config::Config,
    controllers::{JobController, PodController},
    server::Server,
    EventDispatcher, JobInfoRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::load()?;
    info!("Loaded configuration: {:?}", config);

    let client = Client::try_default().await?;

    // The registry lives for the whole process and is shared by the
    // watchers and the snapshot server.
    let registry = Arc::new(JobInfoRegistry::new());
    let dispatcher = Arc::new(EventDispatcher::new(registry.clone()));

    let pod_controller = Arc::new(PodController::new(
        client.clone(),
        config.watch.namespace.clone(),
        dispatcher,
    ));
    let job_controller = Arc::new(JobController::new(
        client,
        config.watch.namespace.clone(),
        registry.clone(),
    ));
    let server = Server::new(&config, registry);

    info!(
        "Tracking jobs for scheduler {}",
        config.watch.scheduler_name
    );

    tokio::select! {
        _ = pod_controller.run() => error!("Pod controller stopped"),
        _ = job_controller.run() => error!("Job controller stopped"),
        res = server.start(&config.server.addr) => res?,
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
    }

    info!("Shutting down");
    Ok(())
}
