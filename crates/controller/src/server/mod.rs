mod routes;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{config::Config, registry::JobInfoRegistry, Result};

pub struct Server {
    registry: Arc<JobInfoRegistry>,
}

impl Server {
    pub fn new(_config: &Config, registry: Arc<JobInfoRegistry>) -> Self {
        Self { registry }
    }

    pub fn build_router(self) -> Router {
        let state = Arc::new(self);

        Router::new()
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::metrics))
            .route("/jobs", get(routes::list_jobs))
            .route("/jobs/{namespace}/{name}", get(routes::get_job))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Serving job snapshots on {}", addr);
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}
