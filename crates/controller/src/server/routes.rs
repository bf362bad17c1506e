use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::Server;
use crate::{apis::JobKey, metrics as controller_metrics};

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn metrics() -> Response {
    match controller_metrics::gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn list_jobs(State(server): State<Arc<Server>>) -> Json<Vec<JobKey>> {
    Json(server.registry.keys().await)
}

pub async fn get_job(
    State(server): State<Arc<Server>>,
    Path((namespace, name)): Path<(String, String)>,
) -> Response {
    let key = JobKey::new(namespace, name);
    match server.registry.snapshot(&key).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Job not found" })),
        )
            .into_response(),
    }
}
