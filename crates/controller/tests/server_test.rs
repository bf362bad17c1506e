use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use batch_controller::{
    apis::{JOB_NAME_KEY, JOB_VERSION_KEY, TASK_SPEC_KEY},
    config::Config,
    server::Server,
    EventDispatcher, JobInfoRegistry, PodEvent,
};
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

fn job_pod(name: &str, job: &str, task: &str, phase: &str) -> Pod {
    let mut annotations = BTreeMap::new();
    annotations.insert(JOB_NAME_KEY.to_string(), job.to_string());
    annotations.insert(JOB_VERSION_KEY.to_string(), "0".to_string());
    annotations.insert(TASK_SPEC_KEY.to_string(), task.to_string());

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("test".to_string()),
            annotations: Some(annotations),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_server_endpoints() {
    let registry = Arc::new(JobInfoRegistry::new());
    let dispatcher = EventDispatcher::new(registry.clone());

    dispatcher
        .handle(PodEvent::Added(job_pod("job1-worker-0", "job1", "worker", "Running")))
        .await;
    dispatcher
        .handle(PodEvent::Added(job_pod("job1-worker-1", "job1", "worker", "Pending")))
        .await;

    let server = Server::new(&Config::default(), registry);
    let client = axum_test::TestServer::new(server.build_router()).unwrap();

    // Test health endpoint
    let response = client.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");

    // Test list jobs
    let response = client.get("/jobs").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Vec<serde_json::Value> = response.json();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["namespace"], "test");
    assert_eq!(body[0]["name"], "job1");

    // Test job snapshot
    let response = client.get("/jobs/test/job1").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "job1");
    assert_eq!(body["counts"]["running"], 1);
    assert_eq!(body["counts"]["pending"], 1);
    assert_eq!(body["tasks"][0]["name"], "worker");
    assert_eq!(body["tasks"][0]["pods"].as_array().unwrap().len(), 2);
    assert_eq!(body["tasks"][0]["pods"][0]["name"], "job1-worker-0");
    assert_eq!(body["tasks"][0]["pods"][0]["phase"], "Running");

    // Test get non-existent job
    let response = client.get("/jobs/test/missing").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Job not found");

    // Test metrics
    let response = client.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("batch_controller_pod_events_total"));
}
