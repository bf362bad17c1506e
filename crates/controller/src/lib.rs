pub mod apis;
pub mod cli;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod dispatcher;
pub mod metrics;
pub mod registry;
pub mod server;

use thiserror::Error;

pub use apis::{JobInfo, JobKey, JobSnapshot, PodPhase, PodRecord, RoutingKey, TaskBucket};
pub use dispatcher::{DispatchOutcome, EventDispatcher, PodEvent};
pub use registry::JobInfoRegistry;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes error: {0}")]
    Kubernetes(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("duplicated pod {pod} in task {task} of job {job}")]
    DuplicatePod {
        job: String,
        task: String,
        pod: String,
    },
    #[error("failed to find pod {pod} in task {task} of job {job}")]
    PodNotFound {
        job: String,
        task: String,
        pod: String,
    },
    #[error("pod {pod} belongs to job {found}, not {expected}")]
    JobMismatch {
        expected: String,
        found: String,
        pod: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
