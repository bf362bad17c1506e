use std::fmt;

use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

/// Name of the job that owns the pod.
pub const JOB_NAME_KEY: &str = "volcano.sh/job-name";
/// Generation of the job spec the pod was created from.
pub const JOB_VERSION_KEY: &str = "volcano.sh/job-version";
/// Task of the job the pod is a replica of.
pub const TASK_SPEC_KEY: &str = "volcano.sh/task-spec";

/// Identity of a job: namespace plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    pub namespace: String,
    pub name: String,
}

impl JobKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Where a pod belongs, derived once from its annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingKey {
    pub namespace: String,
    #[serde(rename = "jobName")]
    pub job_name: String,
    #[serde(rename = "jobVersion")]
    pub job_version: u32,
    #[serde(rename = "taskName")]
    pub task_name: String,
}

impl RoutingKey {
    /// Returns `None` when the pod is not managed by this controller: any of
    /// the job-name, job-version or task-spec annotations is missing, empty,
    /// or the version is not a non-negative integer.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let annotations = pod.metadata.annotations.as_ref()?;

        let job_name = annotations.get(JOB_NAME_KEY).filter(|v| !v.is_empty())?;
        let task_name = annotations.get(TASK_SPEC_KEY).filter(|v| !v.is_empty())?;
        let job_version = annotations.get(JOB_VERSION_KEY)?.trim().parse::<u32>().ok()?;

        Some(Self {
            namespace: pod
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            job_name: job_name.clone(),
            job_version,
            task_name: task_name.clone(),
        })
    }

    pub fn job_key(&self) -> JobKey {
        JobKey::new(self.namespace.clone(), self.job_name.clone())
    }
}
