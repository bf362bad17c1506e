use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::apis::{JobKey, JobSpecInfo};

#[derive(CustomResource, Debug, Serialize, Deserialize, Clone, JsonSchema)]
#[kube(
    group = "batch.volcano.sh",
    version = "v1alpha1",
    kind = "Job",
    namespaced,
    status = "JobStatus"
)]
pub struct JobSpec {
    /// Queue the job is submitted to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,

    /// Minimum number of pods that must be schedulable together
    #[serde(rename = "minAvailable", default)]
    pub min_available: i32,

    /// Tasks of the job
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct TaskSpec {
    /// Task name, stamped on every pod of the task
    pub name: String,

    /// Number of pod replicas
    #[serde(default)]
    pub replicas: i32,

    /// Pod template for the replicas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PodTemplateSpec>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
pub struct JobStatus {
    /// Current state of the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,

    /// Generation of the task specs, bumped on every restart
    #[serde(default)]
    pub version: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
pub struct JobState {
    /// Phase: Pending, Aborting, Aborted, Running, Restarting, Completing,
    /// Completed, Terminating, Terminated, Failed
    #[serde(default)]
    pub phase: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Job {
    pub fn key(&self) -> JobKey {
        JobKey::new(
            self.namespace().unwrap_or_else(|| "default".to_string()),
            self.name_any(),
        )
    }

    /// Job version from the status; a negative or missing version reads as 0.
    pub fn version(&self) -> u32 {
        self.status
            .as_ref()
            .map(|s| u32::try_from(s.version).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl From<&JobSpec> for JobSpecInfo {
    fn from(spec: &JobSpec) -> Self {
        Self {
            queue: spec.queue.clone(),
            min_available: spec.min_available,
            replicas: spec
                .tasks
                .iter()
                .map(|t| (t.name.clone(), t.replicas))
                .collect(),
        }
    }
}
