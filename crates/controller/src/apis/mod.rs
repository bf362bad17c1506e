//! Per-job pod bookkeeping.
//!
//! Pods are routed into a [`JobInfo`] by the annotations the job controller
//! stamps on every pod it creates. Everything downstream of [`PodRecord::new`]
//! works on the typed [`RoutingKey`] instead of the raw annotation map.

pub mod job_info;
pub mod pod;
pub mod routing;
pub mod snapshot;

pub use job_info::{JobInfo, JobSpecInfo, TaskBucket};
pub use pod::{PodPhase, PodRecord};
pub use routing::{JobKey, RoutingKey, JOB_NAME_KEY, JOB_VERSION_KEY, TASK_SPEC_KEY};
pub use snapshot::{JobSnapshot, PhaseCounts, TaskSnapshot};

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::{JOB_NAME_KEY, JOB_VERSION_KEY, TASK_SPEC_KEY};

    /// Builds a pod the way the job controller would create it.
    pub fn job_pod(name: &str, job: &str, version: u32, task: &str, phase: &str) -> Pod {
        let mut annotations = BTreeMap::new();
        annotations.insert(JOB_NAME_KEY.to_string(), job.to_string());
        annotations.insert(JOB_VERSION_KEY.to_string(), version.to_string());
        annotations.insert(TASK_SPEC_KEY.to_string(), task.to_string());

        Pod {
            metadata: ObjectMeta {
                uid: Some(format!("test-{}", name)),
                name: Some(name.to_string()),
                namespace: Some("test".to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "nginx".to_string(),
                    image: Some("nginx:latest".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        }
    }

    pub fn without_annotation(mut pod: Pod, key: &str) -> Pod {
        if let Some(annotations) = pod.metadata.annotations.as_mut() {
            annotations.remove(key);
        }
        pod
    }
}
