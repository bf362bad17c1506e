use std::fmt;

use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

use super::routing::RoutingKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodPhase::Pending => write!(f, "Pending"),
            PodPhase::Running => write!(f, "Running"),
            PodPhase::Succeeded => write!(f, "Succeeded"),
            PodPhase::Failed => write!(f, "Failed"),
            PodPhase::Unknown => write!(f, "Unknown"),
        }
    }
}

impl From<&str> for PodPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl PodPhase {
    /// A pod the API server has not reported a status for yet is pending.
    pub fn of(pod: &Pod) -> Self {
        pod.status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .map(PodPhase::from)
            .unwrap_or(PodPhase::Pending)
    }
}

/// Snapshot of one pod as of a single watch event.
///
/// Records are never patched in place: an update replaces the whole record,
/// so the phase and the verbatim pod always come from the same event.
#[derive(Debug, Clone, Serialize)]
pub struct PodRecord {
    name: String,
    key: RoutingKey,
    phase: PodPhase,
    pod: Pod,
}

impl PodRecord {
    /// Returns `None` for pods this controller does not manage.
    pub fn new(pod: Pod) -> Option<Self> {
        let key = RoutingKey::from_pod(&pod)?;
        let name = pod.metadata.name.clone().filter(|n| !n.is_empty())?;
        let phase = PodPhase::of(&pod);

        Some(Self {
            name,
            key,
            phase,
            pod,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn key(&self) -> &RoutingKey {
        &self.key
    }

    pub fn task_name(&self) -> &str {
        &self.key.task_name
    }

    pub fn job_version(&self) -> u32 {
        self.key.job_version
    }

    pub fn phase(&self) -> PodPhase {
        self.phase
    }

    /// The pod object exactly as it was received.
    pub fn pod(&self) -> &Pod {
        &self.pod
    }

    pub fn into_pod(self) -> Pod {
        self.pod
    }
}
