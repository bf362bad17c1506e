use serde::Serialize;

use super::pod::{PodPhase, PodRecord};

/// Pod counts per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounts {
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unknown: usize,
}

impl PhaseCounts {
    pub fn record(&mut self, phase: PodPhase) {
        match phase {
            PodPhase::Pending => self.pending += 1,
            PodPhase::Running => self.running += 1,
            PodPhase::Succeeded => self.succeeded += 1,
            PodPhase::Failed => self.failed += 1,
            PodPhase::Unknown => self.unknown += 1,
        }
    }

    pub fn merge(&mut self, other: &PhaseCounts) {
        self.pending += other.pending;
        self.running += other.running;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.unknown += other.unknown;
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.succeeded + self.failed + self.unknown
    }

    /// Pods holding, or having held to completion, a slot of the gang.
    pub fn occupied(&self) -> usize {
        self.running + self.succeeded
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub name: String,
    /// Replica target from the job spec, if the spec has been seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Counts over pods of the current job version only.
    pub counts: PhaseCounts,
    /// Pods left over from an older job version.
    #[serde(rename = "stalePods")]
    pub stale_pods: usize,
    /// Ordered by pod name.
    pub pods: Vec<PodRecord>,
}

/// Read-only view of a job taken at a single point in time.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub namespace: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(rename = "minAvailable", skip_serializing_if = "Option::is_none")]
    pub min_available: Option<i32>,
    pub version: u32,
    pub tasks: Vec<TaskSnapshot>,
    pub counts: PhaseCounts,
    #[serde(rename = "stalePods")]
    pub stale_pods: usize,
}

impl JobSnapshot {
    pub fn task(&self, name: &str) -> Option<&TaskSnapshot> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn pod(&self, task: &str, name: &str) -> Option<&PodRecord> {
        self.task(task)?.pods.iter().find(|p| p.name() == name)
    }

    pub fn pod_count(&self) -> usize {
        self.tasks.iter().map(|t| t.pods.len()).sum()
    }

    /// True when every tracked pod belongs to the accepted job version.
    pub fn is_version_consistent(&self) -> bool {
        self.stale_pods == 0
    }

    /// True once at least `minAvailable` current-version pods are running or
    /// done. Never true before the job spec has been seen.
    pub fn is_gang_ready(&self) -> bool {
        match self.min_available {
            Some(min) => self.counts.occupied() >= usize::try_from(min).unwrap_or(0),
            None => false,
        }
    }
}
