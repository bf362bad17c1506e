use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use super::pod::PodRecord;
use super::routing::JobKey;
use super::snapshot::{JobSnapshot, PhaseCounts, TaskSnapshot};
use crate::{Error, Result};

/// The parts of the job spec the bookkeeping needs, as last seen from the
/// job controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSpecInfo {
    pub queue: Option<String>,
    pub min_available: i32,
    /// Replica target per task name.
    pub replicas: BTreeMap<String, i32>,
}

/// Pods currently believed to belong to one task of one job, keyed by pod
/// name.
#[derive(Debug, Clone, Default)]
pub struct TaskBucket {
    pods: HashMap<String, PodRecord>,
}

impl TaskBucket {
    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    pub fn contains(&self, pod_name: &str) -> bool {
        self.pods.contains_key(pod_name)
    }

    pub fn get(&self, pod_name: &str) -> Option<&PodRecord> {
        self.pods.get(pod_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PodRecord> {
        self.pods.values()
    }

    fn insert(&mut self, record: PodRecord) -> Option<PodRecord> {
        self.pods.insert(record.name().to_string(), record)
    }

    fn remove(&mut self, pod_name: &str) -> Option<PodRecord> {
        self.pods.remove(pod_name)
    }

    fn snapshot(&self, name: &str, replicas: Option<i32>, version: u32) -> TaskSnapshot {
        let mut counts = PhaseCounts::default();
        let mut stale_pods = 0;
        for record in self.pods.values() {
            if record.job_version() < version {
                stale_pods += 1;
            } else {
                counts.record(record.phase());
            }
        }

        let mut pods: Vec<PodRecord> = self.pods.values().cloned().collect();
        pods.sort_by(|a, b| a.name().cmp(b.name()));

        TaskSnapshot {
            name: name.to_string(),
            replicas,
            counts,
            stale_pods,
            pods,
        }
    }
}

/// Pod inventory of a single job, grouped by task.
///
/// `JobInfo` itself is not synchronised; the registry wraps every instance in
/// its own mutex so each mutation and snapshot is atomic.
#[derive(Debug)]
pub struct JobInfo {
    key: JobKey,
    spec: Option<JobSpecInfo>,
    version: u32,
    deleted: bool,
    evicted: bool,
    tasks: HashMap<String, TaskBucket>,
}

impl JobInfo {
    pub fn new(key: JobKey) -> Self {
        Self {
            key,
            spec: None,
            version: 0,
            deleted: false,
            evicted: false,
            tasks: HashMap::new(),
        }
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn spec(&self) -> Option<&JobSpecInfo> {
        self.spec.as_ref()
    }

    /// Highest job version accepted so far.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Replaces the job spec. A job recreated under the same identity is live
    /// again, so this also clears the deleted mark.
    pub fn set_spec(&mut self, spec: JobSpecInfo) {
        self.spec = Some(spec);
        self.deleted = false;
    }

    /// Accepts `version` if it is not older than the current one.
    pub fn accept_version(&mut self, version: u32) -> bool {
        if version < self.version {
            return false;
        }
        self.version = version;
        true
    }

    pub fn task(&self, name: &str) -> Option<&TaskBucket> {
        self.tasks.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = (&String, &TaskBucket)> {
        self.tasks.iter()
    }

    pub fn contains_pod(&self, task: &str, pod_name: &str) -> bool {
        self.tasks.get(task).is_some_and(|t| t.contains(pod_name))
    }

    pub fn get_pod(&self, task: &str, pod_name: &str) -> Option<&PodRecord> {
        self.tasks.get(task)?.get(pod_name)
    }

    pub fn pod_count(&self) -> usize {
        self.tasks.values().map(TaskBucket::len).sum()
    }

    /// Registers a newly observed pod.
    ///
    /// Fails with [`Error::DuplicatePod`] if the task already holds a pod with
    /// the same name; existing state is left untouched in that case.
    pub fn add_pod(&mut self, record: PodRecord) -> Result<()> {
        self.check_owner(&record)?;

        if self.contains_pod(record.task_name(), record.name()) {
            return Err(Error::DuplicatePod {
                job: self.key.to_string(),
                task: record.task_name().to_string(),
                pod: record.name().to_string(),
            });
        }

        let version = record.job_version();
        self.tasks
            .entry(record.task_name().to_string())
            .or_default()
            .insert(record);
        self.accept_version(version);

        Ok(())
    }

    /// Replaces the record of an already tracked pod with a fresher snapshot.
    ///
    /// Updating a pod that is not tracked fails with [`Error::PodNotFound`];
    /// it is never turned into an implicit add.
    pub fn update_pod(&mut self, record: PodRecord) -> Result<()> {
        self.check_owner(&record)?;

        let version = record.job_version();
        match self.tasks.get_mut(record.task_name()) {
            Some(task) if task.contains(record.name()) => {
                task.insert(record);
            }
            _ => {
                return Err(Error::PodNotFound {
                    job: self.key.to_string(),
                    task: record.task_name().to_string(),
                    pod: record.name().to_string(),
                });
            }
        }
        self.accept_version(version);

        Ok(())
    }

    /// Removes a tracked pod and returns its last record.
    ///
    /// Deleting an untracked pod is a no-op returning `Ok(None)`. Buckets that
    /// become empty are pruned.
    pub fn delete_pod(&mut self, record: &PodRecord) -> Result<Option<PodRecord>> {
        self.check_owner(record)?;

        let Some(task) = self.tasks.get_mut(record.task_name()) else {
            return Ok(None);
        };
        let removed = task.remove(record.name());
        if task.is_empty() {
            self.tasks.remove(record.task_name());
        }

        Ok(removed)
    }

    /// Pods whose job version is older than the accepted one.
    pub fn stale_pods(&self) -> Vec<&PodRecord> {
        self.tasks
            .values()
            .flat_map(TaskBucket::iter)
            .filter(|r| r.job_version() < self.version)
            .collect()
    }

    pub fn is_version_consistent(&self) -> bool {
        self.tasks
            .values()
            .flat_map(TaskBucket::iter)
            .all(|r| r.job_version() >= self.version)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let mut names: BTreeSet<&str> = self.tasks.keys().map(String::as_str).collect();
        if let Some(spec) = &self.spec {
            names.extend(spec.replicas.keys().map(String::as_str));
        }

        let empty = TaskBucket::default();
        let tasks: Vec<TaskSnapshot> = names
            .into_iter()
            .map(|name| {
                let replicas = self
                    .spec
                    .as_ref()
                    .and_then(|s| s.replicas.get(name).copied());
                self.tasks
                    .get(name)
                    .unwrap_or(&empty)
                    .snapshot(name, replicas, self.version)
            })
            .collect();

        let mut counts = PhaseCounts::default();
        let mut stale_pods = 0;
        for task in &tasks {
            counts.merge(&task.counts);
            stale_pods += task.stale_pods;
        }

        JobSnapshot {
            namespace: self.key.namespace.clone(),
            name: self.key.name.clone(),
            queue: self.spec.as_ref().and_then(|s| s.queue.clone()),
            min_available: self.spec.as_ref().map(|s| s.min_available),
            version: self.version,
            tasks,
            counts,
            stale_pods,
        }
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// No pods remain and nothing else keeps the entry alive: the owning job
    /// is gone, or no job spec was ever seen for it.
    pub fn is_reapable(&self) -> bool {
        self.tasks.is_empty() && (self.deleted || self.spec.is_none())
    }

    /// Set once the registry has dropped this entry; holders of a stale
    /// handle must look the job up again.
    pub(crate) fn evict(&mut self) {
        self.evicted = true;
    }

    pub(crate) fn is_evicted(&self) -> bool {
        self.evicted
    }

    fn check_owner(&self, record: &PodRecord) -> Result<()> {
        let key = record.key();
        if key.namespace != self.key.namespace || key.job_name != self.key.name {
            return Err(Error::JobMismatch {
                expected: self.key.to_string(),
                found: key.job_key().to_string(),
                pod: record.name().to_string(),
            });
        }
        Ok(())
    }
}
