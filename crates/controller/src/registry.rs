use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::{
    apis::{JobInfo, JobKey, JobSnapshot, JobSpecInfo, PodRecord},
    metrics, Error, Result,
};

/// Shared handle to one job's bookkeeping.
pub type JobEntry = Arc<Mutex<JobInfo>>;

/// Result of applying a pod snapshot whose add/update nature is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Added,
    Updated,
}

/// Maps job identities to their [`JobInfo`].
///
/// The map lock only guards membership. Every entry carries its own mutex, so
/// mutating one job never waits on another. Lock order is always map first,
/// then entry; no entry lock is held while the map lock is requested.
#[derive(Default)]
pub struct JobInfoRegistry {
    jobs: RwLock<HashMap<JobKey, JobEntry>>,
}

impl JobInfoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &JobKey) -> Option<JobEntry> {
        self.jobs.read().await.get(key).cloned()
    }

    pub async fn get_or_create(&self, key: &JobKey) -> JobEntry {
        if let Some(entry) = self.get(key).await {
            return entry;
        }

        let mut jobs = self.jobs.write().await;
        let entry = jobs
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("Tracking new job {}", key);
                Arc::new(Mutex::new(JobInfo::new(key.clone())))
            })
            .clone();
        metrics::TRACKED_JOBS.set(jobs.len() as i64);
        entry
    }

    pub async fn contains(&self, key: &JobKey) -> bool {
        self.jobs.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Tracked job identities, sorted.
    pub async fn keys(&self) -> Vec<JobKey> {
        let mut keys: Vec<JobKey> = self.jobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Locks the live entry for `key`, creating it if needed.
    async fn lock_live(&self, key: &JobKey) -> OwnedMutexGuard<JobInfo> {
        loop {
            let guard = self.get_or_create(key).await.lock_owned().await;
            if !guard.is_evicted() {
                return guard;
            }
        }
    }

    /// Locks the live entry for `key` if the job is tracked.
    async fn lock_existing(&self, key: &JobKey) -> Option<OwnedMutexGuard<JobInfo>> {
        loop {
            let guard = self.get(key).await?.lock_owned().await;
            if !guard.is_evicted() {
                return Some(guard);
            }
        }
    }

    pub async fn add_pod(&self, record: PodRecord) -> Result<()> {
        let mut info = self.lock_live(&record.key().job_key()).await;
        info.add_pod(record)
    }

    pub async fn update_pod(&self, record: PodRecord) -> Result<()> {
        match self.lock_existing(&record.key().job_key()).await {
            Some(mut info) => info.update_pod(record),
            None => Err(Error::PodNotFound {
                job: record.key().job_key().to_string(),
                task: record.task_name().to_string(),
                pod: record.name().to_string(),
            }),
        }
    }

    /// Adds the pod, or replaces its record if already tracked, under a
    /// single hold of the entry lock.
    pub async fn apply_pod(&self, record: PodRecord) -> Result<Applied> {
        let mut info = self.lock_live(&record.key().job_key()).await;
        if info.contains_pod(record.task_name(), record.name()) {
            info.update_pod(record)?;
            Ok(Applied::Updated)
        } else {
            info.add_pod(record)?;
            Ok(Applied::Added)
        }
    }

    /// Removes the pod and reaps the job entry if it was the last pod of a
    /// deleted job, or of a job whose spec was never seen. Untracked pods and
    /// jobs are a no-op.
    pub async fn delete_pod(&self, record: &PodRecord) -> Result<Option<PodRecord>> {
        let key = record.key().job_key();
        let Some(mut info) = self.lock_existing(&key).await else {
            return Ok(None);
        };
        let removed = info.delete_pod(record)?;
        let reapable = info.is_reapable();
        drop(info);

        if reapable {
            self.reap(&key).await;
        }
        Ok(removed)
    }

    /// Stores the latest job spec and offers its version.
    pub async fn refresh_job(&self, key: &JobKey, spec: JobSpecInfo, version: u32) {
        let mut info = self.lock_live(key).await;
        info.set_spec(spec);
        if !info.accept_version(version) {
            debug!(
                "Ignoring version {} of job {}: already at version {}",
                version,
                key,
                info.version()
            );
        }
    }

    /// Marks the job as deleted. The entry is dropped now if no pods remain,
    /// otherwise when its last pod is deleted. Returns true if dropped now.
    pub async fn job_deleted(&self, key: &JobKey) -> bool {
        let Some(mut info) = self.lock_existing(key).await else {
            return false;
        };
        info.mark_deleted();
        let reapable = info.is_reapable();
        drop(info);

        if reapable {
            self.reap(key).await
        } else {
            debug!("Job {} deleted, waiting for its pods to go", key);
            false
        }
    }

    async fn reap(&self, key: &JobKey) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(entry) = jobs.get(key).cloned() else {
            return false;
        };
        let mut info = entry.lock().await;
        if !info.is_reapable() {
            return false;
        }
        info.evict();
        jobs.remove(key);
        metrics::TRACKED_JOBS.set(jobs.len() as i64);
        info!("Removed job {} from registry", key);
        true
    }

    /// Consistent view of one job, or `None` if it is not tracked.
    pub async fn snapshot(&self, key: &JobKey) -> Option<JobSnapshot> {
        let info = self.lock_existing(key).await?;
        Some(info.snapshot())
    }

    /// Snapshots of all tracked jobs, sorted by identity. Each snapshot is
    /// consistent on its own; they are not taken at one shared instant.
    pub async fn snapshots(&self) -> Vec<JobSnapshot> {
        let mut snapshots = Vec::new();
        for key in self.keys().await {
            if let Some(snapshot) = self.snapshot(&key).await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Records of every tracked pod across all jobs.
    pub async fn tracked_pods(&self) -> Vec<PodRecord> {
        let entries: Vec<JobEntry> = self.jobs.read().await.values().cloned().collect();

        let mut records = Vec::new();
        for entry in entries {
            let info = entry.lock().await;
            if info.is_evicted() {
                continue;
            }
            for (_, task) in info.tasks() {
                records.extend(task.iter().cloned());
            }
        }
        records
    }
}
