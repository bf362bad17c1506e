use std::collections::HashSet;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, info, warn};

use crate::{
    apis::{JobKey, PodRecord},
    metrics,
    registry::{Applied, JobInfoRegistry},
    Result,
};

/// A pod lifecycle notification.
///
/// `Applied` is what a watch delivers when it cannot tell a new pod from a
/// changed one; the other variants carry an explicit intent.
#[derive(Debug, Clone)]
pub enum PodEvent {
    Added(Pod),
    Updated(Pod),
    Applied(Pod),
    Deleted(Pod),
}

impl PodEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PodEvent::Added(_) => "added",
            PodEvent::Updated(_) => "updated",
            PodEvent::Applied(_) => "applied",
            PodEvent::Deleted(_) => "deleted",
        }
    }

    pub fn pod(&self) -> &Pod {
        match self {
            PodEvent::Added(pod)
            | PodEvent::Updated(pod)
            | PodEvent::Applied(pod)
            | PodEvent::Deleted(pod) => pod,
        }
    }
}

#[derive(Clone, Copy)]
enum Intent {
    Add,
    Update,
    Apply,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The pod is not managed by this controller.
    Ignored,
    Added,
    Updated,
    Deleted,
    /// A delete for a pod that was never tracked.
    Untracked,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Ignored => "ignored",
            DispatchOutcome::Added => "added",
            DispatchOutcome::Updated => "updated",
            DispatchOutcome::Deleted => "deleted",
            DispatchOutcome::Untracked => "untracked",
        }
    }
}

impl From<Applied> for DispatchOutcome {
    fn from(applied: Applied) -> Self {
        match applied {
            Applied::Added => DispatchOutcome::Added,
            Applied::Updated => DispatchOutcome::Updated,
        }
    }
}

/// Routes pod events into the registry.
pub struct EventDispatcher {
    registry: Arc<JobInfoRegistry>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<JobInfoRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<JobInfoRegistry> {
        &self.registry
    }

    /// Applies one event and reports what happened. Duplicate adds and
    /// updates of untracked pods come back as errors.
    pub async fn dispatch(&self, event: PodEvent) -> Result<DispatchOutcome> {
        let kind = event.kind();
        let (intent, pod) = match event {
            PodEvent::Added(pod) => (Intent::Add, pod),
            PodEvent::Updated(pod) => (Intent::Update, pod),
            PodEvent::Applied(pod) => (Intent::Apply, pod),
            PodEvent::Deleted(pod) => (Intent::Delete, pod),
        };
        let Some(record) = PodRecord::new(pod) else {
            debug!("Ignoring {} event for unmanaged pod", kind);
            return Ok(DispatchOutcome::Ignored);
        };

        let outcome = match intent {
            Intent::Add => {
                self.registry.add_pod(record).await?;
                DispatchOutcome::Added
            }
            Intent::Update => {
                self.registry.update_pod(record).await?;
                DispatchOutcome::Updated
            }
            Intent::Apply => self.registry.apply_pod(record).await?.into(),
            Intent::Delete => match self.registry.delete_pod(&record).await? {
                Some(_) => DispatchOutcome::Deleted,
                None => DispatchOutcome::Untracked,
            },
        };

        match outcome {
            DispatchOutcome::Added => metrics::TRACKED_PODS.inc(),
            DispatchOutcome::Deleted => metrics::TRACKED_PODS.dec(),
            _ => {}
        }
        Ok(outcome)
    }

    /// Dispatches an event on behalf of a watch loop: errors are logged and
    /// counted, never propagated.
    pub async fn handle(&self, event: PodEvent) {
        let kind = event.kind();
        let pod_name = event.pod().metadata.name.clone().unwrap_or_default();

        match self.dispatch(event).await {
            Ok(outcome) => {
                metrics::POD_EVENTS_TOTAL
                    .with_label_values(&[kind, outcome.as_str()])
                    .inc();
                debug!("Pod {} {}: {}", pod_name, kind, outcome.as_str());
            }
            Err(e) => {
                metrics::POD_EVENTS_TOTAL
                    .with_label_values(&[kind, "error"])
                    .inc();
                warn!("Dropping {} event for pod {}: {}", kind, pod_name, e);
            }
        }
    }

    /// Reconciles the registry with a full pod listing, as delivered when a
    /// watch restarts. Tracked records missing from the listing are deleted,
    /// listed pods are applied. A pod listed under another job or task than
    /// the one it is tracked in counts as missing from its old place. Returns
    /// the number of records deleted.
    pub async fn resync(&self, pods: Vec<Pod>) -> usize {
        let records: Vec<PodRecord> = pods.into_iter().filter_map(PodRecord::new).collect();
        let live: HashSet<(JobKey, String, String)> = records.iter().map(placement).collect();

        let mut removed = 0;
        for tracked in self.registry.tracked_pods().await {
            if live.contains(&placement(&tracked)) {
                continue;
            }
            match self.registry.delete_pod(&tracked).await {
                Ok(Some(_)) => {
                    metrics::TRACKED_PODS.dec();
                    removed += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to drop vanished pod {}: {}", tracked.name(), e),
            }
        }

        let listed = records.len();
        for record in records {
            let name = record.name().to_string();
            match self.registry.apply_pod(record).await {
                Ok(Applied::Added) => metrics::TRACKED_PODS.inc(),
                Ok(Applied::Updated) => {}
                Err(e) => warn!("Failed to apply pod {} during resync: {}", name, e),
            }
        }

        info!("Resynced {} managed pods, dropped {} vanished", listed, removed);
        removed
    }
}

/// Where a record lives in the registry: job, task and pod name.
fn placement(record: &PodRecord) -> (JobKey, String, String) {
    (
        record.key().job_key(),
        record.task_name().to_string(),
        record.name().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::testing::{job_pod, without_annotation};
    use crate::apis::{JobKey, PodPhase, TASK_SPEC_KEY};
    use crate::Error;

    fn dispatcher() -> EventDispatcher {
        EventDispatcher::new(Arc::new(JobInfoRegistry::new()))
    }

    #[tokio::test]
    async fn unmanaged_pods_are_ignored() {
        let dispatcher = dispatcher();
        let pod = without_annotation(job_pod("pod1", "job1", 0, "task1", "Running"), TASK_SPEC_KEY);

        for event in [
            PodEvent::Added(pod.clone()),
            PodEvent::Updated(pod.clone()),
            PodEvent::Applied(pod.clone()),
            PodEvent::Deleted(pod.clone()),
        ] {
            assert_eq!(dispatcher.dispatch(event).await.unwrap(), DispatchOutcome::Ignored);
        }
        assert!(dispatcher.registry().is_empty().await);
    }

    #[tokio::test]
    async fn add_update_delete_sequence() {
        let dispatcher = dispatcher();
        let key = JobKey::new("test", "job1");

        let added = dispatcher
            .dispatch(PodEvent::Added(job_pod("pod1", "job1", 0, "task1", "Running")))
            .await
            .unwrap();
        assert_eq!(added, DispatchOutcome::Added);

        let updated = dispatcher
            .dispatch(PodEvent::Updated(job_pod("pod1", "job1", 0, "task1", "Succeeded")))
            .await
            .unwrap();
        assert_eq!(updated, DispatchOutcome::Updated);
        let snapshot = dispatcher.registry().snapshot(&key).await.unwrap();
        assert_eq!(snapshot.pod("task1", "pod1").unwrap().phase(), PodPhase::Succeeded);

        let deleted = dispatcher
            .dispatch(PodEvent::Deleted(job_pod("pod1", "job1", 0, "task1", "Succeeded")))
            .await
            .unwrap();
        assert_eq!(deleted, DispatchOutcome::Deleted);

        let replayed = dispatcher
            .dispatch(PodEvent::Deleted(job_pod("pod1", "job1", 0, "task1", "Succeeded")))
            .await
            .unwrap();
        assert_eq!(replayed, DispatchOutcome::Untracked);
    }

    #[tokio::test]
    async fn duplicate_add_surfaces_as_error() {
        let dispatcher = dispatcher();
        let pod = job_pod("pod1", "job1", 0, "task1", "Running");
        dispatcher.dispatch(PodEvent::Added(pod.clone())).await.unwrap();

        let err = dispatcher.dispatch(PodEvent::Added(pod.clone())).await.unwrap_err();
        assert!(matches!(err, Error::DuplicatePod { .. }));

        // The watch path only logs it.
        dispatcher.handle(PodEvent::Added(pod)).await;
        let snapshot = dispatcher
            .registry()
            .snapshot(&JobKey::new("test", "job1"))
            .await
            .unwrap();
        assert_eq!(snapshot.pod_count(), 1);
    }

    #[tokio::test]
    async fn resync_drops_vanished_pods() {
        let dispatcher = dispatcher();
        for name in ["pod1", "pod2"] {
            dispatcher
                .dispatch(PodEvent::Added(job_pod(name, "job1", 0, "task1", "Running")))
                .await
                .unwrap();
        }

        let removed = dispatcher
            .resync(vec![
                job_pod("pod2", "job1", 0, "task1", "Succeeded"),
                job_pod("pod3", "job1", 0, "task1", "Pending"),
            ])
            .await;
        assert_eq!(removed, 1);

        let snapshot = dispatcher
            .registry()
            .snapshot(&JobKey::new("test", "job1"))
            .await
            .unwrap();
        let task = snapshot.task("task1").unwrap();
        let names: Vec<&str> = task.pods.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["pod2", "pod3"]);
        assert_eq!(snapshot.pod("task1", "pod2").unwrap().phase(), PodPhase::Succeeded);
    }

    #[tokio::test]
    async fn resync_moves_a_pod_listed_under_another_task() {
        let dispatcher = dispatcher();
        let key = JobKey::new("test", "job1");
        dispatcher
            .dispatch(PodEvent::Added(job_pod("pod1", "job1", 0, "task1", "Running")))
            .await
            .unwrap();

        let removed = dispatcher
            .resync(vec![job_pod("pod1", "job1", 0, "task2", "Running")])
            .await;
        assert_eq!(removed, 1);

        let snapshot = dispatcher.registry().snapshot(&key).await.unwrap();
        assert_eq!(snapshot.pod_count(), 1);
        assert_eq!(snapshot.counts.running, 1);
        assert!(snapshot.pod("task1", "pod1").is_none());
        assert!(snapshot.pod("task2", "pod1").is_some());
    }

    #[tokio::test]
    async fn resync_keeps_a_pod_listed_in_place() {
        let dispatcher = dispatcher();
        dispatcher
            .dispatch(PodEvent::Added(job_pod("pod1", "job1", 0, "task1", "Pending")))
            .await
            .unwrap();

        let removed = dispatcher
            .resync(vec![job_pod("pod1", "job1", 0, "task1", "Running")])
            .await;
        assert_eq!(removed, 0);

        let snapshot = dispatcher
            .registry()
            .snapshot(&JobKey::new("test", "job1"))
            .await
            .unwrap();
        assert_eq!(snapshot.pod("task1", "pod1").unwrap().phase(), PodPhase::Running);
    }
}
