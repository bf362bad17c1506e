use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use kube::{
    api::Api,
    runtime::{watcher, WatchStreamExt},
    Client,
};
use tracing::{debug, error, info};

use crate::{
    apis::{JobKey, JobSpecInfo},
    crd::Job,
    registry::JobInfoRegistry,
};

/// Keeps job specs and versions in the registry current and retires entries
/// of deleted jobs.
pub struct JobController {
    client: Client,
    namespace: Option<String>,
    registry: Arc<JobInfoRegistry>,
}

impl JobController {
    pub fn new(client: Client, namespace: Option<String>, registry: Arc<JobInfoRegistry>) -> Self {
        Self {
            client,
            namespace,
            registry,
        }
    }

    pub async fn run(self: Arc<Self>) {
        info!("Starting Job controller");

        let jobs: Api<Job> = match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };

        let mut events = watcher(jobs, watcher::Config::default())
            .default_backoff()
            .boxed();

        while let Some(event) = events.next().await {
            match event {
                Ok(watcher::Event::Applied(job)) => self.refresh(&job).await,
                Ok(watcher::Event::Deleted(job)) => {
                    let key = job.key();
                    info!("Job {} deleted", key);
                    self.registry.job_deleted(&key).await;
                }
                Ok(watcher::Event::Restarted(jobs)) => self.resync(jobs).await,
                Err(e) => error!("Job watch error: {}", e),
            }
        }
    }

    async fn refresh(&self, job: &Job) {
        let key = job.key();
        debug!("Refreshing job {} at version {}", key, job.version());
        self.registry
            .refresh_job(&key, JobSpecInfo::from(&job.spec), job.version())
            .await;
    }

    /// Listed jobs are refreshed; tracked jobs missing from the listing are
    /// treated as deleted.
    async fn resync(&self, jobs: Vec<Job>) {
        let live: HashSet<JobKey> = jobs.iter().map(Job::key).collect();
        for job in &jobs {
            self.refresh(job).await;
        }

        for key in self.registry.keys().await {
            if !live.contains(&key) {
                debug!("Job {} no longer listed", key);
                self.registry.job_deleted(&key).await;
            }
        }
        info!("Resynced {} jobs", jobs.len());
    }
}
