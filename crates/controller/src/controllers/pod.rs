use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::Api,
    runtime::{watcher, WatchStreamExt},
    Client,
};
use tracing::{error, info};

use crate::dispatcher::{EventDispatcher, PodEvent};

/// Feeds pod watch events into the dispatcher.
pub struct PodController {
    client: Client,
    namespace: Option<String>,
    dispatcher: Arc<EventDispatcher>,
}

impl PodController {
    pub fn new(client: Client, namespace: Option<String>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            client,
            namespace,
            dispatcher,
        }
    }

    pub async fn run(self: Arc<Self>) {
        info!(
            "Starting Pod controller in {}",
            self.namespace.as_deref().unwrap_or("all namespaces")
        );

        let pods: Api<Pod> = match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };

        let mut events = watcher(pods, watcher::Config::default())
            .default_backoff()
            .boxed();

        while let Some(event) = events.next().await {
            match event {
                Ok(watcher::Event::Applied(pod)) => {
                    self.dispatcher.handle(PodEvent::Applied(pod)).await
                }
                Ok(watcher::Event::Deleted(pod)) => {
                    self.dispatcher.handle(PodEvent::Deleted(pod)).await
                }
                Ok(watcher::Event::Restarted(pods)) => {
                    self.dispatcher.resync(pods).await;
                }
                Err(e) => error!("Pod watch error: {}", e),
            }
        }
    }
}
