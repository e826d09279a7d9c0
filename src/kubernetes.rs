use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ContainerStatus, Event, Pod};
use kube::{
    api::{ListParams, LogParams},
    Api, Client,
};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::{ContainerSnapshot, PodEvent, PodSnapshot};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to list pods in {scope}: {source}")]
    List {
        scope: String,
        #[source]
        source: kube::Error,
    },
    #[error("timed out listing pods after {0:?}")]
    Timeout(Duration),
}

/// Source of the pod list for one triage run.
#[async_trait]
pub trait PodSource: Send + Sync {
    async fn list_all_pods(&self) -> Result<Vec<PodSnapshot>, FetchError>;
}

/// Per-pod diagnostic context. Callers treat errors as "no data".
#[async_trait]
pub trait DiagnosticsSource: Send + Sync {
    async fn get_events(&self, namespace: &str, name: &str) -> Result<Vec<PodEvent>>;
    async fn get_logs(&self, namespace: &str, name: &str) -> Result<String>;
}

/// Both cluster collaborators backed by a live API server.
pub struct KubeCluster {
    client: Client,
    namespaces: Vec<String>,
    log_tail_lines: i64,
}

impl KubeCluster {
    /// An empty `namespaces` list means cluster-wide.
    pub fn new(client: Client, namespaces: Vec<String>, log_tail_lines: i64) -> Self {
        Self {
            client,
            namespaces,
            log_tail_lines,
        }
    }

    async fn list_pods(&self, api: Api<Pod>, scope: &str) -> Result<Vec<Pod>, FetchError> {
        let pods = api
            .list(&ListParams::default())
            .await
            .map_err(|source| FetchError::List {
                scope: scope.to_string(),
                source,
            })?;
        debug!("Listed {} pods in {}", pods.items.len(), scope);
        Ok(pods.items)
    }
}

#[async_trait]
impl PodSource for KubeCluster {
    async fn list_all_pods(&self) -> Result<Vec<PodSnapshot>, FetchError> {
        let pods = if self.namespaces.is_empty() {
            self.list_pods(Api::all(self.client.clone()), "all namespaces").await?
        } else {
            let mut pods = Vec::new();
            for ns in &self.namespaces {
                let api: Api<Pod> = Api::namespaced(self.client.clone(), ns);
                pods.extend(self.list_pods(api, &format!("namespace {}", ns)).await?);
            }
            pods
        };
        Ok(pods.iter().filter_map(pod_snapshot).collect())
    }
}

#[async_trait]
impl DiagnosticsSource for KubeCluster {
    async fn get_events(&self, namespace: &str, name: &str) -> Result<Vec<PodEvent>> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let selector = format!("involvedObject.kind=Pod,involvedObject.name={}", name);
        let events = api.list(&ListParams::default().fields(&selector)).await?;
        let mut events: Vec<PodEvent> = events.items.iter().map(pod_event).collect();
        events.sort_by_key(|e| e.last_seen);
        Ok(events)
    }

    async fn get_logs(&self, namespace: &str, name: &str) -> Result<String> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            tail_lines: Some(self.log_tail_lines),
            ..LogParams::default()
        };
        Ok(api.logs(name, &params).await?)
    }
}

/// Pods without a name are skipped; a missing namespace or phase becomes
/// "default" / "Unknown".
pub fn pod_snapshot(pod: &Pod) -> Option<PodSnapshot> {
    let name = pod.metadata.name.clone()?;
    let namespace = pod
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string());
    let status = pod.status.as_ref();

    let phase = status
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let containers = status
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| statuses.iter().map(container_snapshot).collect())
        .unwrap_or_default();

    Some(PodSnapshot {
        name,
        namespace,
        phase,
        reason: status.and_then(|s| s.reason.clone()),
        message: status.and_then(|s| s.message.clone()),
        containers,
    })
}

fn container_snapshot(cs: &ContainerStatus) -> ContainerSnapshot {
    let waiting_reason = cs
        .state
        .as_ref()
        .and_then(|s| s.waiting.as_ref())
        .and_then(|w| w.reason.clone());
    let last_terminated_reason = cs
        .last_state
        .as_ref()
        .and_then(|s| s.terminated.as_ref())
        .and_then(|t| t.reason.clone());

    ContainerSnapshot {
        name: cs.name.clone(),
        waiting_reason,
        last_terminated_reason,
        restart_count: cs.restart_count,
    }
}

fn pod_event(event: &Event) -> PodEvent {
    let last_seen = event
        .last_timestamp
        .as_ref()
        .map(|t| t.0)
        .or_else(|| event.event_time.as_ref().map(|t| t.0));

    PodEvent {
        type_: event.type_.clone().unwrap_or_default(),
        reason: event.reason.clone().unwrap_or_default(),
        message: event.message.clone().unwrap_or_default(),
        count: event.count.unwrap_or(1),
        last_seen,
    }
}
