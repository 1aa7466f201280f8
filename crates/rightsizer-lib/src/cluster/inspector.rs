//! Live deployment inspection against the Kubernetes API
//!
//! Resolves a deployment into the container lists the engine iterates,
//! and looks for OOMKilled events on the pods behind its selector.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Event, Pod};
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::warn;

use crate::engine::{DeploymentInspector, DeploymentView, OomSignal};
use crate::quantity::parse_memory_bytes;

/// Inspector backed by a live cluster connection
pub struct KubeInspector {
    client: Client,
}

impl KubeInspector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeploymentInspector for KubeInspector {
    async fn resolve(&self, namespace: &str, name: &str) -> Result<DeploymentView> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let deployment = deployments.get(name).await.with_context(|| {
            format!("fetching deployment '{}' in namespace '{}'", name, namespace)
        })?;

        let spec = deployment.spec.context("deployment has no spec")?;
        let pod_spec = spec
            .template
            .spec
            .context("deployment template has no pod spec")?;
        if pod_spec.containers.is_empty() {
            anyhow::bail!("deployment '{}' declares no containers", name);
        }

        Ok(DeploymentView {
            namespace: namespace.to_string(),
            name: name.to_string(),
            selector: spec.selector.match_labels.unwrap_or_default(),
            containers: pod_spec.containers.into_iter().map(|c| c.name).collect(),
            init_containers: pod_spec
                .init_containers
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.name)
                .collect(),
        })
    }

    /// Look for OOMKilled events on the deployment's pods
    ///
    /// Returns the first hit along with the memory limit the named
    /// container currently carries on that pod. Per-pod event lookup
    /// failures are logged and skipped; only the pod listing itself is
    /// a hard error.
    async fn oom_signal(&self, deployment: &DeploymentView, container: &str) -> Result<OomSignal> {
        if deployment.selector.is_empty() {
            anyhow::bail!(
                "deployment '{}' has no matchLabels selector to find pods by",
                deployment.name
            );
        }

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &deployment.namespace);
        let selected = pods
            .list(&ListParams::default().labels(&label_selector(&deployment.selector)))
            .await
            .with_context(|| format!("listing pods for deployment '{}'", deployment.name))?;

        let events: Api<Event> = Api::namespaced(self.client.clone(), &deployment.namespace);
        for pod in selected.items {
            let pod_name = match pod.metadata.name.as_deref() {
                Some(name) => name,
                None => continue,
            };
            let fields = format!(
                "involvedObject.kind=Pod,involvedObject.name={},reason=OOMKilled",
                pod_name
            );
            let oom_events = match events.list(&ListParams::default().fields(&fields)).await {
                Ok(list) => list,
                Err(err) => {
                    warn!(pod = %pod_name, error = %err, "could not list OOM events for pod");
                    continue;
                }
            };
            if oom_events.items.is_empty() {
                continue;
            }

            let last_limit_bytes = pod
                .spec
                .as_ref()
                .and_then(|spec| memory_limit_bytes(&spec.containers, container));
            return Ok(OomSignal {
                was_killed: true,
                pod_name: Some(pod_name.to_string()),
                last_limit_bytes,
            });
        }

        Ok(OomSignal::default())
    }
}

/// Equality-based label selector string, `key=value` pairs joined by commas
pub(super) fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Memory limit of the named container, if one is declared and parseable
fn memory_limit_bytes(containers: &[Container], name: &str) -> Option<u64> {
    let container = containers.iter().find(|c| c.name == name)?;
    let limits = container.resources.as_ref()?.limits.as_ref()?;
    let quantity = limits.get("memory")?;
    parse_memory_bytes(&quantity.0).ok()
}
