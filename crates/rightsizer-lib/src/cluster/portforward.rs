//! Local port-forward to an in-cluster service
//!
//! Used when no external Prometheus URL is configured: the CLI opens a
//! tunnel to the Prometheus service and points the metrics source at
//! the local end. Dropping the guard tears the tunnel down.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, ListParams};
use kube::Client;
use tokio::io::copy_bidirectional;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::inspector::label_selector;

/// Running port-forward; the tunnel lives as long as this value
pub struct PortForward {
    local_port: u16,
    handle: JoinHandle<()>,
}

impl PortForward {
    /// Forward `127.0.0.1:port` to the given service's port
    ///
    /// Picks a Running pod behind the service's selector. Each incoming
    /// connection gets its own forwarding stream.
    pub async fn start(client: Client, namespace: &str, service: &str, port: u16) -> Result<Self> {
        if port == 0 {
            anyhow::bail!("port-forward target port must be non-zero");
        }
        let services: Api<Service> = Api::namespaced(client.clone(), namespace);
        let service_obj = services.get(service).await.with_context(|| {
            format!("fetching service '{}' in namespace '{}'", service, namespace)
        })?;
        let selector = service_obj
            .spec
            .and_then(|spec| spec.selector)
            .filter(|labels| !labels.is_empty())
            .with_context(|| format!("service '{}' has no selector", service))?;

        let pods: Api<Pod> = Api::namespaced(client, namespace);
        let selected = pods
            .list(&ListParams::default().labels(&label_selector(&selector)))
            .await
            .with_context(|| format!("listing pods behind service '{}'", service))?;
        let pod_name = selected
            .items
            .iter()
            .find(|pod| {
                pod.status
                    .as_ref()
                    .and_then(|status| status.phase.as_deref())
                    == Some("Running")
            })
            .and_then(|pod| pod.metadata.name.clone())
            .with_context(|| format!("no running pod behind service '{}'", service))?;

        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind 127.0.0.1:{}", port))?;
        let local_port = listener
            .local_addr()
            .context("Failed to read local address")?
            .port();
        debug!(pod = %pod_name, local_port = local_port, remote_port = port, "port-forward started");

        let handle = tokio::spawn(forward_connections(listener, pods, pod_name, port));

        Ok(Self { local_port, handle })
    }

    /// Base URL of the local end of the tunnel
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.local_port)
    }
}

impl Drop for PortForward {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn forward_connections(listener: TcpListener, pods: Api<Pod>, pod_name: String, port: u16) {
    loop {
        let connection = match listener.accept().await {
            Ok((connection, _addr)) => connection,
            Err(err) => {
                warn!(error = %err, "port-forward accept failed");
                continue;
            }
        };
        let pods = pods.clone();
        let pod_name = pod_name.clone();
        tokio::spawn(async move {
            if let Err(err) = forward_one(connection, pods, &pod_name, port).await {
                warn!(pod = %pod_name, error = %err, "port-forward connection failed");
            }
        });
    }
}

async fn forward_one(
    mut connection: TcpStream,
    pods: Api<Pod>,
    pod_name: &str,
    port: u16,
) -> Result<()> {
    let mut forwarder = pods
        .portforward(pod_name, &[port])
        .await
        .context("Failed to open port-forward")?;
    let mut upstream = forwarder
        .take_stream(port)
        .context("port-forward stream unavailable")?;
    copy_bidirectional(&mut connection, &mut upstream)
        .await
        .context("port-forward stream closed with error")?;
    Ok(())
}
