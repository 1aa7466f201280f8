//! Kubernetes plumbing
//!
//! Client bootstrap from a kubeconfig, the live [`DeploymentInspector`]
//! implementation, and a local port-forward for reaching an in-cluster
//! Prometheus.
//!
//! [`DeploymentInspector`]: crate::engine::DeploymentInspector

mod inspector;
mod portforward;

pub use inspector::KubeInspector;
pub use portforward::PortForward;

use std::path::Path;

use anyhow::{Context as _, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// Build a client from an explicit kubeconfig path or the ambient one
///
/// `context` selects a kubeconfig context by name; `None` keeps the
/// file's current context.
pub async fn client(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..KubeConfigOptions::default()
    };

    let config = match kubeconfig {
        Some(path) => {
            let file = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig at {}", path.display()))?;
            Config::from_custom_kubeconfig(file, &options)
                .await
                .context("Failed to load kubeconfig")?
        }
        None => Config::from_kubeconfig(&options)
            .await
            .context("Failed to load kubeconfig")?,
    };

    Client::try_from(config).context("Failed to build Kubernetes client")
}
