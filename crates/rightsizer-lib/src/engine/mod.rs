//! Recommendation engine for deployment resources
//!
//! The engine consumes two abstract collaborators (a deployment
//! inspector and a metrics source) and turns percentile samples plus
//! a best-effort OOM-kill signal into floor-clamped CPU/memory
//! recommendations, one container at a time.

mod recommender;

pub use recommender::{Recommender, RecommenderConfig};

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Resolved view of a deployment's pod template
#[derive(Debug, Clone, Default)]
pub struct DeploymentView {
    pub namespace: String,
    pub name: String,
    /// Pod label selector (match labels) for locating this deployment's pods
    pub selector: BTreeMap<String, String>,
    /// Main container names in declaration order
    pub containers: Vec<String>,
    /// Init container names in declaration order
    pub init_containers: Vec<String>,
}

/// Best-effort OOM-kill signal for one container
#[derive(Debug, Clone, Default)]
pub struct OomSignal {
    pub was_killed: bool,
    /// Offending pod, informational only
    pub pod_name: Option<String>,
    /// Memory limit configured on the killed container, when recorded
    pub last_limit_bytes: Option<u64>,
}

/// Identifies one container's series for metric queries
#[derive(Debug, Clone, Copy)]
pub struct MetricTarget<'a> {
    pub namespace: &'a str,
    pub deployment: &'a str,
    pub container: &'a str,
    /// Prometheus range expression, e.g. "7d"
    pub range: &'a str,
}

/// Resolves deployments and reports OOM-kill signals
#[async_trait]
pub trait DeploymentInspector: Send + Sync {
    /// Fetch the deployment and extract its container lists and selector
    ///
    /// Errors here are fatal to the whole analysis.
    async fn resolve(&self, namespace: &str, name: &str) -> Result<DeploymentView>;

    /// Check whether the container was recently OOM-killed
    ///
    /// Best effort: callers treat an error as "no signal".
    async fn oom_signal(&self, deployment: &DeploymentView, container: &str) -> Result<OomSignal>;
}

/// Resolves utilization values for one container over a window
///
/// Implementations return 0.0 when no series exists; errors are
/// reserved for transport and query failures.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// CPU usage percentile, in cores
    async fn cpu_percentile(&self, p: f64, target: MetricTarget<'_>) -> Result<f64>;

    /// Working-set memory percentile, in bytes
    async fn memory_percentile(&self, p: f64, target: MetricTarget<'_>) -> Result<f64>;

    /// Maximum observed memory over the window, in bytes
    async fn memory_max(&self, target: MetricTarget<'_>) -> Result<f64>;
}
