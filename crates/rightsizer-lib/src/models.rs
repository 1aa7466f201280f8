//! Core data models for deployment right-sizing

use serde::{Deserialize, Serialize};

/// CPU sizing for a single container, in millicores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuRecommendation {
    pub request_millicores: u32,
    pub limit_millicores: u32,
    /// Set when the p99/p50 ratio classified the workload as bursty
    pub spikiness_warning: bool,
}

/// Complete sizing recommendation for a single container
///
/// Memory carries a single value used for both request and limit.
/// Instances are immutable once produced and carry no timestamps, so
/// identical inputs always yield identical output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub memory_bytes: u64,
    pub cpu: CpuRecommendation,
    pub is_oom_killed: bool,
}

/// A recommendation tied to the container it was computed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRecommendation {
    pub container_name: String,
    pub recommendation: Recommendation,
}

/// Result set covering a deployment's main and init containers
///
/// Either list may be empty; emptiness is a valid outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllRecommendations {
    pub main_containers: Vec<NamedRecommendation>,
    pub init_containers: Vec<NamedRecommendation>,
}

impl AllRecommendations {
    pub fn is_empty(&self) -> bool {
        self.main_containers.is_empty() && self.init_containers.is_empty()
    }
}

/// Inputs for a single analysis run; never mutated by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub namespace: String,
    pub deployment: String,
    /// Restrict the analysis to one container by name
    pub container: Option<String>,
    /// Prometheus range expression, e.g. "7d"
    pub range: String,
}

impl AnalysisParams {
    pub fn new(namespace: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            deployment: deployment.into(),
            container: None,
            range: "7d".to_string(),
        }
    }

    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container;
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }
}
