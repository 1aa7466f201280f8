//! Structured logging for analysis decisions
//!
//! The engine logs every decision that shapes a recommendation through
//! an injected logger rather than calling a global facade, so it stays
//! independently testable.

use tracing::{debug, info, warn};

/// Structured logger for recommendation events
///
/// Bound to one deployment analysis; every event carries the namespace
/// and deployment so log lines correlate without extra context.
#[derive(Clone)]
pub struct AnalysisLogger {
    namespace: String,
    deployment: String,
}

impl AnalysisLogger {
    pub fn new(namespace: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            deployment: deployment.into(),
        }
    }

    /// Log the start of a per-container analysis
    pub fn log_container_analysis(&self, container: &str, kind: &str) {
        debug!(
            event = "container_analysis",
            namespace = %self.namespace,
            deployment = %self.deployment,
            container = %container,
            kind = %kind,
            "Analyzing container"
        );
    }

    /// Log a failed OOM-event lookup; the signal degrades to "none"
    pub fn log_oom_check_failed(&self, container: &str, error: &anyhow::Error) {
        warn!(
            event = "oom_check_failed",
            namespace = %self.namespace,
            deployment = %self.deployment,
            container = %container,
            error = %error,
            "Could not check for OOMKilled events, assuming none"
        );
    }

    /// Log a detected OOM kill and the limit the escalation starts from
    pub fn log_oom_detected(
        &self,
        container: &str,
        pod_name: Option<&str>,
        previous_limit_bytes: Option<u64>,
    ) {
        warn!(
            event = "oom_detected",
            namespace = %self.namespace,
            deployment = %self.deployment,
            container = %container,
            pod_name = ?pod_name,
            previous_limit_bytes = ?previous_limit_bytes,
            "OOMKilled event detected, memory metrics will be ignored for this container"
        );
    }

    /// Log the fixed fallback used when an OOM kill left no recorded limit
    pub fn log_oom_fallback(&self, container: &str, fallback_bytes: u64) {
        info!(
            event = "oom_fallback",
            namespace = %self.namespace,
            deployment = %self.deployment,
            container = %container,
            fallback_bytes = fallback_bytes,
            "No previous memory limit recorded, using the fixed fallback"
        );
    }

    /// Log a failed metric query; the value degrades to zero
    pub fn log_metric_degraded(&self, container: &str, metric: &str, error: &anyhow::Error) {
        warn!(
            event = "metric_degraded",
            namespace = %self.namespace,
            deployment = %self.deployment,
            container = %container,
            metric = %metric,
            error = %error,
            "Metric query failed, treating value as zero"
        );
    }

    /// Log a spikiness classification and the applied limit buffer
    pub fn log_spikiness(&self, container: &str, ratio: f64, threshold: f64) {
        info!(
            event = "cpu_spikiness",
            namespace = %self.namespace,
            deployment = %self.deployment,
            container = %container,
            ratio = ratio,
            threshold = threshold,
            "High CPU spikiness detected, applying extra buffer to the CPU limit"
        );
    }

    /// Log the fixed defaults used for an init container without data
    pub fn log_init_default(&self, container: &str) {
        info!(
            event = "init_default",
            namespace = %self.namespace,
            deployment = %self.deployment,
            container = %container,
            "No memory usage recorded for init container, using defaults"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_binds_identity() {
        let logger = AnalysisLogger::new("staging", "web");
        assert_eq!(logger.namespace, "staging");
        assert_eq!(logger.deployment, "web");
    }
}
