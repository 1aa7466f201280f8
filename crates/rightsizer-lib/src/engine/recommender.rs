//! Per-container recommendation calculation
//!
//! Turns percentile samples and an OOM-kill signal into floor-clamped
//! resource recommendations. The procedure is deterministic: identical
//! collaborator responses always produce identical output, and all
//! buffer arithmetic on byte counts is integer math so results are
//! reproducible bit-for-bit across runs.

use std::sync::Arc;

use crate::engine::{DeploymentInspector, DeploymentView, MetricTarget, MetricsSource, OomSignal};
use crate::error::{AnalysisScope, RecommendError};
use crate::models::{AllRecommendations, AnalysisParams, CpuRecommendation, NamedRecommendation, Recommendation};
use crate::observability::AnalysisLogger;

/// Headroom applied to the p99 working set, integer percent
pub const MEMORY_BUFFER_PERCENT: u64 = 120;

/// Minimum memory recommendation (64 MiB)
pub const MIN_MEMORY_BYTES: u64 = 64 * 1024 * 1024;

/// Escalation applied to the previous limit after an OOM kill, integer percent
pub const OOM_ESCALATION_PERCENT: u64 = 150;

/// Fallback when an OOM kill left no recorded limit (512 MiB)
pub const OOM_FALLBACK_BYTES: u64 = 512 * 1024 * 1024;

/// Headroom applied to init-container peak memory, integer percent
pub const INIT_MEMORY_BUFFER_PERCENT: u64 = 115;

/// Default for init containers with no recorded usage (128 MiB)
pub const INIT_MEMORY_DEFAULT_BYTES: u64 = 128 * 1024 * 1024;

/// Fixed CPU pair for init containers
pub const INIT_CPU_REQUEST_MILLICORES: u32 = 100;
pub const INIT_CPU_LIMIT_MILLICORES: u32 = 1000;

/// Minimum CPU request (50m) and limit (100m)
pub const MIN_CPU_REQUEST_MILLICORES: u32 = 50;
pub const MIN_CPU_LIMIT_MILLICORES: u32 = 100;

/// p99/p50 ratio above which a workload is classified spiky
pub const SPIKINESS_THRESHOLD: f64 = 2.0;

/// Extra headroom applied to the CPU limit of spiky workloads
pub const SPIKINESS_CPU_BUFFER: f64 = 1.25;

const P50: f64 = 0.50;
const P90: f64 = 0.90;
const P99: f64 = 0.99;

/// Buffers, thresholds and floors for the recommendation procedure
///
/// Immutable once constructed; tests override individual knobs without
/// touching process-wide state.
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    /// Headroom applied to the p99 working set, integer percent
    pub memory_buffer_percent: u64,
    /// Floor for main-container memory recommendations
    pub min_memory_bytes: u64,
    /// Escalation applied to the previous limit after an OOM kill, integer percent
    pub oom_escalation_percent: u64,
    /// Fallback when an OOM kill left no recorded limit
    pub oom_fallback_bytes: u64,
    /// Headroom applied to init-container peak memory, integer percent
    pub init_memory_buffer_percent: u64,
    /// Default for init containers with no recorded usage
    pub init_memory_default_bytes: u64,
    pub init_cpu_request_millicores: u32,
    pub init_cpu_limit_millicores: u32,
    /// Floor for the CPU request
    pub min_cpu_request_millicores: u32,
    /// Floor for the CPU limit
    pub min_cpu_limit_millicores: u32,
    /// p99/p50 ratio above which a workload is classified spiky
    pub spikiness_threshold: f64,
    /// Extra headroom applied to the CPU limit of spiky workloads
    pub spikiness_cpu_buffer: f64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            memory_buffer_percent: MEMORY_BUFFER_PERCENT,
            min_memory_bytes: MIN_MEMORY_BYTES,
            oom_escalation_percent: OOM_ESCALATION_PERCENT,
            oom_fallback_bytes: OOM_FALLBACK_BYTES,
            init_memory_buffer_percent: INIT_MEMORY_BUFFER_PERCENT,
            init_memory_default_bytes: INIT_MEMORY_DEFAULT_BYTES,
            init_cpu_request_millicores: INIT_CPU_REQUEST_MILLICORES,
            init_cpu_limit_millicores: INIT_CPU_LIMIT_MILLICORES,
            min_cpu_request_millicores: MIN_CPU_REQUEST_MILLICORES,
            min_cpu_limit_millicores: MIN_CPU_LIMIT_MILLICORES,
            spikiness_threshold: SPIKINESS_THRESHOLD,
            spikiness_cpu_buffer: SPIKINESS_CPU_BUFFER,
        }
    }
}

/// Computes per-container resource recommendations for one deployment
pub struct Recommender {
    inspector: Arc<dyn DeploymentInspector>,
    metrics: Arc<dyn MetricsSource>,
    config: RecommenderConfig,
    logger: AnalysisLogger,
}

impl Recommender {
    pub fn new(
        inspector: Arc<dyn DeploymentInspector>,
        metrics: Arc<dyn MetricsSource>,
        config: RecommenderConfig,
        logger: AnalysisLogger,
    ) -> Self {
        Self {
            inspector,
            metrics,
            config,
            logger,
        }
    }

    /// Recommendations for the deployment's main containers
    ///
    /// With a target container set, a name not present in the list
    /// yields an empty result, not an error. Without one, every main
    /// container is analyzed in declaration order.
    pub async fn calculate_for_deployment(
        &self,
        params: &AnalysisParams,
    ) -> Result<Vec<NamedRecommendation>, RecommendError> {
        let view = self.resolve(params).await?;
        let selected = select_containers(&view.containers, params.container.as_deref());

        let mut recommendations = Vec::with_capacity(selected.len());
        for container in selected {
            self.logger.log_container_analysis(container, "main");
            let recommendation = self.recommend_main(&view, container, params).await;
            recommendations.push(NamedRecommendation {
                container_name: container.clone(),
                recommendation,
            });
        }
        Ok(recommendations)
    }

    /// Recommendations for the deployment's init containers
    ///
    /// Same selection semantics as the main path; CPU is never
    /// metric-driven and no OOM check is performed.
    pub async fn calculate_for_init_containers(
        &self,
        params: &AnalysisParams,
    ) -> Result<Vec<NamedRecommendation>, RecommendError> {
        let view = self.resolve(params).await?;
        let selected = select_containers(&view.init_containers, params.container.as_deref());

        let mut recommendations = Vec::with_capacity(selected.len());
        for container in selected {
            self.logger.log_container_analysis(container, "init");
            let recommendation = self.recommend_init(container, params).await;
            recommendations.push(NamedRecommendation {
                container_name: container.clone(),
                recommendation,
            });
        }
        Ok(recommendations)
    }

    /// Main and init recommendations merged into one result set
    ///
    /// Either half failing fails the whole call with an error naming
    /// the half; empty halves are a valid outcome.
    pub async fn calculate_for_all(
        &self,
        params: &AnalysisParams,
    ) -> Result<AllRecommendations, RecommendError> {
        let main_containers =
            self.calculate_for_deployment(params)
                .await
                .map_err(|err| RecommendError::Analysis {
                    scope: AnalysisScope::Main,
                    source: Box::new(err),
                })?;
        let init_containers =
            self.calculate_for_init_containers(params)
                .await
                .map_err(|err| RecommendError::Analysis {
                    scope: AnalysisScope::Init,
                    source: Box::new(err),
                })?;

        Ok(AllRecommendations {
            main_containers,
            init_containers,
        })
    }

    async fn resolve(&self, params: &AnalysisParams) -> Result<DeploymentView, RecommendError> {
        self.inspector
            .resolve(&params.namespace, &params.deployment)
            .await
            .map_err(|source| RecommendError::DeploymentLookup {
                namespace: params.namespace.clone(),
                deployment: params.deployment.clone(),
                source,
            })
    }

    async fn recommend_main(
        &self,
        view: &DeploymentView,
        container: &str,
        params: &AnalysisParams,
    ) -> Recommendation {
        let target = MetricTarget {
            namespace: &params.namespace,
            deployment: &params.deployment,
            container,
            range: &params.range,
        };

        let signal = match self.inspector.oom_signal(view, container).await {
            Ok(signal) => signal,
            Err(err) => {
                self.logger.log_oom_check_failed(container, &err);
                OomSignal::default()
            }
        };

        let memory_bytes = if signal.was_killed {
            self.logger.log_oom_detected(
                container,
                signal.pod_name.as_deref(),
                signal.last_limit_bytes,
            );
            let escalated = match signal.last_limit_bytes {
                Some(limit) => limit.saturating_mul(self.config.oom_escalation_percent) / 100,
                None => {
                    self.logger
                        .log_oom_fallback(container, self.config.oom_fallback_bytes);
                    self.config.oom_fallback_bytes
                }
            };
            escalated.max(self.config.min_memory_bytes)
        } else {
            let p99_bytes = self.memory_metric("memory_p99", target).await as u64;
            let buffered = p99_bytes.saturating_mul(self.config.memory_buffer_percent) / 100;
            buffered.max(self.config.min_memory_bytes)
        };

        let cpu_p90 = self.cpu_metric("cpu_p90", P90, target).await;
        let cpu_p99 = self.cpu_metric("cpu_p99", P99, target).await;
        let cpu_p50 = self.cpu_metric("cpu_p50", P50, target).await;

        let mut spikiness_warning = false;
        let mut limit_cores = cpu_p99;
        if cpu_p50 > 0.0 {
            let ratio = cpu_p99 / cpu_p50;
            if ratio > self.config.spikiness_threshold {
                spikiness_warning = true;
                limit_cores = cpu_p99 * self.config.spikiness_cpu_buffer;
                self.logger
                    .log_spikiness(container, ratio, self.config.spikiness_threshold);
            }
        }

        let request_millicores =
            ((cpu_p90 * 1000.0) as u32).max(self.config.min_cpu_request_millicores);
        let mut limit_millicores =
            ((limit_cores * 1000.0) as u32).max(self.config.min_cpu_limit_millicores);
        if limit_millicores < request_millicores {
            limit_millicores = request_millicores;
        }

        Recommendation {
            memory_bytes,
            cpu: CpuRecommendation {
                request_millicores,
                limit_millicores,
                spikiness_warning,
            },
            is_oom_killed: signal.was_killed,
        }
    }

    async fn recommend_init(&self, container: &str, params: &AnalysisParams) -> Recommendation {
        let target = MetricTarget {
            namespace: &params.namespace,
            deployment: &params.deployment,
            container,
            range: &params.range,
        };

        let peak = match self.metrics.memory_max(target).await {
            Ok(value) => value,
            Err(err) => {
                self.logger.log_metric_degraded(container, "memory_max", &err);
                0.0
            }
        };

        let memory_bytes = if peak > 0.0 {
            (peak as u64).saturating_mul(self.config.init_memory_buffer_percent) / 100
        } else {
            self.logger.log_init_default(container);
            self.config.init_memory_default_bytes
        };

        Recommendation {
            memory_bytes,
            cpu: CpuRecommendation {
                request_millicores: self.config.init_cpu_request_millicores,
                limit_millicores: self.config.init_cpu_limit_millicores,
                spikiness_warning: false,
            },
            is_oom_killed: false,
        }
    }

    async fn cpu_metric(&self, label: &str, p: f64, target: MetricTarget<'_>) -> f64 {
        match self.metrics.cpu_percentile(p, target).await {
            Ok(value) => value,
            Err(err) => {
                self.logger.log_metric_degraded(target.container, label, &err);
                0.0
            }
        }
    }

    async fn memory_metric(&self, label: &str, target: MetricTarget<'_>) -> f64 {
        match self.metrics.memory_percentile(P99, target).await {
            Ok(value) => value,
            Err(err) => {
                self.logger.log_metric_degraded(target.container, label, &err);
                0.0
            }
        }
    }
}

/// Containers to analyze: the matching target, or all in declaration order
fn select_containers<'a>(all: &'a [String], target: Option<&str>) -> Vec<&'a String> {
    match target {
        Some(name) => all.iter().filter(|container| container.as_str() == name).collect(),
        None => all.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MIB: u64 = 1024 * 1024;

    #[derive(Default)]
    struct MockInspector {
        containers: Vec<&'static str>,
        init_containers: Vec<&'static str>,
        resolve_error: bool,
        oom_container: Option<&'static str>,
        oom_limit_bytes: Option<u64>,
        oom_check_error: bool,
    }

    #[async_trait]
    impl DeploymentInspector for MockInspector {
        async fn resolve(&self, namespace: &str, name: &str) -> Result<DeploymentView> {
            if self.resolve_error {
                anyhow::bail!("deployments.apps \"{}\" not found", name);
            }
            Ok(DeploymentView {
                namespace: namespace.to_string(),
                name: name.to_string(),
                selector: BTreeMap::new(),
                containers: self.containers.iter().map(|c| c.to_string()).collect(),
                init_containers: self.init_containers.iter().map(|c| c.to_string()).collect(),
            })
        }

        async fn oom_signal(
            &self,
            _deployment: &DeploymentView,
            container: &str,
        ) -> Result<OomSignal> {
            if self.oom_check_error {
                anyhow::bail!("events list failed");
            }
            if self.oom_container == Some(container) {
                return Ok(OomSignal {
                    was_killed: true,
                    pod_name: Some("web-6d4cf56db6-x7x9p".to_string()),
                    last_limit_bytes: self.oom_limit_bytes,
                });
            }
            Ok(OomSignal::default())
        }
    }

    /// Inspector whose resolve fails from the nth call on, for testing
    /// which half of an aggregate run carries the failure
    struct FlakyInspector {
        calls: AtomicUsize,
        fail_from_call: usize,
    }

    #[async_trait]
    impl DeploymentInspector for FlakyInspector {
        async fn resolve(&self, namespace: &str, name: &str) -> Result<DeploymentView> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.fail_from_call {
                anyhow::bail!("connection refused");
            }
            Ok(DeploymentView {
                namespace: namespace.to_string(),
                name: name.to_string(),
                selector: BTreeMap::new(),
                containers: vec!["web".to_string()],
                init_containers: vec!["init-setup".to_string()],
            })
        }

        async fn oom_signal(
            &self,
            _deployment: &DeploymentView,
            _container: &str,
        ) -> Result<OomSignal> {
            Ok(OomSignal::default())
        }
    }

    #[derive(Default)]
    struct MockMetrics {
        cpu_p50: f64,
        cpu_p90: f64,
        cpu_p99: f64,
        memory_p99: f64,
        memory_peak: f64,
        cpu_error: bool,
        memory_error: bool,
    }

    #[async_trait]
    impl MetricsSource for MockMetrics {
        async fn cpu_percentile(&self, p: f64, _target: MetricTarget<'_>) -> Result<f64> {
            if self.cpu_error {
                anyhow::bail!("prometheus unreachable");
            }
            match (p * 100.0).round() as u32 {
                50 => Ok(self.cpu_p50),
                90 => Ok(self.cpu_p90),
                _ => Ok(self.cpu_p99),
            }
        }

        async fn memory_percentile(&self, _p: f64, _target: MetricTarget<'_>) -> Result<f64> {
            if self.memory_error {
                anyhow::bail!("prometheus unreachable");
            }
            Ok(self.memory_p99)
        }

        async fn memory_max(&self, _target: MetricTarget<'_>) -> Result<f64> {
            if self.memory_error {
                anyhow::bail!("prometheus unreachable");
            }
            Ok(self.memory_peak)
        }
    }

    fn recommender(inspector: MockInspector, metrics: MockMetrics) -> Recommender {
        recommender_with_config(inspector, metrics, RecommenderConfig::default())
    }

    fn recommender_with_config(
        inspector: MockInspector,
        metrics: MockMetrics,
        config: RecommenderConfig,
    ) -> Recommender {
        Recommender::new(
            Arc::new(inspector),
            Arc::new(metrics),
            config,
            AnalysisLogger::new("test-ns", "web"),
        )
    }

    fn params() -> AnalysisParams {
        AnalysisParams::new("test-ns", "web")
    }

    fn web_inspector() -> MockInspector {
        MockInspector {
            containers: vec!["web"],
            init_containers: vec!["init-setup"],
            ..MockInspector::default()
        }
    }

    #[tokio::test]
    async fn test_memory_buffer_uses_integer_math() {
        let metrics = MockMetrics {
            memory_p99: (100 * MIB) as f64,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();

        // (104857600 * 120) / 100, not a floating approximation
        assert_eq!(got[0].recommendation.memory_bytes, 125_829_120);
    }

    #[tokio::test]
    async fn test_cpu_below_spikiness_threshold() {
        let metrics = MockMetrics {
            cpu_p90: 0.2,
            cpu_p99: 0.4,
            cpu_p50: 0.25,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();
        let cpu = &got[0].recommendation.cpu;

        assert_eq!(cpu.request_millicores, 200);
        assert_eq!(cpu.limit_millicores, 400);
        assert!(!cpu.spikiness_warning);
    }

    #[tokio::test]
    async fn test_spiky_cpu_buffers_limit() {
        let metrics = MockMetrics {
            cpu_p90: 0.1,
            cpu_p99: 0.5,
            cpu_p50: 0.1,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();
        let cpu = &got[0].recommendation.cpu;

        assert_eq!(cpu.request_millicores, 100);
        assert_eq!(cpu.limit_millicores, 625);
        assert!(cpu.spikiness_warning);
    }

    #[tokio::test]
    async fn test_ratio_exactly_at_threshold_is_not_spiky() {
        let metrics = MockMetrics {
            cpu_p90: 0.2,
            cpu_p99: 0.4,
            cpu_p50: 0.2,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();
        let cpu = &got[0].recommendation.cpu;

        assert_eq!(cpu.limit_millicores, 400);
        assert!(!cpu.spikiness_warning);
    }

    #[tokio::test]
    async fn test_all_zero_metrics_floor_instead_of_skip() {
        let rec = recommender(web_inspector(), MockMetrics::default());

        let got = rec.calculate_for_deployment(&params()).await.unwrap();

        assert_eq!(got.len(), 1);
        let r = &got[0].recommendation;
        assert_eq!(r.memory_bytes, 64 * MIB);
        assert_eq!(r.cpu.request_millicores, 50);
        assert_eq!(r.cpu.limit_millicores, 100);
        assert!(!r.is_oom_killed);
        assert!(!r.cpu.spikiness_warning);
    }

    #[tokio::test]
    async fn test_oom_escalates_previous_limit_and_ignores_memory_metrics() {
        let inspector = MockInspector {
            oom_container: Some("web"),
            oom_limit_bytes: Some(256 * MIB),
            ..web_inspector()
        };
        let metrics = MockMetrics {
            // Would yield 1.2 GiB if the p99 value were consulted
            memory_p99: (1024 * MIB) as f64,
            cpu_p90: 0.2,
            cpu_p99: 0.4,
            cpu_p50: 0.25,
            ..MockMetrics::default()
        };
        let rec = recommender(inspector, metrics);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();
        let r = &got[0].recommendation;

        assert!(r.is_oom_killed);
        assert_eq!(r.memory_bytes, 384 * MIB);
        // CPU still comes from the percentile queries
        assert_eq!(r.cpu.request_millicores, 200);
        assert_eq!(r.cpu.limit_millicores, 400);
    }

    #[tokio::test]
    async fn test_oom_without_recorded_limit_uses_fallback() {
        let inspector = MockInspector {
            oom_container: Some("web"),
            oom_limit_bytes: None,
            ..web_inspector()
        };
        let rec = recommender(inspector, MockMetrics::default());

        let got = rec.calculate_for_deployment(&params()).await.unwrap();

        assert_eq!(got[0].recommendation.memory_bytes, 512 * MIB);
        assert!(got[0].recommendation.is_oom_killed);
    }

    #[tokio::test]
    async fn test_memory_floor_applies_after_oom_escalation() {
        let inspector = MockInspector {
            oom_container: Some("web"),
            oom_limit_bytes: Some(32 * MIB),
            ..web_inspector()
        };
        let rec = recommender(inspector, MockMetrics::default());

        let got = rec.calculate_for_deployment(&params()).await.unwrap();

        // 48 MiB escalated, clamped up to the 64 MiB floor
        assert_eq!(got[0].recommendation.memory_bytes, 64 * MIB);
    }

    #[tokio::test]
    async fn test_oom_check_failure_degrades_to_no_signal() {
        let inspector = MockInspector {
            oom_check_error: true,
            ..web_inspector()
        };
        let metrics = MockMetrics {
            memory_p99: (100 * MIB) as f64,
            ..MockMetrics::default()
        };
        let rec = recommender(inspector, metrics);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();
        let r = &got[0].recommendation;

        assert!(!r.is_oom_killed);
        assert_eq!(r.memory_bytes, 125_829_120);
    }

    #[tokio::test]
    async fn test_metric_failures_degrade_to_floors() {
        let metrics = MockMetrics {
            cpu_error: true,
            memory_error: true,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();

        assert_eq!(got.len(), 1);
        let r = &got[0].recommendation;
        assert_eq!(r.memory_bytes, 64 * MIB);
        assert_eq!(r.cpu.request_millicores, 50);
        assert_eq!(r.cpu.limit_millicores, 100);
    }

    #[tokio::test]
    async fn test_limit_raised_to_request_after_flooring() {
        let metrics = MockMetrics {
            cpu_p90: 0.25,
            cpu_p99: 0.05,
            cpu_p50: 0.05,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();
        let cpu = &got[0].recommendation.cpu;

        assert_eq!(cpu.request_millicores, 250);
        assert_eq!(cpu.limit_millicores, 250);
    }

    #[tokio::test]
    async fn test_declaration_order_preserved() {
        let inspector = MockInspector {
            containers: vec!["web", "sidecar", "metrics-proxy"],
            ..MockInspector::default()
        };
        let rec = recommender(inspector, MockMetrics::default());

        let got = rec.calculate_for_deployment(&params()).await.unwrap();
        let names: Vec<&str> = got.iter().map(|r| r.container_name.as_str()).collect();

        assert_eq!(names, vec!["web", "sidecar", "metrics-proxy"]);
    }

    #[tokio::test]
    async fn test_target_container_restricts_analysis() {
        let inspector = MockInspector {
            containers: vec!["web", "sidecar"],
            init_containers: vec!["init-setup"],
            ..MockInspector::default()
        };
        let rec = recommender(inspector, MockMetrics::default());
        let params = params().with_container(Some("sidecar".to_string()));

        let all = rec.calculate_for_all(&params).await.unwrap();

        assert_eq!(all.main_containers.len(), 1);
        assert_eq!(all.main_containers[0].container_name, "sidecar");
        // The target does not name an init container, so that half is empty
        assert!(all.init_containers.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_container_yields_empty_result() {
        let rec = recommender(web_inspector(), MockMetrics::default());
        let params = params().with_container(Some("missing".to_string()));

        let got = rec.calculate_for_deployment(&params).await.unwrap();

        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_failure_is_fatal() {
        let inspector = MockInspector {
            resolve_error: true,
            ..web_inspector()
        };
        let rec = recommender(inspector, MockMetrics::default());

        let err = rec.calculate_for_deployment(&params()).await.unwrap_err();

        assert!(matches!(err, RecommendError::DeploymentLookup { .. }));
    }

    #[tokio::test]
    async fn test_init_container_memory_buffered_from_peak() {
        let metrics = MockMetrics {
            memory_peak: (50 * MIB) as f64,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let got = rec.calculate_for_init_containers(&params()).await.unwrap();
        let r = &got[0].recommendation;

        // (52428800 * 115) / 100
        assert_eq!(r.memory_bytes, 60_293_120);
        assert_eq!(r.cpu.request_millicores, 100);
        assert_eq!(r.cpu.limit_millicores, 1000);
        assert!(!r.is_oom_killed);
        assert!(!r.cpu.spikiness_warning);
    }

    #[tokio::test]
    async fn test_init_container_defaults_without_data() {
        let rec = recommender(web_inspector(), MockMetrics::default());

        let got = rec.calculate_for_init_containers(&params()).await.unwrap();
        let r = &got[0].recommendation;

        assert_eq!(r.memory_bytes, 128 * MIB);
        assert_eq!(r.cpu.request_millicores, 100);
        assert_eq!(r.cpu.limit_millicores, 1000);
    }

    #[tokio::test]
    async fn test_init_container_cpu_never_metric_driven() {
        let metrics = MockMetrics {
            cpu_p90: 0.8,
            cpu_p99: 2.0,
            cpu_p50: 0.1,
            memory_peak: (50 * MIB) as f64,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let got = rec.calculate_for_init_containers(&params()).await.unwrap();
        let cpu = &got[0].recommendation.cpu;

        assert_eq!(cpu.request_millicores, 100);
        assert_eq!(cpu.limit_millicores, 1000);
    }

    #[tokio::test]
    async fn test_init_path_skips_oom_check() {
        // An OOM signal recorded against the init container name must not
        // be consulted by the init path
        let inspector = MockInspector {
            oom_container: Some("init-setup"),
            oom_limit_bytes: Some(256 * MIB),
            ..web_inspector()
        };
        let metrics = MockMetrics {
            memory_peak: (50 * MIB) as f64,
            ..MockMetrics::default()
        };
        let rec = recommender(inspector, metrics);

        let got = rec.calculate_for_init_containers(&params()).await.unwrap();
        let r = &got[0].recommendation;

        assert!(!r.is_oom_killed);
        assert_eq!(r.memory_bytes, 60_293_120);
    }

    #[tokio::test]
    async fn test_calculate_for_all_merges_both_halves() {
        let metrics = MockMetrics {
            memory_p99: (100 * MIB) as f64,
            memory_peak: (50 * MIB) as f64,
            cpu_p90: 0.2,
            cpu_p99: 0.4,
            cpu_p50: 0.25,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let all = rec.calculate_for_all(&params()).await.unwrap();

        assert_eq!(all.main_containers.len(), 1);
        assert_eq!(all.init_containers.len(), 1);
        assert_eq!(all.main_containers[0].container_name, "web");
        assert_eq!(all.init_containers[0].container_name, "init-setup");
    }

    #[tokio::test]
    async fn test_deployment_without_init_containers_yields_empty_half() {
        let inspector = MockInspector {
            containers: vec!["web"],
            init_containers: vec![],
            ..MockInspector::default()
        };
        let rec = recommender(inspector, MockMetrics::default());

        let all = rec.calculate_for_all(&params()).await.unwrap();

        assert_eq!(all.main_containers.len(), 1);
        assert!(all.init_containers.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_failure_names_main_half() {
        let inspector = FlakyInspector {
            calls: AtomicUsize::new(0),
            fail_from_call: 1,
        };
        let rec = Recommender::new(
            Arc::new(inspector),
            Arc::new(MockMetrics::default()),
            RecommenderConfig::default(),
            AnalysisLogger::new("test-ns", "web"),
        );

        let err = rec.calculate_for_all(&params()).await.unwrap_err();

        assert!(matches!(
            err,
            RecommendError::Analysis {
                scope: AnalysisScope::Main,
                ..
            }
        ));
        assert!(err.to_string().contains("main containers"));
    }

    #[tokio::test]
    async fn test_aggregate_failure_names_init_half() {
        let inspector = FlakyInspector {
            calls: AtomicUsize::new(0),
            fail_from_call: 2,
        };
        let rec = Recommender::new(
            Arc::new(inspector),
            Arc::new(MockMetrics::default()),
            RecommenderConfig::default(),
            AnalysisLogger::new("test-ns", "web"),
        );

        let err = rec.calculate_for_all(&params()).await.unwrap_err();

        assert!(matches!(
            err,
            RecommendError::Analysis {
                scope: AnalysisScope::Init,
                ..
            }
        ));
        assert!(err.to_string().contains("init containers"));
    }

    #[tokio::test]
    async fn test_identical_inputs_yield_identical_output() {
        let metrics = MockMetrics {
            memory_p99: (100 * MIB) as f64,
            memory_peak: (50 * MIB) as f64,
            cpu_p90: 0.2,
            cpu_p99: 0.5,
            cpu_p50: 0.1,
            ..MockMetrics::default()
        };
        let rec = recommender(web_inspector(), metrics);

        let first = rec.calculate_for_all(&params()).await.unwrap();
        let second = rec.calculate_for_all(&params()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_overridden_thresholds_respected() {
        let metrics = MockMetrics {
            cpu_p90: 0.1,
            cpu_p99: 0.5,
            cpu_p50: 0.1,
            ..MockMetrics::default()
        };
        let config = RecommenderConfig {
            spikiness_threshold: 10.0,
            ..RecommenderConfig::default()
        };
        let rec = recommender_with_config(web_inspector(), metrics, config);

        let got = rec.calculate_for_deployment(&params()).await.unwrap();
        let cpu = &got[0].recommendation.cpu;

        // Ratio 5.0 stays under the raised threshold
        assert!(!cpu.spikiness_warning);
        assert_eq!(cpu.limit_millicores, 500);
    }

    #[tokio::test]
    async fn test_limit_always_at_least_request() {
        // Sweep a few shapes and check the invariant holds everywhere
        let shapes = [
            (0.0, 0.0, 0.0),
            (0.5, 0.1, 0.1),
            (1.2, 0.3, 0.9),
            (0.04, 0.06, 0.01),
        ];
        for (p90, p99, p50) in shapes {
            let metrics = MockMetrics {
                cpu_p90: p90,
                cpu_p99: p99,
                cpu_p50: p50,
                ..MockMetrics::default()
            };
            let rec = recommender(web_inspector(), metrics);
            let got = rec.calculate_for_deployment(&params()).await.unwrap();
            let cpu = &got[0].recommendation.cpu;
            assert!(
                cpu.limit_millicores >= cpu.request_millicores,
                "limit {} below request {} for p90={}, p99={}, p50={}",
                cpu.limit_millicores,
                cpu.request_millicores,
                p90,
                p99,
                p50
            );
        }
    }
}
