//! Prometheus instant-query metrics source
//!
//! Issues PromQL against the `/api/v1/query` endpoint and reduces each
//! response to a single number. Pods are matched per deployment by name
//! prefix, so the queries work without pod-level labels on the series.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::engine::{MetricTarget, MetricsSource};

/// Rate window for the CPU usage counter
const CPU_RATE_WINDOW: &str = "5m";

/// Subquery resolution for CPU percentiles
const CPU_SUBQUERY_STEP: &str = "1m";

/// Metrics source backed by a Prometheus server
pub struct PrometheusSource {
    client: Client,
    query_url: Url,
}

impl PrometheusSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base = Url::parse(base_url).context("Invalid Prometheus URL")?;
        let query_url = base
            .join("api/v1/query")
            .context("Invalid Prometheus URL")?;

        Ok(Self { client, query_url })
    }

    /// Run an instant query and reduce the vector to one value
    ///
    /// An empty result vector and non-finite samples both collapse to
    /// zero; callers treat zero as "no usable data".
    async fn query(&self, metric: &str, query: &str) -> Result<f64> {
        let time = Utc::now().timestamp().to_string();
        let response = self
            .client
            .get(self.query_url.clone())
            .query(&[("query", query), ("time", time.as_str())])
            .send()
            .await
            .context("Failed to reach Prometheus")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Prometheus error ({}): {}", status, body);
        }

        let body: QueryResponse = response
            .json()
            .await
            .context("Failed to parse Prometheus response")?;

        if body.status != "success" {
            anyhow::bail!(
                "Prometheus query failed: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        for warning in &body.warnings {
            warn!(metric = %metric, warning = %warning, "Prometheus returned a warning");
        }

        let data = body.data.context("Prometheus response has no data")?;
        if data.result_type != "vector" {
            anyhow::bail!("unexpected Prometheus result type '{}'", data.result_type);
        }

        let sample = match data.result.first() {
            Some(sample) => sample,
            None => return Ok(0.0),
        };
        let value: f64 = sample
            .value
            .1
            .parse()
            .context("Prometheus returned a non-numeric sample")?;
        if !value.is_finite() {
            return Ok(0.0);
        }
        Ok(value)
    }
}

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn cpu_percentile(&self, p: f64, target: MetricTarget<'_>) -> Result<f64> {
        let query = format!(
            "max(quantile_over_time({}, sum(rate(container_cpu_usage_seconds_total{{namespace=\"{}\", pod=~\"^{}-.*\", container=\"{}\"}}[{}])) by (pod, namespace)[{}:{}]))",
            p,
            target.namespace,
            target.deployment,
            target.container,
            CPU_RATE_WINDOW,
            target.range,
            CPU_SUBQUERY_STEP
        );
        self.query("cpu_percentile", &query).await
    }

    async fn memory_percentile(&self, p: f64, target: MetricTarget<'_>) -> Result<f64> {
        let query = format!(
            "max(quantile_over_time({}, sum(container_memory_working_set_bytes{{namespace=\"{}\", pod=~\"^{}-.*\", container=\"{}\"}}) by (pod, namespace)[{}:]))",
            p, target.namespace, target.deployment, target.container, target.range
        );
        self.query("memory_percentile", &query).await
    }

    async fn memory_max(&self, target: MetricTarget<'_>) -> Result<f64> {
        let query = format!(
            "max(max_over_time(container_memory_working_set_bytes{{namespace=\"{}\", pod=~\"^{}-.*\", container=\"{}\"}}[{}]))",
            target.namespace, target.deployment, target.container, target.range
        );
        self.query("memory_max", &query).await
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    value: (f64, String),
}
