//! Layered configuration: TOML file plus RIGHTSIZER_ environment overrides

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_PATH: &str = "rightsizer.toml";

/// Tool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Path to a kubeconfig file; unset means the ambient default
    #[serde(default)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context; unset means the file's current context
    #[serde(default)]
    pub context: Option<String>,

    /// Historical window for the percentile queries
    #[serde(default = "default_range")]
    pub range: String,

    #[serde(default)]
    pub prometheus: PrometheusSettings,
}

/// How to reach Prometheus
#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusSettings {
    /// Directly reachable base URL; when unset, a port-forward to the
    /// service below is opened instead
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_prometheus_namespace")]
    pub namespace: String,

    #[serde(default = "default_prometheus_service")]
    pub service: String,

    #[serde(default = "default_prometheus_port")]
    pub port: u16,
}

impl Default for PrometheusSettings {
    fn default() -> Self {
        Self {
            url: None,
            namespace: default_prometheus_namespace(),
            service: default_prometheus_service(),
            port: default_prometheus_port(),
        }
    }
}

fn default_range() -> String {
    "7d".to_string()
}

fn default_prometheus_namespace() -> String {
    "monitoring".to_string()
}

fn default_prometheus_service() -> String {
    "kube-prometheus-stack-prometheus".to_string()
}

fn default_prometheus_port() -> u16 {
    9090
}

impl Settings {
    /// Load settings from a config file and RIGHTSIZER_ env vars
    ///
    /// An explicitly named file must exist; the default path is
    /// optional. Environment variables use `__` to reach nested keys,
    /// e.g. RIGHTSIZER_PROMETHEUS__URL.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let builder = match path {
            Some(path) => config::Config::builder().add_source(config::File::with_name(path)),
            None => config::Config::builder()
                .add_source(config::File::with_name(DEFAULT_CONFIG_PATH).required(false)),
        };
        let settings = builder
            .add_source(
                config::Environment::with_prefix("RIGHTSIZER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize::<Settings>()
            .context("Failed to parse configuration")?;
        Ok(settings.normalize())
    }

    /// Empty strings in optional fields behave like unset values
    fn normalize(mut self) -> Self {
        self.kubeconfig = self.kubeconfig.filter(|s| !s.is_empty());
        self.context = self.context.filter(|s| !s.is_empty());
        self.prometheus.url = self.prometheus.url.filter(|s| !s.is_empty());
        self
    }
}

/// Accepts single-unit Prometheus durations like "90m", "7d", "2w"
pub fn validate_range(range: &str) -> Result<()> {
    let pattern = Regex::new(r"^[1-9][0-9]*[smhdwy]$").expect("valid range pattern");
    if !pattern.is_match(range) {
        anyhow::bail!(
            "invalid range '{}': use a Prometheus range like '1h', '7d' or '2w'",
            range
        );
    }
    Ok(())
}

/// Commented starter config written by `rightsize init-config`
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# rightsizer.toml - deployment right-sizing configuration
#
# Every value shown is the default. Environment variables override the
# file, e.g.
#   RIGHTSIZER_RANGE=30d
#   RIGHTSIZER_PROMETHEUS__URL=http://localhost:9090

# Path to a kubeconfig file. Leave unset to use ~/.kube/config.
# kubeconfig = "/home/me/.kube/config"

# Kubeconfig context. Leave unset to use the current context.
# context = "production"

# Historical window for the percentile queries.
range = "7d"

[prometheus]
# Directly reachable Prometheus URL. When unset, the tool opens a
# port-forward to the service below instead.
# url = "http://localhost:9090"

namespace = "monitoring"
service = "kube-prometheus-stack-prometheus"
port = 9090
"#;

/// Write the starter config, refusing to clobber an existing file
///
/// Writes to `path` when given, otherwise to the default location.
pub fn write_default_config(path: Option<&str>) -> Result<PathBuf> {
    write_default_config_to(Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)))
}

fn write_default_config_to(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        anyhow::bail!("config file '{}' already exists", path.display());
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}
