//! Library for right-sizing Kubernetes deployment resources
//!
//! This crate provides the core functionality for:
//! - Percentile-based CPU/memory recommendations per container
//! - OOM-kill detection and escalation via the Kubernetes events API
//! - Prometheus metric queries over a configurable window
//! - Manifest-ready YAML snippet rendering

pub mod cluster;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod prometheus;
pub mod quantity;
pub mod render;

pub use engine::{
    DeploymentInspector, DeploymentView, MetricTarget, MetricsSource, OomSignal, Recommender,
    RecommenderConfig,
};
pub use error::{AnalysisScope, RecommendError};
pub use models::*;
pub use observability::AnalysisLogger;
