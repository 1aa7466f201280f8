//! Error types for the recommendation engine

use thiserror::Error;

/// Which half of an aggregate analysis an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisScope {
    Main,
    Init,
}

impl std::fmt::Display for AnalysisScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisScope::Main => write!(f, "main containers"),
            AnalysisScope::Init => write!(f, "init containers"),
        }
    }
}

/// Structural failures surfaced by the recommendation engine
///
/// Failed metric fetches never appear here; they are logged and the
/// value degrades to zero so the floor logic still yields a safe
/// recommendation.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// The deployment could not be resolved to a container list
    #[error("could not resolve deployment '{deployment}' in namespace '{namespace}'")]
    DeploymentLookup {
        namespace: String,
        deployment: String,
        #[source]
        source: anyhow::Error,
    },

    /// One half of an aggregate analysis failed
    #[error("analysis of {scope} failed")]
    Analysis {
        scope: AnalysisScope,
        #[source]
        source: Box<RecommendError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_names_deployment() {
        let err = RecommendError::DeploymentLookup {
            namespace: "staging".to_string(),
            deployment: "web".to_string(),
            source: anyhow::anyhow!("not found"),
        };
        let message = err.to_string();
        assert!(message.contains("web"));
        assert!(message.contains("staging"));
    }

    #[test]
    fn test_analysis_error_names_scope() {
        let inner = RecommendError::DeploymentLookup {
            namespace: "staging".to_string(),
            deployment: "web".to_string(),
            source: anyhow::anyhow!("not found"),
        };
        let err = RecommendError::Analysis {
            scope: AnalysisScope::Init,
            source: Box::new(inner),
        };
        assert!(err.to_string().contains("init containers"));
    }
}
