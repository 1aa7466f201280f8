//! YAML snippet assembly for recommendation output
//!
//! Produces the `containers` / `initContainers` fragment a user pastes
//! into a Deployment manifest. Field order mirrors what `kubectl get`
//! prints: limits before requests, cpu before memory.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{AllRecommendations, NamedRecommendation};
use crate::quantity::{format_cpu, format_memory};

#[derive(Debug, Serialize)]
pub struct ResourceList {
    pub cpu: String,
    pub memory: String,
}

#[derive(Debug, Serialize)]
pub struct ResourceRequirements {
    pub limits: ResourceList,
    pub requests: ResourceList,
}

#[derive(Debug, Serialize)]
pub struct OutputContainer {
    pub name: String,
    pub resources: ResourceRequirements,
}

#[derive(Debug, Serialize)]
pub struct OutputSnippet {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<OutputContainer>,
    #[serde(rename = "initContainers", skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<OutputContainer>,
}

/// Render the recommendations as a pasteable YAML fragment
///
/// Returns `None` when there is nothing to render, leaving the "no
/// recommendations" messaging to the caller. Memory request and limit
/// are the same value.
pub fn render_yaml(recommendations: &AllRecommendations) -> Result<Option<String>> {
    if recommendations.is_empty() {
        return Ok(None);
    }

    let snippet = OutputSnippet {
        containers: output_containers(&recommendations.main_containers),
        init_containers: output_containers(&recommendations.init_containers),
    };

    let yaml = serde_yaml::to_string(&snippet).context("Failed to render YAML snippet")?;
    Ok(Some(yaml))
}

/// Warnings for flagged containers, main containers first
pub fn collect_warnings(recommendations: &AllRecommendations) -> Vec<String> {
    let mut warnings = Vec::new();
    for rec in recommendations
        .main_containers
        .iter()
        .chain(recommendations.init_containers.iter())
    {
        if rec.recommendation.is_oom_killed {
            warnings.push(format!(
                "OOMKilled event detected for container '{}'",
                rec.container_name
            ));
        }
        if rec.recommendation.cpu.spikiness_warning {
            warnings.push(format!(
                "High CPU spikiness detected for container '{}'",
                rec.container_name
            ));
        }
    }
    warnings
}

fn output_containers(recs: &[NamedRecommendation]) -> Vec<OutputContainer> {
    recs.iter()
        .map(|rec| {
            let memory = format_memory(rec.recommendation.memory_bytes);
            OutputContainer {
                name: rec.container_name.clone(),
                resources: ResourceRequirements {
                    limits: ResourceList {
                        cpu: format_cpu(rec.recommendation.cpu.limit_millicores),
                        memory: memory.clone(),
                    },
                    requests: ResourceList {
                        cpu: format_cpu(rec.recommendation.cpu.request_millicores),
                        memory,
                    },
                },
            }
        })
        .collect()
}
