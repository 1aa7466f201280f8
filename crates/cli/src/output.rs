//! Terminal output: YAML snippet, JSON and table rendering

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use rightsizer_lib::quantity::{format_cpu, format_memory};
use rightsizer_lib::render;
use rightsizer_lib::{AllRecommendations, NamedRecommendation};
use tabled::{settings::Style, Table, Tabled};

/// Output format for recommendations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pasteable YAML snippet (default)
    #[default]
    Yaml,
    /// JSON document
    Json,
    /// Summary table
    Table,
}

/// One table row per analyzed container
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "CPU Request")]
    cpu_request: String,
    #[tabled(rename = "CPU Limit")]
    cpu_limit: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

pub fn print_recommendations(
    recommendations: &AllRecommendations,
    format: OutputFormat,
    silent: bool,
) -> Result<()> {
    match format {
        OutputFormat::Yaml => print_yaml(recommendations, silent),
        OutputFormat::Json => print_json(recommendations),
        OutputFormat::Table => print_table(recommendations),
    }
}

/// The default output: warnings first, then the snippet
///
/// In silent mode the snippet alone goes to stdout; any warnings
/// collapse to a single generic line on stderr so scripted captures
/// stay clean.
fn print_yaml(recommendations: &AllRecommendations, silent: bool) -> Result<()> {
    let warnings = render::collect_warnings(recommendations);
    if !warnings.is_empty() {
        if silent {
            eprintln!("Warning: Issues like OOMKilled or CPU spikiness were detected. Review recommendations carefully.");
        } else {
            for warning in &warnings {
                println!("{}", format!("--- WARNING: {} ---", warning).yellow());
            }
        }
    }

    match render::render_yaml(recommendations)? {
        Some(yaml) => {
            if !silent {
                println!();
                println!("--- Recommended Resource Snippet (paste into your Deployment YAML) ---");
            }
            print!("{}", yaml);
        }
        None => {
            if !silent {
                println!(
                    "{}",
                    "No recommendations could be generated for any containers.".yellow()
                );
            }
        }
    }
    Ok(())
}

fn print_json(recommendations: &AllRecommendations) -> Result<()> {
    let json = serde_json::to_string_pretty(recommendations)?;
    println!("{}", json);
    Ok(())
}

fn print_table(recommendations: &AllRecommendations) -> Result<()> {
    let rows: Vec<RecommendationRow> = recommendations
        .main_containers
        .iter()
        .map(|rec| row(rec, "main"))
        .chain(
            recommendations
                .init_containers
                .iter()
                .map(|rec| row(rec, "init")),
        )
        .collect();

    if rows.is_empty() {
        println!(
            "{}",
            "No recommendations could be generated for any containers.".yellow()
        );
        return Ok(());
    }

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{}", table);
    Ok(())
}

fn row(rec: &NamedRecommendation, kind: &'static str) -> RecommendationRow {
    let mut flags = Vec::new();
    if rec.recommendation.is_oom_killed {
        flags.push("oom-killed");
    }
    if rec.recommendation.cpu.spikiness_warning {
        flags.push("spiky-cpu");
    }
    RecommendationRow {
        container: rec.container_name.clone(),
        kind,
        cpu_request: format_cpu(rec.recommendation.cpu.request_millicores),
        cpu_limit: format_cpu(rec.recommendation.cpu.limit_millicores),
        memory: format_memory(rec.recommendation.memory_bytes),
        flags: flags.join(", "),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}
