//! Deployment right-sizing CLI
//!
//! Analyzes a deployment's historical resource usage and prints
//! request/limit recommendations ready to paste into its manifest.

mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rightsizer_lib::cluster::{self, KubeInspector, PortForward};
use rightsizer_lib::prometheus::PrometheusSource;
use rightsizer_lib::{
    AllRecommendations, AnalysisLogger, AnalysisParams, Recommender, RecommenderConfig,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Settings;
use crate::output::OutputFormat;

/// Deployment right-sizing CLI
#[derive(Parser)]
#[command(name = "rightsize")]
#[command(author, version, about = "Resource recommendations for Kubernetes deployments", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./rightsizer.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Print only the snippet; logs and decorations are suppressed
    #[arg(long, global = true)]
    pub silent: bool,

    /// Enable verbose (debug) logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a deployment and print recommendations
    Analyze(AnalyzeArgs),

    /// Write a commented default config file to ./rightsizer.toml or the --config path
    InitConfig,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Namespace of the deployment
    #[arg(long, short = 'n', default_value = "default")]
    pub namespace: String,

    /// Deployment name
    #[arg(long, short = 'd')]
    pub deployment: String,

    /// Restrict the analysis to one container by name
    #[arg(long, short = 'c')]
    pub container: Option<String>,

    /// Metrics window, e.g. 1h, 7d, 2w (overrides the config file)
    #[arg(long)]
    pub range: Option<String>,

    /// Which of the deployment's containers to analyze
    #[arg(long, value_enum, default_value_t = Target::All)]
    pub target: Target,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Prometheus base URL; when set, no port-forward is opened
    #[arg(long)]
    pub prometheus_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Main and init containers
    All,
    /// Main containers only
    Main,
    /// Init containers only
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.silent {
        EnvFilter::new("off")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args, cli.config.as_deref(), cli.silent).await,
        Commands::InitConfig => run_init_config(cli.config.as_deref()),
    }
}

async fn run_analyze(args: AnalyzeArgs, config_path: Option<&str>, silent: bool) -> Result<()> {
    let settings = Settings::load(config_path)?;

    let range = args.range.unwrap_or_else(|| settings.range.clone());
    config::validate_range(&range)?;

    let kubeconfig = args
        .kubeconfig
        .or_else(|| settings.kubeconfig.clone().map(PathBuf::from));
    let context = args.context.or_else(|| settings.context.clone());
    let client = cluster::client(kubeconfig.as_deref(), context.as_deref()).await?;

    // The tunnel guard must stay alive for the duration of the queries
    let explicit_url = args.prometheus_url.or_else(|| settings.prometheus.url.clone());
    let (prometheus_url, _tunnel) = match explicit_url {
        Some(url) => (url, None),
        None => {
            let tunnel = PortForward::start(
                client.clone(),
                &settings.prometheus.namespace,
                &settings.prometheus.service,
                settings.prometheus.port,
            )
            .await?;
            (tunnel.url(), Some(tunnel))
        }
    };

    let params = AnalysisParams::new(&args.namespace, &args.deployment)
        .with_container(args.container)
        .with_range(range);

    let inspector = Arc::new(KubeInspector::new(client));
    let metrics = Arc::new(PrometheusSource::new(&prometheus_url)?);
    let logger = AnalysisLogger::new(&params.namespace, &params.deployment);
    let recommender = Recommender::new(inspector, metrics, RecommenderConfig::default(), logger);

    info!(
        namespace = %params.namespace,
        deployment = %params.deployment,
        range = %params.range,
        "analyzing deployment"
    );

    let recommendations = match args.target {
        Target::All => recommender.calculate_for_all(&params).await?,
        Target::Main => AllRecommendations {
            main_containers: recommender.calculate_for_deployment(&params).await?,
            init_containers: Vec::new(),
        },
        Target::Init => AllRecommendations {
            main_containers: Vec::new(),
            init_containers: recommender.calculate_for_init_containers(&params).await?,
        },
    };

    output::print_recommendations(&recommendations, args.format, silent)
}

fn run_init_config(config_path: Option<&str>) -> Result<()> {
    let path = config::write_default_config(config_path)?;
    output::print_success(&format!("Wrote default config to {}", path.display()));
    Ok(())
}
