//! dotnet-publish build step
//!
//! Publishes a .NET application and replaces its source with the output

use anyhow::{Context, Result};
use clap::Parser;
use dotnet_publish::{BuildContext, BuildLogger, BuildOrchestrator, ConfigLoader};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Publish a .NET application in place of its source code
#[derive(Parser)]
#[command(name = "dotnet-publish")]
#[command(version)]
#[command(about = "Build step that publishes a .NET application", long_about = None)]
struct Cli {
    /// Layers directory
    #[arg(value_name = "LAYERS")]
    layers: Option<PathBuf>,

    /// Platform directory
    #[arg(value_name = "PLATFORM", default_value = "/platform")]
    platform: PathBuf,

    /// Build plan
    #[arg(value_name = "PLAN")]
    plan: Option<PathBuf>,

    /// Application working directory (defaults to current directory)
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Buildpack directory containing buildpack.toml
    #[arg(long, env = "CNB_BUILDPACK_DIR")]
    buildpack_dir: Option<PathBuf>,

    /// Abort dotnet publish after this many seconds
    #[arg(long, value_name = "SECS")]
    publish_timeout: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = match cli.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("could not determine working directory")?,
    };

    let config = ConfigLoader::from_env(&ConfigLoader::env_map(std::env::vars_os()));
    let buildpack_info = ConfigLoader::load_buildpack_info(cli.buildpack_dir.as_deref())?;

    tracing::debug!(
        layers = ?cli.layers,
        plan = ?cli.plan,
        working_dir = %working_dir.display(),
        "starting build"
    );

    let context = BuildContext {
        working_dir,
        platform_dir: cli.platform,
        buildpack_info,
    };

    let orchestrator = BuildOrchestrator::dotnet(
        &config,
        BuildLogger::stdout(),
        cli.publish_timeout.map(Duration::from_secs),
    );

    match orchestrator.run(&context, &config).await {
        Ok(report) => {
            tracing::debug!(elapsed_ms = report.elapsed_ms, "build step complete");
            Ok(())
        }
        Err(e) => {
            eprintln!("[{}] suggested actions:", e.code());
            if e.is_destructive() {
                eprintln!("  - The working directory was already modified and cannot be built again");
            }
            for action in e.suggested_actions() {
                eprintln!("  - {}", action);
            }
            Err(e.into())
        }
    }
}
