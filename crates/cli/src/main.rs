use crate::{
    commands::{Commands, WatermarkCommand},
    error::CliError,
};
use clap::Parser;
use engine_config::{
    env::EnvManager,
    settings::{self, PipelineSettings, Settings},
};
use engine_core::{
    observer::TracingObserver,
    watermark::{WatermarkStore, file_store::FileWatermarkStore},
};
use engine_runtime::execution::{factory, orchestrator::Orchestrator};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "replica-sync",
    version,
    about = "Anonymized sync of production stores into a QA replica"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Load variables from this .env file (default: ./.env when present)"
    )]
    env_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "If specified, writes the JSON report to this file instead of stdout"
    )]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let env = load_env(cli.env_file.as_deref())?;

    tokio::select! {
        result = execute(cli.command, &env, cli.output.as_deref()) => result,
        signal = shutdown::wait_for_signal() => {
            warn!(signal, "Interrupted, watermark left unchanged");
            std::process::exit(shutdown::INTERRUPTED_EXIT_CODE);
        }
    }
}

fn load_env(env_file: Option<&Path>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::new();
    match env_file {
        Some(path) => env.load_from_file(path)?,
        None if Path::new(".env").exists() => env.load_from_file(".env")?,
        None => {}
    }
    settings::log_effective(&env);
    Ok(env)
}

fn orchestrator(env: &EnvManager) -> Result<Orchestrator, CliError> {
    let settings = Settings::from_env(env)?;
    Ok(factory::build_orchestrator(&settings, Arc::new(TracingObserver))?)
}

async fn execute(command: Commands, env: &EnvManager, output: Option<&Path>) -> Result<(), CliError> {
    match command {
        Commands::Run => {
            let summary = orchestrator(env)?.run_full_pipeline().await?;
            output::emit(&summary, output).await?;
            if !summary.success {
                return Err(CliError::RunFailed(summary.error.unwrap_or_default()));
            }
        }
        Commands::Extract => output::emit(&orchestrator(env)?.extract().await?, output).await?,
        Commands::Transform => output::emit(&orchestrator(env)?.transform().await?, output).await?,
        Commands::Load => output::emit(&orchestrator(env)?.load().await?, output).await?,
        Commands::Assets => output::emit(&orchestrator(env)?.migrate_assets().await?, output).await?,
        Commands::Stats {
            collections,
            tables,
        } => {
            let stats = orchestrator(env)?
                .destination_stats(&collections, &tables)
                .await?;
            output::emit(&stats, output).await?;
        }
        Commands::Watermark { command } => {
            // Only the pipeline keys are needed here, not store credentials.
            let pipeline = PipelineSettings::from_env(env)?;
            let store = FileWatermarkStore::new(&pipeline.watermark_file);
            match command {
                WatermarkCommand::Show => match store.get_last().await? {
                    Some(at) => println!("{}", at.to_rfc3339()),
                    None => println!("none (next run extracts everything)"),
                },
                WatermarkCommand::Reset => {
                    store.reset().await?;
                    info!(path = %store.path().display(), "Watermark reset");
                }
            }
        }
    }

    Ok(())
}
