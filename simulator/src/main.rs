use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod output;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "LArTPC wire-plane image simulator")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
    /// Load a workflow config from YAML
    #[arg(short, long)]
    path: Option<PathBuf>,
    /// Override the output directory
    #[arg(long)]
    output: Option<PathBuf>,
    /// Override the number of worker threads
    #[arg(long)]
    workers: Option<usize>,
    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Make a template workflow yaml file
    New {
        #[arg(short, long)]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let logger = env_logger::Builder::from_env(env_logger::Env::default()).build();
    let level = logger.filter();
    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger)
        .try_init()
        .context("initializing logging")?;
    log::set_max_level(level);
    let args = Args::parse();

    if let Some(Command::New { path }) = args.command {
        WorkflowConfig::write_template(&path)?;
        log::info!("wrote template config to {}", path.display());
        return Ok(());
    }

    let mut workflow_config = match &args.path {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    if let Some(output) = args.output {
        workflow_config.output_dir = output;
    }
    if let Some(workers) = args.workers {
        workflow_config.n_workers = workers;
    }
    if let Some(seed) = args.seed {
        workflow_config.simulation.seed = seed;
    }
    workflow_config
        .validate()
        .context("validating command-line overrides")?;

    let runner = Runner::with_progress(workflow_config, progress);
    let reports = runner.execute()?;

    for report in &reports {
        println!(
            "{} -> simulated {} ({} images), skipped {}, drifted electrons {}",
            report.label,
            report.metrics.simulated,
            report.events.len(),
            report.metrics.skipped,
            report.metrics.drifted_samples
        );
    }
    println!(
        "images written under {}",
        runner.config().output_dir.display()
    );

    Ok(())
}
