//! `isles-train`: runs the ISLES segmentation training pipeline.
//!
//! Usage:
//!   isles-train --config isles.toml --output /tmp/out
//!
//! Exit status is 0 on success, 2 when the configuration file does not
//! exist (or the arguments are invalid), 1 for any other failure.

use std::path::PathBuf;
use std::process;

use anyhow::Context as _;
use clap::Parser;
use isles_core::launcher::{self, RunRequest};
use isles_core::logging::{init_tracing, LogConfig, LogLevel};
use isles_core::modules::ConfigModuleFactory;
use isles_core::orchestrator::{FsDirCreator, RunError};
use isles_core::RunReport;

/// Train an ischemic stroke lesion segmentation model.
#[derive(Parser)]
#[command(name = "isles-train", version, about)]
struct Cli {
    /// Configuration file describing the pipeline collaborators.
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,

    /// Output directory; created if missing.
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Fail if the output directory cannot be created.
    #[arg(long)]
    strict_output_dir: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Do not write train.log into the output directory.
    #[arg(long)]
    no_log_file: bool,
}

fn main() {
    let cli = Cli::parse();

    init_tracing(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    });

    match run(cli) {
        Ok(report) => print_summary(&report),
        Err(err) => {
            let code = match err.downcast_ref::<RunError>() {
                Some(RunError::ConfigMissing(path)) => {
                    eprintln!("Configuration file does not exist! ({})", path.display());
                    2
                }
                Some(run_err) => {
                    eprintln!("Error: {:#}", err);
                    run_err.exit_code()
                }
                None => {
                    eprintln!("Error: {:#}", err);
                    1
                }
            };
            process::exit(code);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<RunReport> {
    let log_config = if cli.verbose {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };

    tracing::debug!(
        "Starting run: config={}, output={}",
        cli.config.display(),
        cli.output.display()
    );

    let request = RunRequest::new(&cli.config, &cli.output)
        .strict_output_dir(cli.strict_output_dir)
        .log_config(log_config)
        .log_file(!cli.no_log_file)
        .console(Box::new(|line: &str| println!("{}", line)));

    let report = launcher::run(request, &ConfigModuleFactory, &FsDirCreator)
        .with_context(|| format!("Training run with {} failed", cli.config.display()))?;
    Ok(report)
}

fn print_summary(report: &RunReport) {
    let pipeline = &report.pipeline;
    println!();
    println!(
        "Completed {} steps in {:.1} s",
        pipeline.steps.len(),
        pipeline.total_duration_ms() as f64 / 1000.0
    );
    println!(
        "Cases: {} train / {} validation",
        pipeline.train_cases, pipeline.validation_cases
    );
    if let Some(scores) = pipeline.scores.as_ref() {
        if let Some(mean) = scores.mean_dice() {
            println!("Mean Dice ({}): {:.4}", scores.subset, mean);
        }
        if let Some((case_id, dice)) = scores.worst_case() {
            println!("Worst case: {} ({:.4})", case_id, dice);
        }
    }
    println!("Output: {}", report.out_dir.display());
}
