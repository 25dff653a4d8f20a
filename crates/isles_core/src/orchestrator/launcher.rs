//! Entry point for a complete training run.
//!
//! Checks the configuration path, prepares the output directory, builds
//! the collaborators and hands them to [`TrainingPipelineDriver`].

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use super::driver::TrainingPipelineDriver;
use super::errors::RunError;
use super::output_dir::{prepare_output_dir, DirCreator, OutputDirStatus};
use super::types::{Context, RunReport};
use crate::logging::{ConsoleCallback, LogConfig, RunLoggerBuilder};
use crate::modules::ModuleFactory;

/// Log file written inside the output directory.
pub const LOG_FILE_NAME: &str = "train.log";

/// Summary of a successful run, written inside the output directory.
pub const RUN_REPORT_FILE_NAME: &str = "run_report.json";

/// Parameters of one launch.
pub struct RunRequest {
    pub config_path: PathBuf,
    pub out_dir: PathBuf,
    /// Treat output directory creation failure as fatal.
    pub strict_output_dir: bool,
    pub log_config: LogConfig,
    /// Write `<out_dir>/train.log`.
    pub log_file: bool,
    pub console: Option<ConsoleCallback>,
}

impl RunRequest {
    pub fn new(config_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            out_dir: out_dir.into(),
            strict_output_dir: false,
            log_config: LogConfig::default(),
            log_file: true,
            console: None,
        }
    }

    pub fn strict_output_dir(mut self, strict: bool) -> Self {
        self.strict_output_dir = strict;
        self
    }

    pub fn log_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    pub fn log_file(mut self, enabled: bool) -> Self {
        self.log_file = enabled;
        self
    }

    pub fn console(mut self, callback: ConsoleCallback) -> Self {
        self.console = Some(callback);
        self
    }
}

/// Run the training pipeline.
///
/// A missing configuration file ends the run before anything is built. A
/// failure to create the output directory is only a warning unless the
/// request is strict; step 1 still runs and any stage that needs the
/// directory reports its own error.
pub fn run(
    request: RunRequest,
    factory: &dyn ModuleFactory,
    dirs: &dyn DirCreator,
) -> Result<RunReport, RunError> {
    if !request.config_path.exists() {
        return Err(RunError::ConfigMissing(request.config_path));
    }

    let out_dir_status = prepare_output_dir(&request.out_dir, dirs);
    if let OutputDirStatus::Failed(ref reason) = out_dir_status {
        if request.strict_output_dir {
            return Err(RunError::OutputDir {
                path: request.out_dir,
                reason: reason.clone(),
            });
        }
        tracing::debug!(
            "Output directory {} cannot be created: {}",
            request.out_dir.display(),
            reason
        );
    }

    let modules = factory.create(&request.config_path)?;

    let mut builder = RunLoggerBuilder::new("train").config(request.log_config);
    if request.log_file && !out_dir_status.is_failed() {
        builder = builder.log_file(request.out_dir.join(LOG_FILE_NAME));
    }
    if let Some(console) = request.console {
        builder = builder.console(console);
    }
    let logger = Arc::new(builder.build());

    if let OutputDirStatus::Failed(ref reason) = out_dir_status {
        logger.warn(&format!(
            "Output directory {} cannot be created: {}",
            request.out_dir.display(),
            reason
        ));
    }
    logger.info(&format!("Configuration: {}", request.config_path.display()));
    logger.info(&format!("Output directory: {}", request.out_dir.display()));

    let ctx = Context::new(&request.out_dir, Arc::clone(&logger));
    let mut driver = TrainingPipelineDriver::new(modules);
    let result = driver.run(&ctx);

    let report = result.map(|pipeline| RunReport {
        out_dir: ctx.out_dir,
        out_dir_status,
        pipeline,
    });
    if let Ok(ref report) = report {
        if let Err(e) = write_run_report(report) {
            logger.warn(&format!("Run report not written: {}", e));
        }
    }
    logger.flush();

    Ok(report?)
}

fn write_run_report(report: &RunReport) -> io::Result<()> {
    let path = report.out_dir.join(RUN_REPORT_FILE_NAME);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;
    tracing::debug!("Run report written to {}", path.display());
    Ok(())
}
