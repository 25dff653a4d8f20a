//! Core types for the training pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::output_dir::OutputDirStatus;
use super::step::Step;
use crate::logging::RunLogger;
use crate::models::ScoreReport;
use crate::modules::Role;

/// Read-only context passed to every collaborator operation.
///
/// Mutable run state (dataset, metadata) is passed separately.
pub struct Context {
    /// Output directory; the only place collaborators persist artifacts.
    pub out_dir: PathBuf,
    /// Run logger.
    pub logger: Arc<RunLogger>,
}

impl Context {
    /// A relative `out_dir` is resolved against the current directory, so
    /// paths handed to tools stay valid whatever their working directory.
    pub fn new(out_dir: impl Into<PathBuf>, logger: Arc<RunLogger>) -> Self {
        let out_dir = out_dir.into();
        Self {
            out_dir: std::path::absolute(&out_dir).unwrap_or(out_dir),
            logger,
        }
    }

    /// Context with a silent logger.
    pub fn with_discard_logger(out_dir: impl Into<PathBuf>) -> Self {
        Self::new(out_dir, Arc::new(RunLogger::discard()))
    }

    /// Directory reserved for one collaborator's artifacts.
    pub fn role_dir(&self, role: Role) -> PathBuf {
        self.out_dir.join(role.section_name())
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

/// Timing record for one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub role: Role,
    pub duration_ms: u64,
}

/// Summary of a completed driver run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunResult {
    pub steps: Vec<StepRecord>,
    pub train_cases: usize,
    pub validation_cases: usize,
    /// Scores produced by the classification step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreReport>,
}

impl PipelineRunResult {
    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|r| r.step.name()).collect()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.steps.iter().map(|r| r.duration_ms).sum()
    }
}

/// Outcome of a full launch: output directory preparation plus the driver run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub out_dir: PathBuf,
    pub out_dir_status: OutputDirStatus,
    pub pipeline: PipelineRunResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_out_dir_is_resolved() {
        let ctx = Context::with_discard_logger(Path::new("runs").join("first"));

        assert!(ctx.out_dir().is_absolute());
        assert!(ctx.out_dir().ends_with("runs/first"));
        assert!(ctx.role_dir(Role::Segmentator).is_absolute());
    }

    #[test]
    fn absolute_out_dir_is_kept() {
        let ctx = Context::with_discard_logger("/tmp/isles-out");
        assert_eq!(ctx.out_dir(), Path::new("/tmp/isles-out"));
    }
}
