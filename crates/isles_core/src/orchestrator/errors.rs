//! Error types for the training pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Collaborator operation → Detail

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::step::Step;
use crate::models::DatasetError;
use crate::modules::FactoryError;

/// Error raised by a collaborator while executing one operation.
#[derive(Error, Debug)]
pub enum StageError {
    /// The dataset or a case manifest is inconsistent.
    #[error("Data error: {0}")]
    Data(String),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The model side (training, scoring) reported a failure.
    #[error("Model error: {0}")]
    Model(String),

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    ToolFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// A tool produced output that could not be understood.
    #[error("Failed to parse {what}: {message}")]
    Protocol { what: String, message: String },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    Precondition(String),
}

impl StageError {
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn tool_failed(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn protocol(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}

impl From<DatasetError> for StageError {
    fn from(err: DatasetError) -> Self {
        Self::Data(err.to_string())
    }
}

/// A step of the pipeline failed; the run stopped there.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Step {} '{}' failed: {source}", .step.number(), .step.name())]
    StepFailed {
        step: Step,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    pub fn step_failed(step: Step, source: StageError) -> Self {
        Self::StepFailed { step, source }
    }

    /// The step at which the run stopped.
    pub fn step(&self) -> Step {
        match self {
            Self::StepFailed { step, .. } => *step,
        }
    }
}

/// Top-level failure of a training run.
#[derive(Error, Debug)]
pub enum RunError {
    /// The configuration file does not exist. Nothing was constructed.
    #[error("Configuration file does not exist: {}", .0.display())]
    ConfigMissing(PathBuf),

    /// The output directory could not be created and the run was strict about it.
    #[error("Output directory {} cannot be created: {reason}", .path.display())]
    OutputDir { path: PathBuf, reason: String },

    /// Collaborators could not be built from the configuration.
    #[error("Failed to create pipeline modules: {0}")]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl RunError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigMissing(_) => 2,
            Self::OutputDir { .. } | Self::Factory(_) | Self::Pipeline(_) => 1,
        }
    }
}

/// Result type for collaborator operations.
pub type StageResult<T> = Result<T, StageError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_displays_context() {
        let err = StageError::tool_failed("python3", 3, "CUDA out of memory");
        let msg = err.to_string();
        assert!(msg.contains("python3"));
        assert!(msg.contains("exit code 3"));
        assert!(msg.contains("CUDA out of memory"));
    }

    #[test]
    fn pipeline_error_names_step() {
        let err = PipelineError::step_failed(Step::BrainMasks, StageError::data("no DWI"));
        let msg = err.to_string();
        assert!(msg.contains("Step 4"));
        assert!(msg.contains("compute_brain_masks"));
        assert!(msg.contains("no DWI"));
        assert_eq!(err.step(), Step::BrainMasks);
    }

    #[test]
    fn dataset_errors_become_data_errors() {
        let err: StageError = DatasetError::Empty.into();
        assert!(matches!(err, StageError::Data(_)));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(RunError::ConfigMissing("cfg.toml".into()).exit_code(), 2);
        let pipeline = PipelineError::step_failed(Step::Augmentation, StageError::model("x"));
        assert_eq!(RunError::from(pipeline).exit_code(), 1);
    }
}
