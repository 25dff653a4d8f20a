//! ISLES Core - training pipeline driver for ischemic stroke lesion segmentation.
//!
//! This crate sequences the stages of a segmentation training run. The
//! imaging work itself (normalization, alignment, augmentation, the model,
//! post-processing) is owned by collaborators reached through the traits in
//! [`modules`]. It can be used by the `isles-train` binary or embedded in
//! another tool.

pub mod config;
pub mod logging;
pub mod models;
pub mod modules;
pub mod orchestrator;
pub mod tools;

pub use models::{Case, Dataset, MetaData, Subset};
pub use orchestrator::{launcher, RunReport, Step, TrainingPipelineDriver};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
