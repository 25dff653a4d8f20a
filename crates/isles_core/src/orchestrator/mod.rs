//! Training pipeline orchestration.
//!
//! The driver runs a fixed sequence of ten steps against the injected
//! collaborators, threading the dataset and metadata handles through them.
//!
//! # Architecture
//!
//! ```text
//! launcher::run
//!     ├── config check          (missing config: exit 2, nothing built)
//!     ├── prepare_output_dir    (OutputDirStatus)
//!     ├── ModuleFactory::create (ModuleObjects)
//!     └── TrainingPipelineDriver::run
//!             ├── 1  load_training_manifest
//!             ├── 2  train_validation_split
//!             ├── 3  compute_normalization_parameters
//!             ├── ...
//!             └── 10 determine_parameters
//! ```
//!
//! # Example
//!
//! ```ignore
//! use isles_core::orchestrator::{Context, TrainingPipelineDriver};
//! use isles_core::modules::create_module_objects_from_config;
//!
//! let modules = create_module_objects_from_config(Path::new("isles.toml"))?;
//! let mut driver = TrainingPipelineDriver::new(modules);
//! let ctx = Context::new("/tmp/out", logger);
//! let result = driver.run(&ctx)?;
//! println!("Steps: {:?}", result.step_names());
//! ```

mod driver;
mod errors;
pub mod launcher;
mod output_dir;
mod step;
mod types;

pub use driver::TrainingPipelineDriver;
pub use errors::{PipelineError, PipelineResult, RunError, StageError, StageResult};
pub use output_dir::{prepare_output_dir, DirCreator, FsDirCreator, OutputDirStatus};
pub use step::Step;
pub use types::{Context, PipelineRunResult, RunReport, StepRecord};
