//! Pipeline collaborators.
//!
//! The driver owns no imaging logic. Each stage is delegated to one of seven
//! collaborators, described here as traits so that any backend (the
//! external-tool backends in this crate, an embedded implementation, a test
//! double) can be injected.
//!
//! ```text
//! ModuleObjects
//!     ├── database             manifest load, train/validation split
//!     ├── preprocessor         normalization + alignment parameters
//!     ├── meta_data_extractor  brain masks, lesion distance maps
//!     ├── augmentator          augmented samples
//!     ├── patch_extractor      patch sampling parameters (passive)
//!     ├── segmentator          training/validation, Dice scores
//!     └── postprocessor        post-processing parameters
//! ```

mod database;
mod factory;
mod tool_backed;

pub use database::ManifestDatabase;
pub use factory::{
    create_module_objects_from_config, ConfigModuleFactory, FactoryError, ModuleFactory,
};
pub use tool_backed::{
    ToolAugmentator, ToolMetaDataExtractor, ToolPostprocessor, ToolPreprocessor,
    ToolSegmentator, StaticPatchExtractor,
};

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::models::{Dataset, MetaData, ScoreReport, Subset};
use crate::orchestrator::{Context, StageResult};

/// Collaborator roles, one per configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Database,
    Preprocessor,
    Augmentator,
    MetaDataExtractor,
    PatchExtractor,
    Segmentator,
    Postprocessor,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Database,
        Role::Preprocessor,
        Role::Augmentator,
        Role::MetaDataExtractor,
        Role::PatchExtractor,
        Role::Segmentator,
        Role::Postprocessor,
    ];

    /// Configuration table name and artifact subdirectory.
    pub fn section_name(&self) -> &'static str {
        match self {
            Role::Database => "database",
            Role::Preprocessor => "preprocessor",
            Role::Augmentator => "augmentator",
            Role::MetaDataExtractor => "meta_data_extractor",
            Role::PatchExtractor => "patch_extractor",
            Role::Segmentator => "segmentator",
            Role::Postprocessor => "postprocessor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section_name())
    }
}

/// Loads the case manifest and partitions it.
pub trait Database: Send {
    /// Populate `dataset` with the training cases.
    fn load_training_manifest(&mut self, dataset: &mut Dataset, ctx: &Context) -> StageResult<()>;

    /// Partition `dataset` into train and validation subsets, in place.
    fn train_validation_split(&mut self, dataset: &mut Dataset, ctx: &Context) -> StageResult<()>;
}

/// Computes intensity normalization and spatial alignment parameters.
///
/// The computed state is kept by the preprocessor and handed to later
/// stages through [`Preprocessor::parameters`].
pub trait Preprocessor: Send {
    fn compute_normalization_parameters(
        &mut self,
        dataset: &Dataset,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()>;

    fn compute_alignment_parameters(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()>;

    /// Current parameter state, as consumed by downstream stages.
    fn parameters(&self) -> Value;
}

/// Produces augmented training samples.
pub trait Augmentator: Send {
    fn augment_data(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        ctx: &Context,
        preprocessor: &dyn Preprocessor,
        subset: Subset,
    ) -> StageResult<()>;
}

/// Derives per-case data (brain masks, lesion distance maps) into the
/// metadata handle.
pub trait MetaDataExtractor: Send {
    fn compute_brain_masks(
        &mut self,
        dataset: &Dataset,
        metadata: &mut MetaData,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()>;

    fn compute_lesion_distance_maps(
        &mut self,
        dataset: &Dataset,
        metadata: &mut MetaData,
        ctx: &Context,
    ) -> StageResult<()>;
}

/// Patch sampling description, consumed by the segmentator.
pub trait PatchExtractor: Send {
    fn parameters(&self) -> Value;
}

/// Trains the segmentation model and scores it.
pub trait Segmentator: Send {
    fn train_and_validate(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        preprocessor: &dyn Preprocessor,
        patch_extractor: &dyn PatchExtractor,
        ctx: &Context,
    ) -> StageResult<()>;

    fn compute_classification_scores(
        &mut self,
        dataset: &Dataset,
        preprocessor: &dyn Preprocessor,
        patch_extractor: &dyn PatchExtractor,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<ScoreReport>;
}

/// Tunes post-processing parameters on the trained model's output.
pub trait Postprocessor: Send {
    fn determine_parameters(
        &mut self,
        dataset: &Dataset,
        preprocessor: &dyn Preprocessor,
        ctx: &Context,
    ) -> StageResult<()>;
}

/// The seven collaborators of a run, keyed by role.
pub struct ModuleObjects {
    pub database: Box<dyn Database>,
    pub preprocessor: Box<dyn Preprocessor>,
    pub augmentator: Box<dyn Augmentator>,
    pub meta_data_extractor: Box<dyn MetaDataExtractor>,
    pub patch_extractor: Box<dyn PatchExtractor>,
    pub segmentator: Box<dyn Segmentator>,
    pub postprocessor: Box<dyn Postprocessor>,
}
