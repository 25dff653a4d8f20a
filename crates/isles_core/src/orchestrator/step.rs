//! The fixed step sequence of a training run.

use std::fmt;

use serde::Serialize;

use crate::modules::Role;

/// One step of the training pipeline.
///
/// [`Step::ALL`] is the execution order; the driver never reorders,
/// skips, or repeats steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    LoadTrainingManifest,
    TrainValidationSplit,
    NormalizationParameters,
    BrainMasks,
    AlignmentParameters,
    Augmentation,
    LesionDistanceMaps,
    TrainAndValidate,
    ClassificationScores,
    PostprocessingParameters,
}

impl Step {
    /// Execution order.
    pub const ALL: [Step; 10] = [
        Step::LoadTrainingManifest,
        Step::TrainValidationSplit,
        Step::NormalizationParameters,
        Step::BrainMasks,
        Step::AlignmentParameters,
        Step::Augmentation,
        Step::LesionDistanceMaps,
        Step::TrainAndValidate,
        Step::ClassificationScores,
        Step::PostprocessingParameters,
    ];

    /// 1-based position in the run.
    pub fn number(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Operation name; also used for tool request/response file names.
    pub fn name(&self) -> &'static str {
        match self {
            Step::LoadTrainingManifest => "load_training_manifest",
            Step::TrainValidationSplit => "train_validation_split",
            Step::NormalizationParameters => "compute_normalization_parameters",
            Step::BrainMasks => "compute_brain_masks",
            Step::AlignmentParameters => "compute_alignment_parameters",
            Step::Augmentation => "augment_data",
            Step::LesionDistanceMaps => "compute_lesion_distance_maps",
            Step::TrainAndValidate => "train_and_validate",
            Step::ClassificationScores => "compute_classification_scores",
            Step::PostprocessingParameters => "determine_parameters",
        }
    }

    /// Progress line announced when the step starts.
    pub fn description(&self) -> &'static str {
        match self {
            Step::LoadTrainingManifest => "Loading training data...",
            Step::TrainValidationSplit => "Creating train/validation split...",
            Step::NormalizationParameters => "Getting normalization parameters...",
            Step::BrainMasks => "Computing brain masks...",
            Step::AlignmentParameters => "Getting alignment parameters...",
            Step::Augmentation => "Data alignment and augmentation...",
            Step::LesionDistanceMaps => "Computing lesion distance maps...",
            Step::TrainAndValidate => "Segmentator training and validation...",
            Step::ClassificationScores => "Segmentator Dice score validation...",
            Step::PostprocessingParameters => "Determining postprocessing parameters...",
        }
    }

    /// Collaborator that executes the step.
    pub fn role(&self) -> Role {
        match self {
            Step::LoadTrainingManifest | Step::TrainValidationSplit => Role::Database,
            Step::NormalizationParameters | Step::AlignmentParameters => Role::Preprocessor,
            Step::BrainMasks | Step::LesionDistanceMaps => Role::MetaDataExtractor,
            Step::Augmentation => Role::Augmentator,
            Step::TrainAndValidate | Step::ClassificationScores => Role::Segmentator,
            Step::PostprocessingParameters => Role::Postprocessor,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
