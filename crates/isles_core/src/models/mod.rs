//! Data model shared between the driver and its collaborators.
//!
//! - [`Dataset`]: the case manifest and its train/validation partition
//! - [`MetaData`]: per-case derived data accumulated by the pipeline
//! - [`Subset`]: partition selector
//! - [`ScoreReport`]: per-case Dice scores from the segmentator

mod dataset;
mod metadata;
mod scores;
mod subset;

pub use dataset::{Case, Dataset, DatasetError};
pub use metadata::{CaseMeta, CaseMetaUpdate, MetaData};
pub use scores::ScoreReport;
pub use subset::Subset;
