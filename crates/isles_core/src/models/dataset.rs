//! Dataset handle: case manifest plus train/validation partition.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::subset::Subset;

/// Errors raised when the dataset is populated or queried inconsistently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("manifest contains no cases")]
    Empty,

    #[error("case with empty id")]
    EmptyId,

    #[error("duplicate case id '{0}'")]
    DuplicateCase(String),

    #[error("case '{0}' lists no modalities")]
    NoModalities(String),

    #[error("partition references unknown case '{0}'")]
    UnknownCase(String),

    #[error("case '{0}' appears in both partitions")]
    OverlappingPartition(String),

    #[error("partition leaves {missing} case(s) unassigned")]
    IncompletePartition { missing: usize },

    #[error("'{0}' subset requested before the train/validation split")]
    NotSplit(Subset),
}

/// One training case: a set of co-registered modalities and an optional
/// ground-truth lesion mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    /// Modality name (e.g. `DWI`, `ADC`) to image path.
    pub modalities: BTreeMap<String, PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesion_mask: Option<PathBuf>,
}

impl Case {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            modalities: BTreeMap::new(),
            lesion_mask: None,
        }
    }

    /// Add a modality (builder pattern).
    pub fn with_modality(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.modalities.insert(name.into(), path.into());
        self
    }

    pub fn with_lesion_mask(mut self, path: impl Into<PathBuf>) -> Self {
        self.lesion_mask = Some(path.into());
        self
    }

    /// Every image path this case references.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.modalities.values().chain(self.lesion_mask.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Partition {
    train: Vec<String>,
    valid: Vec<String>,
}

/// The training/validation manifest.
///
/// Populated by the database stage, partitioned in place by the split,
/// then only read.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    cases: BTreeMap<String, Case>,
    partition: Option<Partition>,
}

impl Dataset {
    /// Create an empty dataset handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the manifest contents. Any previous split is discarded.
    pub fn set_cases(&mut self, cases: Vec<Case>) -> Result<(), DatasetError> {
        if cases.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut by_id = BTreeMap::new();
        for case in cases {
            if case.id.trim().is_empty() {
                return Err(DatasetError::EmptyId);
            }
            if case.modalities.is_empty() {
                return Err(DatasetError::NoModalities(case.id));
            }
            if by_id.contains_key(&case.id) {
                return Err(DatasetError::DuplicateCase(case.id));
            }
            by_id.insert(case.id.clone(), case);
        }

        self.cases = by_id;
        self.partition = None;
        Ok(())
    }

    /// All cases, ordered by id.
    pub fn cases(&self) -> impl Iterator<Item = &Case> {
        self.cases.values()
    }

    pub fn case(&self, id: &str) -> Option<&Case> {
        self.cases.get(id)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn is_split(&self) -> bool {
        self.partition.is_some()
    }

    /// Record a train/validation partition.
    ///
    /// The two lists must be disjoint and together cover every case.
    pub fn apply_split(
        &mut self,
        train: Vec<String>,
        valid: Vec<String>,
    ) -> Result<(), DatasetError> {
        let mut seen = BTreeSet::new();
        for id in train.iter().chain(valid.iter()) {
            if !self.cases.contains_key(id) {
                return Err(DatasetError::UnknownCase(id.clone()));
            }
            if !seen.insert(id.as_str()) {
                return Err(DatasetError::OverlappingPartition(id.clone()));
            }
        }
        if seen.len() != self.cases.len() {
            return Err(DatasetError::IncompletePartition {
                missing: self.cases.len() - seen.len(),
            });
        }

        let mut train = train;
        let mut valid = valid;
        train.sort();
        valid.sort();
        self.partition = Some(Partition { train, valid });
        Ok(())
    }

    /// Case ids of one partition.
    pub fn subset_ids(&self, subset: Subset) -> Result<&[String], DatasetError> {
        let partition = self.partition.as_ref().ok_or(DatasetError::NotSplit(subset))?;
        Ok(match subset {
            Subset::Train => &partition.train,
            Subset::Validation => &partition.valid,
        })
    }

    /// Cases of one partition, ordered by id.
    pub fn subset(&self, subset: Subset) -> Result<Vec<&Case>, DatasetError> {
        Ok(self
            .subset_ids(subset)?
            .iter()
            .filter_map(|id| self.cases.get(id))
            .collect())
    }

    pub fn subset_len(&self, subset: Subset) -> Result<usize, DatasetError> {
        self.subset_ids(subset).map(|ids| ids.len())
    }
}
