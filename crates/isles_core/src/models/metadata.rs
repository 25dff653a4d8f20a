//! Metadata handle: per-case data derived by the pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Derived data for one case.
///
/// Each field is written by exactly one stage; later stages only read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brain_mask: Option<PathBuf>,
    /// Alignment parameters as reported by the preprocessor tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesion_distance_map: Option<PathBuf>,
}

/// Partial update for a case, as reported by a collaborator.
///
/// `None` fields leave the existing value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseMetaUpdate {
    #[serde(default)]
    pub brain_mask: Option<PathBuf>,
    #[serde(default)]
    pub alignment: Option<serde_json::Value>,
    #[serde(default)]
    pub lesion_distance_map: Option<PathBuf>,
}

impl CaseMetaUpdate {
    pub fn is_empty(&self) -> bool {
        self.brain_mask.is_none() && self.alignment.is_none() && self.lesion_distance_map.is_none()
    }
}

/// Metadata handle shared across stages. Starts empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaData {
    cases: BTreeMap<String, CaseMeta>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, case_id: &str) -> Option<&CaseMeta> {
        self.cases.get(case_id)
    }

    /// Merge an update into a case entry, creating it if needed.
    pub fn apply(&mut self, case_id: &str, update: CaseMetaUpdate) {
        let entry = self.cases.entry(case_id.to_string()).or_default();
        if let Some(mask) = update.brain_mask {
            entry.brain_mask = Some(mask);
        }
        if let Some(alignment) = update.alignment {
            entry.alignment = Some(alignment);
        }
        if let Some(map) = update.lesion_distance_map {
            entry.lesion_distance_map = Some(map);
        }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CaseMeta)> {
        self.cases.iter()
    }

    /// Number of cases that have a brain mask recorded.
    pub fn brain_mask_count(&self) -> usize {
        self.cases.values().filter(|m| m.brain_mask.is_some()).count()
    }

    /// Number of cases that have a lesion distance map recorded.
    pub fn distance_map_count(&self) -> usize {
        self.cases
            .values()
            .filter(|m| m.lesion_distance_map.is_some())
            .count()
    }
}
