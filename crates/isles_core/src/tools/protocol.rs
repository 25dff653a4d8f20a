//! Request/response files exchanged with tool-backed collaborators.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Case, CaseMetaUpdate, MetaData, Subset};
use crate::orchestrator::{StageError, StageResult};

/// Request written to `<role>/<operation>.request.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolRequest<'a> {
    pub operation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subset: Option<Subset>,
    pub out_dir: &'a Path,
    pub params: &'a BTreeMap<String, Value>,
    /// Requested partition, or every case when no subset applies.
    pub cases: Vec<&'a Case>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionIds<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a MetaData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_extractor: Option<Value>,
}

/// Train/validation case ids, for operations that see the whole dataset.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PartitionIds<'a> {
    pub train: &'a [String],
    pub valid: &'a [String],
}

impl<'a> ToolRequest<'a> {
    pub fn new(
        operation: &'a str,
        out_dir: &'a Path,
        params: &'a BTreeMap<String, Value>,
        cases: Vec<&'a Case>,
    ) -> Self {
        Self {
            operation,
            subset: None,
            out_dir,
            params,
            cases,
            partition: None,
            metadata: None,
            preprocessor: None,
            patch_extractor: None,
        }
    }

    pub fn subset(mut self, subset: Subset) -> Self {
        self.subset = Some(subset);
        self
    }

    pub fn partition(mut self, train: &'a [String], valid: &'a [String]) -> Self {
        self.partition = Some(PartitionIds { train, valid });
        self
    }

    pub fn metadata(mut self, metadata: &'a MetaData) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn preprocessor(mut self, parameters: Value) -> Self {
        self.preprocessor = Some(parameters);
        self
    }

    pub fn patch_extractor(mut self, parameters: Value) -> Self {
        self.patch_extractor = Some(parameters);
        self
    }

    /// Serialize the request to `path`.
    pub fn write_to(&self, path: &Path) -> StageResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StageError::protocol("tool request", e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| StageError::io(format!("writing {}", path.display()), e))
    }
}

/// Response read from `<role>/<operation>.response.json`.
///
/// Every field is optional; a tool that only persists files may skip the
/// response entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    #[serde(default)]
    pub metadata: BTreeMap<String, CaseMetaUpdate>,
    #[serde(default)]
    pub artifacts: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    /// Set by the tool to report a model-side failure.
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolResponse {
    /// Read a response file. A missing file is an empty response.
    pub fn read_from(path: &Path) -> StageResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(StageError::io(format!("reading {}", path.display()), e)),
        };

        let response: Self = serde_json::from_str(&content).map_err(|e| {
            StageError::protocol(format!("tool response {}", path.display()), e.to_string())
        })?;

        match response.error {
            Some(ref message) => Err(StageError::model(message.clone())),
            None => Ok(response),
        }
    }
}
