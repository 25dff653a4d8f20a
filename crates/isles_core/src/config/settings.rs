//! Settings struct with TOML-based sections.
//!
//! Each collaborator role has its own table. Sections are optional at the
//! parsing level; the module factory decides which ones are required.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::Role;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<ToolSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augmentator: Option<ToolSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data_extractor: Option<ToolSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_extractor: Option<PatchExtractorSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentator: Option<ToolSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postprocessor: Option<ToolSettings>,
}

impl Settings {
    /// Top-level table names this file understands.
    pub fn known_sections() -> Vec<&'static str> {
        Role::ALL.iter().map(|r| r.section_name()).collect()
    }

    /// Tool section for a tool-backed role.
    pub fn tool(&self, role: Role) -> Option<&ToolSettings> {
        match role {
            Role::Preprocessor => self.preprocessor.as_ref(),
            Role::Augmentator => self.augmentator.as_ref(),
            Role::MetaDataExtractor => self.meta_data_extractor.as_ref(),
            Role::Segmentator => self.segmentator.as_ref(),
            Role::Postprocessor => self.postprocessor.as_ref(),
            Role::Database | Role::PatchExtractor => None,
        }
    }
}

/// Case manifest location and split policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// JSON manifest; relative paths resolve against the config file.
    pub manifest: PathBuf,

    /// Fraction of cases held out for validation, in `[0, 1)`.
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f64,

    /// Seed for the deterministic split order.
    #[serde(default)]
    pub seed: u64,

    /// Verify that every referenced image exists when loading.
    #[serde(default = "default_true")]
    pub check_files: bool,
}

fn default_validation_fraction() -> f64 {
    0.2
}

fn default_true() -> bool {
    true
}

/// External program implementing a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Executable name or path.
    pub program: String,

    /// Arguments placed before the protocol arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the child process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory for the child process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Free-form parameters forwarded verbatim in every request.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl ToolSettings {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Patch sampling parameters (no program; nothing is executed for this role).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchExtractorSettings {
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}
