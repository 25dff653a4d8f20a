//! Config manager for loading and validating the run configuration.
//!
//! Key features:
//! - Missing file is a distinct error (`ConfigError::NotFound`)
//! - Unknown top-level sections are collected and reported, not rejected
//! - Relative paths resolve against the config file's directory

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::DocumentMut;

use super::settings::Settings;

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse config document: {0}")]
    DocumentError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Loads the run configuration from a TOML file.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
    unknown_sections: Vec<String>,
}

impl ConfigManager {
    /// Create a manager for the given config file path.
    ///
    /// Does not load the config - call `load()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
            unknown_sections: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Top-level sections found in the file that no collaborator uses.
    pub fn unknown_sections(&self) -> &[String] {
        &self.unknown_sections
    }

    /// Load config from file.
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let (settings, unknown) = Self::parse_and_validate(&content)?;

        for section in &unknown {
            tracing::warn!(
                "Ignoring unknown section [{}] in {}",
                section,
                self.config_path.display()
            );
        }

        self.settings = settings;
        self.unknown_sections = unknown;
        Ok(())
    }

    /// Directory containing the config file.
    pub fn config_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Resolve a path from the config: absolute paths are kept, relative
    /// ones are taken relative to the config file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir().join(path)
        }
    }

    /// Parse settings and list unknown top-level keys.
    fn parse_and_validate(content: &str) -> ConfigResult<(Settings, Vec<String>)> {
        let doc: DocumentMut = content.parse()?;
        let settings: Settings = toml::from_str(content)?;

        let known = Settings::known_sections();
        let unknown = doc
            .iter()
            .map(|(key, _)| key)
            .filter(|key| !known.iter().any(|k| k == key))
            .map(str::to_string)
            .collect();

        Ok((settings, unknown))
    }
}
