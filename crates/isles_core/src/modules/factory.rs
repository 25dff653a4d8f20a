//! Builds the seven collaborators of a run from a configuration file.

use std::path::Path;

use thiserror::Error;

use super::{
    ManifestDatabase, ModuleObjects, Role, StaticPatchExtractor, ToolAugmentator,
    ToolMetaDataExtractor, ToolPostprocessor, ToolPreprocessor, ToolSegmentator,
};
use crate::config::{ConfigError, ConfigManager, Settings, ToolSettings};

/// Errors raised while constructing collaborators.
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Missing [{0}] section in configuration")]
    MissingSection(Role),

    #[error("Invalid [{role}] section: {message}")]
    InvalidSection { role: Role, message: String },
}

/// Produces the collaborators for a run.
pub trait ModuleFactory {
    fn create(&self, config_path: &Path) -> Result<ModuleObjects, FactoryError>;
}

impl<F> ModuleFactory for F
where
    F: Fn(&Path) -> Result<ModuleObjects, FactoryError>,
{
    fn create(&self, config_path: &Path) -> Result<ModuleObjects, FactoryError> {
        self(config_path)
    }
}

/// Production factory: manifest database plus tool-backed collaborators.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigModuleFactory;

impl ModuleFactory for ConfigModuleFactory {
    fn create(&self, config_path: &Path) -> Result<ModuleObjects, FactoryError> {
        create_module_objects_from_config(config_path)
    }
}

fn tool_section(settings: &Settings, role: Role) -> Result<&ToolSettings, FactoryError> {
    let tool = settings.tool(role).ok_or(FactoryError::MissingSection(role))?;
    if tool.program.trim().is_empty() {
        return Err(FactoryError::InvalidSection {
            role,
            message: "program must not be empty".to_string(),
        });
    }
    Ok(tool)
}

/// Load `config_path` and build every collaborator it describes.
pub fn create_module_objects_from_config(config_path: &Path) -> Result<ModuleObjects, FactoryError> {
    let mut manager = ConfigManager::new(config_path);
    manager.load()?;
    let settings = manager.settings();

    let mut database = settings
        .database
        .clone()
        .ok_or(FactoryError::MissingSection(Role::Database))?;
    if database.manifest.as_os_str().is_empty() {
        return Err(FactoryError::InvalidSection {
            role: Role::Database,
            message: "manifest must not be empty".to_string(),
        });
    }
    database.manifest = manager.resolve(&database.manifest);

    let patch_extractor = settings
        .patch_extractor
        .as_ref()
        .ok_or(FactoryError::MissingSection(Role::PatchExtractor))?;

    let modules = ModuleObjects {
        database: Box::new(ManifestDatabase::new(database)),
        preprocessor: Box::new(ToolPreprocessor::new(tool_section(settings, Role::Preprocessor)?)),
        augmentator: Box::new(ToolAugmentator::new(tool_section(settings, Role::Augmentator)?)),
        meta_data_extractor: Box::new(ToolMetaDataExtractor::new(tool_section(
            settings,
            Role::MetaDataExtractor,
        )?)),
        patch_extractor: Box::new(StaticPatchExtractor::new(patch_extractor)),
        segmentator: Box::new(ToolSegmentator::new(tool_section(settings, Role::Segmentator)?)),
        postprocessor: Box::new(ToolPostprocessor::new(tool_section(settings, Role::Postprocessor)?)),
    };

    tracing::debug!("Created pipeline modules from {}", config_path.display());
    Ok(modules)
}
