//! Configuration for a training run.
//!
//! This module provides:
//! - TOML-based configuration with one section per collaborator role
//! - Validation on load with defaults for optional keys
//! - Detection of unknown sections (reported, not fatal)
//!
//! # Example
//!
//! ```no_run
//! use isles_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new("configs/isles.toml");
//! config.load().unwrap();
//!
//! if let Some(db) = &config.settings().database {
//!     println!("Manifest: {}", config.resolve(&db.manifest).display());
//! }
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{DatabaseSettings, PatchExtractorSettings, Settings, ToolSettings};
