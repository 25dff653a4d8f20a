//! Output directory preparation.
//!
//! Creation is reported as an explicit [`OutputDirStatus`]; the caller
//! decides whether a failure is fatal.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

/// Filesystem seam for directory creation, replaceable in tests.
pub trait DirCreator {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir(&self, path: &Path) -> io::Result<()>;
}

/// Real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirCreator;

impl DirCreator for FsDirCreator {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Creates missing parents too.
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}

/// What happened to the output directory before the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OutputDirStatus {
    Created,
    AlreadyExisted,
    Failed(String),
}

impl OutputDirStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, OutputDirStatus::Failed(_))
    }
}

/// Make sure `path` exists, creating it if needed.
pub fn prepare_output_dir(path: &Path, creator: &dyn DirCreator) -> OutputDirStatus {
    if creator.exists(path) {
        return OutputDirStatus::AlreadyExisted;
    }

    match creator.create_dir(path) {
        Ok(()) => {
            tracing::debug!("Created output directory {}", path.display());
            OutputDirStatus::Created
        }
        Err(e) => OutputDirStatus::Failed(e.to_string()),
    }
}
