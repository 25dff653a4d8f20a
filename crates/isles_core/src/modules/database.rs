//! Manifest-backed database: loads cases from a JSON manifest and splits
//! them deterministically.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::Database;
use crate::config::DatabaseSettings;
use crate::models::{Case, Dataset, DatasetError, Subset};
use crate::orchestrator::{Context, StageError, StageResult};

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    cases: Vec<Case>,
}

/// Database reading the case list from a JSON manifest file.
#[derive(Debug, Clone)]
pub struct ManifestDatabase {
    settings: DatabaseSettings,
}

impl ManifestDatabase {
    /// `settings.manifest` must already be resolved (absolute or relative
    /// to the working directory).
    pub fn new(settings: DatabaseSettings) -> Self {
        Self { settings }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.settings.manifest
    }

    fn read_manifest(&self) -> StageResult<Vec<Case>> {
        let path = &self.settings.manifest;
        let content = fs::read_to_string(path)
            .map_err(|e| StageError::io(format!("reading manifest {}", path.display()), e))?;
        let manifest: ManifestFile = serde_json::from_str(&content).map_err(|e| {
            StageError::data(format!("invalid manifest {}: {}", path.display(), e))
        })?;

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest
            .cases
            .into_iter()
            .map(|case| resolve_case(case, &base))
            .collect())
    }
}

fn resolve_path(path: PathBuf, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn resolve_case(mut case: Case, base: &Path) -> Case {
    case.modalities = case
        .modalities
        .into_iter()
        .map(|(name, path)| (name, resolve_path(path, base)))
        .collect();
    case.lesion_mask = case.lesion_mask.map(|p| resolve_path(p, base));
    case
}

/// Split key for one case: `sha256("<seed>:<id>")`.
fn split_key(seed: u64, id: &str) -> Vec<u8> {
    Sha256::digest(format!("{}:{}", seed, id).as_bytes()).to_vec()
}

/// Number of validation cases for `n` cases; train always keeps one.
fn validation_count(n: usize, fraction: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let wanted = (n as f64 * fraction).round() as usize;
    wanted.min(n - 1)
}

impl Database for ManifestDatabase {
    fn load_training_manifest(&mut self, dataset: &mut Dataset, ctx: &Context) -> StageResult<()> {
        let cases = self.read_manifest()?;

        if self.settings.check_files {
            for case in &cases {
                if let Some(missing) = case.paths().find(|p| !p.exists()) {
                    return Err(StageError::data(format!(
                        "case '{}' references missing file {}",
                        case.id,
                        missing.display()
                    )));
                }
            }
        }

        dataset.set_cases(cases)?;
        ctx.logger.info(&format!(
            "Loaded {} cases from {}",
            dataset.len(),
            self.settings.manifest.display()
        ));
        Ok(())
    }

    fn train_validation_split(&mut self, dataset: &mut Dataset, ctx: &Context) -> StageResult<()> {
        let fraction = self.settings.validation_fraction;
        if !(0.0..1.0).contains(&fraction) {
            return Err(StageError::data(format!(
                "validation_fraction must be in [0, 1), got {}",
                fraction
            )));
        }
        if dataset.is_empty() {
            return Err(DatasetError::Empty.into());
        }

        let seed = self.settings.seed;
        let mut ranked: Vec<(Vec<u8>, String)> = dataset
            .cases()
            .map(|c| (split_key(seed, &c.id), c.id.clone()))
            .collect();
        ranked.sort();

        let n_valid = validation_count(ranked.len(), fraction);
        let mut ids = ranked.into_iter().map(|(_, id)| id);
        let valid: Vec<String> = ids.by_ref().take(n_valid).collect();
        let train: Vec<String> = ids.collect();

        dataset.apply_split(train, valid)?;
        ctx.logger.info(&format!(
            "Split: {} train / {} validation (seed {})",
            dataset.subset_len(Subset::Train)?,
            n_valid,
            seed
        ));
        Ok(())
    }
}
