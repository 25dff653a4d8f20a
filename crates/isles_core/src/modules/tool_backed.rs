//! Collaborators backed by external programs.
//!
//! Each operation is one process run: `<role>/<operation>.request.json` is
//! written under the output directory, the configured program is run with
//! the protocol arguments, and `<role>/<operation>.response.json` is read
//! back if the program produced one.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use serde_json::{json, Value};

use super::{Augmentator, MetaDataExtractor, PatchExtractor, Postprocessor, Preprocessor, Role, Segmentator};
use crate::config::{PatchExtractorSettings, ToolSettings};
use crate::models::{Case, Dataset, MetaData, ScoreReport, Subset};
use crate::orchestrator::{Context, StageError, StageResult, Step};
use crate::tools::{ToolRequest, ToolResponse, ToolRunner};

/// Shared request/run/response cycle for one role.
#[derive(Debug, Clone)]
struct ToolStage {
    role: Role,
    runner: ToolRunner,
    params: BTreeMap<String, Value>,
}

impl ToolStage {
    fn new(role: Role, settings: &ToolSettings) -> Self {
        Self {
            role,
            runner: ToolRunner::from_settings(settings),
            params: settings.params.clone(),
        }
    }

    fn request<'a>(&'a self, step: Step, ctx: &'a Context, cases: Vec<&'a Case>) -> ToolRequest<'a> {
        ToolRequest::new(step.name(), ctx.out_dir(), &self.params, cases)
    }

    fn call(&self, ctx: &Context, request: &ToolRequest<'_>) -> StageResult<ToolResponse> {
        let dir = ctx.role_dir(self.role);
        fs::create_dir_all(&dir)
            .map_err(|e| StageError::io(format!("creating {}", dir.display()), e))?;

        let request_path = dir.join(format!("{}.request.json", request.operation));
        let response_path = dir.join(format!("{}.response.json", request.operation));

        // A response left by an earlier run must not be read back as ours.
        if response_path.exists() {
            fs::remove_file(&response_path).map_err(|e| {
                StageError::io(format!("removing stale {}", response_path.display()), e)
            })?;
        }

        request.write_to(&request_path)?;
        let output = self
            .runner
            .run(request.operation, &request_path, &response_path, &ctx.logger)?;
        ctx.logger.debug(&format!(
            "{} exited with {} ({} stdout / {} stderr line(s))",
            self.runner.program(),
            output.exit_code,
            output.stdout_lines,
            output.stderr_lines
        ));
        ToolResponse::read_from(&response_path)
    }
}

fn subset_cases(dataset: &Dataset, subset: Subset) -> StageResult<Vec<&Case>> {
    Ok(dataset.subset(subset)?)
}

/// Preprocessor tool. Artifacts reported by the tool (statistics files,
/// transforms) accumulate here and are forwarded to downstream stages.
#[derive(Debug, Clone)]
pub struct ToolPreprocessor {
    stage: ToolStage,
    artifacts: BTreeMap<String, PathBuf>,
}

impl ToolPreprocessor {
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            stage: ToolStage::new(Role::Preprocessor, settings),
            artifacts: BTreeMap::new(),
        }
    }

    pub fn artifacts(&self) -> &BTreeMap<String, PathBuf> {
        &self.artifacts
    }

    fn absorb(&mut self, response: ToolResponse) {
        if !response.metadata.is_empty() {
            tracing::debug!(
                "Preprocessor returned metadata for {} case(s); ignored",
                response.metadata.len()
            );
        }
        self.artifacts.extend(response.artifacts);
    }
}

impl Preprocessor for ToolPreprocessor {
    fn compute_normalization_parameters(
        &mut self,
        dataset: &Dataset,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()> {
        let cases = subset_cases(dataset, subset)?;
        let request = self
            .stage
            .request(Step::NormalizationParameters, ctx, cases)
            .subset(subset);
        let response = self.stage.call(ctx, &request)?;
        self.absorb(response);
        Ok(())
    }

    fn compute_alignment_parameters(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()> {
        let cases = subset_cases(dataset, subset)?;
        let request = self
            .stage
            .request(Step::AlignmentParameters, ctx, cases)
            .subset(subset)
            .metadata(metadata)
            .preprocessor(self.parameters());
        let response = self.stage.call(ctx, &request)?;
        self.absorb(response);
        Ok(())
    }

    fn parameters(&self) -> Value {
        json!({
            "params": self.stage.params,
            "artifacts": self.artifacts,
        })
    }
}

/// Meta-data extractor tool. Updates reported per case are merged into the
/// metadata handle.
#[derive(Debug, Clone)]
pub struct ToolMetaDataExtractor {
    stage: ToolStage,
}

impl ToolMetaDataExtractor {
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            stage: ToolStage::new(Role::MetaDataExtractor, settings),
        }
    }

    fn merge(dataset: &Dataset, metadata: &mut MetaData, response: ToolResponse, ctx: &Context) -> usize {
        let mut applied = 0;
        for (case_id, update) in response.metadata {
            if dataset.case(&case_id).is_none() {
                ctx.logger
                    .warn(&format!("Ignoring metadata for unknown case '{}'", case_id));
                continue;
            }
            if update.is_empty() {
                continue;
            }
            metadata.apply(&case_id, update);
            applied += 1;
        }
        applied
    }
}

impl MetaDataExtractor for ToolMetaDataExtractor {
    fn compute_brain_masks(
        &mut self,
        dataset: &Dataset,
        metadata: &mut MetaData,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()> {
        let cases = subset_cases(dataset, subset)?;
        let response = {
            let request = self
                .stage
                .request(Step::BrainMasks, ctx, cases)
                .subset(subset)
                .metadata(metadata);
            self.stage.call(ctx, &request)?
        };

        let applied = Self::merge(dataset, metadata, response, ctx);
        ctx.logger
            .info(&format!("Brain masks recorded for {} case(s)", applied));
        Ok(())
    }

    fn compute_lesion_distance_maps(
        &mut self,
        dataset: &Dataset,
        metadata: &mut MetaData,
        ctx: &Context,
    ) -> StageResult<()> {
        let response = {
            let request = self
                .stage
                .request(Step::LesionDistanceMaps, ctx, dataset.cases().collect())
                .metadata(metadata);
            self.stage.call(ctx, &request)?
        };

        let applied = Self::merge(dataset, metadata, response, ctx);
        ctx.logger
            .info(&format!("Lesion distance maps recorded for {} case(s)", applied));
        Ok(())
    }
}

/// Augmentation tool.
#[derive(Debug, Clone)]
pub struct ToolAugmentator {
    stage: ToolStage,
}

impl ToolAugmentator {
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            stage: ToolStage::new(Role::Augmentator, settings),
        }
    }
}

impl Augmentator for ToolAugmentator {
    fn augment_data(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        ctx: &Context,
        preprocessor: &dyn Preprocessor,
        subset: Subset,
    ) -> StageResult<()> {
        let cases = subset_cases(dataset, subset)?;
        let request = self
            .stage
            .request(Step::Augmentation, ctx, cases)
            .subset(subset)
            .metadata(metadata)
            .preprocessor(preprocessor.parameters());
        let response = self.stage.call(ctx, &request)?;

        if !response.artifacts.is_empty() {
            ctx.logger.info(&format!(
                "Augmentation produced {} artifact(s)",
                response.artifacts.len()
            ));
        }
        Ok(())
    }
}

/// Patch extractor with fixed parameters from the configuration.
///
/// Nothing is executed for this role; the parameters are forwarded to the
/// segmentator.
#[derive(Debug, Clone, Default)]
pub struct StaticPatchExtractor {
    params: BTreeMap<String, Value>,
}

impl StaticPatchExtractor {
    pub fn new(settings: &PatchExtractorSettings) -> Self {
        Self {
            params: settings.params.clone(),
        }
    }
}

impl PatchExtractor for StaticPatchExtractor {
    fn parameters(&self) -> Value {
        Value::Object(self.params.clone().into_iter().collect())
    }
}

/// Segmentation model tool.
#[derive(Debug, Clone)]
pub struct ToolSegmentator {
    stage: ToolStage,
}

impl ToolSegmentator {
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            stage: ToolStage::new(Role::Segmentator, settings),
        }
    }
}

impl Segmentator for ToolSegmentator {
    fn train_and_validate(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        preprocessor: &dyn Preprocessor,
        patch_extractor: &dyn PatchExtractor,
        ctx: &Context,
    ) -> StageResult<()> {
        let train = dataset.subset_ids(Subset::Train)?;
        let valid = dataset.subset_ids(Subset::Validation)?;
        let request = self
            .stage
            .request(Step::TrainAndValidate, ctx, dataset.cases().collect())
            .partition(train, valid)
            .metadata(metadata)
            .preprocessor(preprocessor.parameters())
            .patch_extractor(patch_extractor.parameters());
        let response = self.stage.call(ctx, &request)?;

        for (name, path) in &response.artifacts {
            ctx.logger
                .info(&format!("Model artifact {}: {}", name, path.display()));
        }
        Ok(())
    }

    fn compute_classification_scores(
        &mut self,
        dataset: &Dataset,
        preprocessor: &dyn Preprocessor,
        patch_extractor: &dyn PatchExtractor,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<ScoreReport> {
        let cases = subset_cases(dataset, subset)?;
        let request = self
            .stage
            .request(Step::ClassificationScores, ctx, cases)
            .subset(subset)
            .preprocessor(preprocessor.parameters())
            .patch_extractor(patch_extractor.parameters());
        let response = self.stage.call(ctx, &request)?;

        let expected: BTreeSet<&str> = dataset
            .subset_ids(subset)?
            .iter()
            .map(String::as_str)
            .collect();
        let mut report = ScoreReport::new(subset);
        for (case_id, dice) in response.scores {
            if !expected.contains(case_id.as_str()) {
                ctx.logger.warn(&format!(
                    "Ignoring Dice for case '{}' outside the {} partition",
                    case_id, subset
                ));
                continue;
            }
            if !(0.0..=1.0).contains(&dice) {
                return Err(StageError::protocol(
                    "classification scores",
                    format!("Dice {} for case '{}' is outside [0, 1]", dice, case_id),
                ));
            }
            report.dice.insert(case_id, dice);
        }

        match report.mean_dice() {
            Some(mean) => ctx.logger.info(&format!(
                "Mean Dice ({}): {:.4} over {} case(s)",
                subset,
                mean,
                report.dice.len()
            )),
            None => ctx.logger.warn("Segmentator reported no Dice scores"),
        }

        let path = ctx
            .role_dir(Role::Segmentator)
            .join(format!("scores.{}.json", subset));
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| StageError::protocol("classification scores", e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StageError::io(format!("writing {}", path.display()), e))?;
        Ok(report)
    }
}

/// Post-processing tool.
#[derive(Debug, Clone)]
pub struct ToolPostprocessor {
    stage: ToolStage,
}

impl ToolPostprocessor {
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            stage: ToolStage::new(Role::Postprocessor, settings),
        }
    }
}

impl Postprocessor for ToolPostprocessor {
    fn determine_parameters(
        &mut self,
        dataset: &Dataset,
        preprocessor: &dyn Preprocessor,
        ctx: &Context,
    ) -> StageResult<()> {
        let train = dataset.subset_ids(Subset::Train)?;
        let valid = dataset.subset_ids(Subset::Validation)?;
        let request = self
            .stage
            .request(Step::PostprocessingParameters, ctx, dataset.cases().collect())
            .partition(train, valid)
            .preprocessor(preprocessor.parameters());
        let response = self.stage.call(ctx, &request)?;

        for (name, path) in &response.artifacts {
            ctx.logger
                .info(&format!("Post-processing {}: {}", name, path.display()));
        }
        Ok(())
    }
}
