//! Recording collaborators shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use isles_core::models::{Case, CaseMetaUpdate, Dataset, MetaData, ScoreReport, Subset};
use isles_core::modules::{
    Augmentator, Database, MetaDataExtractor, ModuleObjects, PatchExtractor, Postprocessor,
    Preprocessor, Segmentator,
};
use isles_core::orchestrator::{Context, StageError, StageResult};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub operation: &'static str,
    /// Size of the train partition when the call was made, if split.
    pub train_cases: Option<usize>,
    /// Cases with a brain mask in the metadata handle, where visible.
    pub brain_masks: Option<usize>,
    pub out_dir: PathBuf,
    pub out_dir_existed: bool,
}

/// Stands in for all seven collaborators and records every call.
#[derive(Clone, Default)]
pub struct Recorder {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail_at: Option<&'static str>,
}

impl Recorder {
    pub fn failing_at(operation: &'static str) -> Self {
        Self {
            fail_at: Some(operation),
            ..Default::default()
        }
    }

    pub fn modules(&self) -> ModuleObjects {
        ModuleObjects {
            database: Box::new(self.clone()),
            preprocessor: Box::new(self.clone()),
            augmentator: Box::new(self.clone()),
            meta_data_extractor: Box::new(self.clone()),
            patch_extractor: Box::new(self.clone()),
            segmentator: Box::new(self.clone()),
            postprocessor: Box::new(self.clone()),
        }
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|c| c.operation).collect()
    }

    pub fn call(&self, operation: &str) -> Option<Call> {
        self.calls
            .lock()
            .iter()
            .find(|c| c.operation == operation)
            .cloned()
    }

    fn record(
        &self,
        operation: &'static str,
        dataset: &Dataset,
        metadata: Option<&MetaData>,
        ctx: &Context,
    ) -> StageResult<()> {
        self.calls.lock().push(Call {
            operation,
            train_cases: dataset.subset_len(Subset::Train).ok(),
            brain_masks: metadata.map(MetaData::brain_mask_count),
            out_dir: ctx.out_dir.clone(),
            out_dir_existed: ctx.out_dir.is_dir(),
        });
        if self.fail_at == Some(operation) {
            return Err(StageError::model(format!("{} failed on purpose", operation)));
        }
        Ok(())
    }
}

pub const CASE_IDS: [&str; 5] = ["case_01", "case_02", "case_03", "case_04", "case_05"];

impl Database for Recorder {
    fn load_training_manifest(&mut self, dataset: &mut Dataset, ctx: &Context) -> StageResult<()> {
        self.record("load_training_manifest", dataset, None, ctx)?;
        dataset.set_cases(
            CASE_IDS
                .iter()
                .map(|id| Case::new(*id).with_modality("DWI", format!("{}/dwi.nii", id)))
                .collect(),
        )?;
        Ok(())
    }

    fn train_validation_split(&mut self, dataset: &mut Dataset, ctx: &Context) -> StageResult<()> {
        self.record("train_validation_split", dataset, None, ctx)?;
        let ids: Vec<String> = CASE_IDS.iter().map(|s| s.to_string()).collect();
        dataset.apply_split(ids[..4].to_vec(), ids[4..].to_vec())?;
        Ok(())
    }
}

impl Preprocessor for Recorder {
    fn compute_normalization_parameters(
        &mut self,
        dataset: &Dataset,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()> {
        assert_eq!(subset, Subset::Train);
        self.record("compute_normalization_parameters", dataset, None, ctx)
    }

    fn compute_alignment_parameters(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()> {
        assert_eq!(subset, Subset::Train);
        self.record("compute_alignment_parameters", dataset, Some(metadata), ctx)
    }

    fn parameters(&self) -> Value {
        json!({"kind": "recorder"})
    }
}

impl MetaDataExtractor for Recorder {
    fn compute_brain_masks(
        &mut self,
        dataset: &Dataset,
        metadata: &mut MetaData,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<()> {
        self.record("compute_brain_masks", dataset, Some(&*metadata), ctx)?;
        for case in dataset.subset(subset)? {
            metadata.apply(
                &case.id,
                CaseMetaUpdate {
                    brain_mask: Some(PathBuf::from(format!("{}/mask.nii", case.id))),
                    ..Default::default()
                },
            );
        }
        Ok(())
    }

    fn compute_lesion_distance_maps(
        &mut self,
        dataset: &Dataset,
        metadata: &mut MetaData,
        ctx: &Context,
    ) -> StageResult<()> {
        self.record("compute_lesion_distance_maps", dataset, Some(&*metadata), ctx)
    }
}

impl Augmentator for Recorder {
    fn augment_data(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        ctx: &Context,
        preprocessor: &dyn Preprocessor,
        subset: Subset,
    ) -> StageResult<()> {
        assert_eq!(subset, Subset::Train);
        assert_eq!(preprocessor.parameters()["kind"], "recorder");
        self.record("augment_data", dataset, Some(metadata), ctx)
    }
}

impl PatchExtractor for Recorder {
    fn parameters(&self) -> Value {
        json!({"patch_size": [8, 8, 8]})
    }
}

impl Segmentator for Recorder {
    fn train_and_validate(
        &mut self,
        dataset: &Dataset,
        metadata: &MetaData,
        _preprocessor: &dyn Preprocessor,
        patch_extractor: &dyn PatchExtractor,
        ctx: &Context,
    ) -> StageResult<()> {
        assert_eq!(patch_extractor.parameters()["patch_size"], json!([8, 8, 8]));
        self.record("train_and_validate", dataset, Some(metadata), ctx)
    }

    fn compute_classification_scores(
        &mut self,
        dataset: &Dataset,
        _preprocessor: &dyn Preprocessor,
        _patch_extractor: &dyn PatchExtractor,
        ctx: &Context,
        subset: Subset,
    ) -> StageResult<ScoreReport> {
        self.record("compute_classification_scores", dataset, None, ctx)?;
        let mut report = ScoreReport::new(subset);
        for case in dataset.subset(subset)? {
            report.dice.insert(case.id.clone(), 0.75);
        }
        Ok(report)
    }
}

impl Postprocessor for Recorder {
    fn determine_parameters(
        &mut self,
        dataset: &Dataset,
        _preprocessor: &dyn Preprocessor,
        ctx: &Context,
    ) -> StageResult<()> {
        self.record("determine_parameters", dataset, None, ctx)
    }
}
