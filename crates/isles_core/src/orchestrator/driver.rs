//! Training pipeline driver: runs the ten steps in order.

use std::time::Instant;

use super::errors::{PipelineError, PipelineResult, StageResult};
use super::step::Step;
use super::types::{Context, PipelineRunResult, StepRecord};
use crate::models::{Dataset, MetaData, ScoreReport, Subset};
use crate::modules::ModuleObjects;

/// Sequences the stages of a training run over injected collaborators.
///
/// Steps run in [`Step::ALL`] order, each exactly once. The first failing
/// step stops the run; nothing is retried or rolled back.
pub struct TrainingPipelineDriver {
    modules: ModuleObjects,
}

impl TrainingPipelineDriver {
    pub fn new(modules: ModuleObjects) -> Self {
        Self { modules }
    }

    pub fn modules(&self) -> &ModuleObjects {
        &self.modules
    }

    /// Run every step against fresh dataset and metadata handles.
    pub fn run(&mut self, ctx: &Context) -> PipelineResult<PipelineRunResult> {
        let mut dataset = Dataset::new();
        let mut metadata = MetaData::new();
        let mut steps = Vec::with_capacity(Step::ALL.len());
        let mut scores = None;

        for step in Step::ALL {
            ctx.logger.phase(step.description());
            ctx.logger.clear_tail();
            let started = Instant::now();

            match self.execute(step, &mut dataset, &mut metadata, ctx) {
                Ok(Some(report)) => scores = Some(report),
                Ok(None) => {}
                Err(e) => {
                    ctx.logger.error(&format!("{} failed: {}", step.name(), e));
                    ctx.logger.show_tail(step.role().section_name());
                    return Err(PipelineError::step_failed(step, e));
                }
            }

            let duration_ms = started.elapsed().as_millis() as u64;
            ctx.logger
                .success(&format!("{} completed in {} ms", step.name(), duration_ms));
            steps.push(StepRecord {
                step,
                role: step.role(),
                duration_ms,
            });
        }

        ctx.logger.success("Training pipeline completed");

        Ok(PipelineRunResult {
            steps,
            train_cases: dataset.subset_len(Subset::Train).unwrap_or(0),
            validation_cases: dataset.subset_len(Subset::Validation).unwrap_or(0),
            scores,
        })
    }

    fn execute(
        &mut self,
        step: Step,
        dataset: &mut Dataset,
        metadata: &mut MetaData,
        ctx: &Context,
    ) -> StageResult<Option<ScoreReport>> {
        let ModuleObjects {
            database,
            preprocessor,
            augmentator,
            meta_data_extractor,
            patch_extractor,
            segmentator,
            postprocessor,
        } = &mut self.modules;

        match step {
            Step::LoadTrainingManifest => database.load_training_manifest(dataset, ctx)?,
            Step::TrainValidationSplit => database.train_validation_split(dataset, ctx)?,
            Step::NormalizationParameters => {
                preprocessor.compute_normalization_parameters(dataset, ctx, Subset::Train)?
            }
            Step::BrainMasks => {
                meta_data_extractor.compute_brain_masks(dataset, metadata, ctx, Subset::Train)?
            }
            Step::AlignmentParameters => {
                preprocessor.compute_alignment_parameters(dataset, metadata, ctx, Subset::Train)?
            }
            Step::Augmentation => augmentator.augment_data(
                dataset,
                metadata,
                ctx,
                &**preprocessor,
                Subset::Train,
            )?,
            Step::LesionDistanceMaps => {
                meta_data_extractor.compute_lesion_distance_maps(dataset, metadata, ctx)?
            }
            Step::TrainAndValidate => segmentator.train_and_validate(
                dataset,
                metadata,
                &**preprocessor,
                &**patch_extractor,
                ctx,
            )?,
            Step::ClassificationScores => {
                return segmentator
                    .compute_classification_scores(
                        dataset,
                        &**preprocessor,
                        &**patch_extractor,
                        ctx,
                        Subset::Train,
                    )
                    .map(Some);
            }
            Step::PostprocessingParameters => {
                postprocessor.determine_parameters(dataset, &**preprocessor, ctx)?
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Case;
    use crate::modules::{
        Augmentator, Database, MetaDataExtractor, PatchExtractor, Postprocessor, Preprocessor,
        Segmentator,
    };
    use crate::orchestrator::StageError;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;

    /// Stands in for every collaborator and records each call.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail_at: Option<&'static str>,
    }

    impl Recorder {
        fn hit(&self, name: &'static str) -> StageResult<()> {
            self.calls.lock().push(name);
            if self.fail_at == Some(name) {
                return Err(StageError::model(format!("{} exploded", name)));
            }
            Ok(())
        }

        fn modules(&self) -> ModuleObjects {
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
    }

    impl Database for Recorder {
        fn load_training_manifest(&mut self, ds: &mut Dataset, _: &Context) -> StageResult<()> {
            self.hit("load_training_manifest")?;
            ds.set_cases(vec![
                Case::new("a").with_modality("DWI", "a.nii"),
                Case::new("b").with_modality("DWI", "b.nii"),
            ])?;
            Ok(())
        }

        fn train_validation_split(&mut self, ds: &mut Dataset, _: &Context) -> StageResult<()> {
            self.hit("train_validation_split")?;
            ds.apply_split(vec!["a".into()], vec!["b".into()])?;
            Ok(())
        }
    }

    impl Preprocessor for Recorder {
        fn compute_normalization_parameters(&mut self, _: &Dataset, _: &Context, _: Subset) -> StageResult<()> {
            self.hit("compute_normalization_parameters")
        }

        fn compute_alignment_parameters(
            &mut self,
            _: &Dataset,
            _: &MetaData,
            _: &Context,
            _: Subset,
        ) -> StageResult<()> {
            self.hit("compute_alignment_parameters")
        }

        fn parameters(&self) -> Value {
            Value::Null
        }
    }

    impl Augmentator for Recorder {
        fn augment_data(
            &mut self,
            _: &Dataset,
            _: &MetaData,
            _: &Context,
            _: &dyn Preprocessor,
            _: Subset,
        ) -> StageResult<()> {
            self.hit("augment_data")
        }
    }

    impl MetaDataExtractor for Recorder {
        fn compute_brain_masks(&mut self, _: &Dataset, _: &mut MetaData, _: &Context, _: Subset) -> StageResult<()> {
            self.hit("compute_brain_masks")
        }

        fn compute_lesion_distance_maps(&mut self, _: &Dataset, _: &mut MetaData, _: &Context) -> StageResult<()> {
            self.hit("compute_lesion_distance_maps")
        }
    }

    impl PatchExtractor for Recorder {
        fn parameters(&self) -> Value {
            Value::Null
        }
    }

    impl Segmentator for Recorder {
        fn train_and_validate(
            &mut self,
            _: &Dataset,
            _: &MetaData,
            _: &dyn Preprocessor,
            _: &dyn PatchExtractor,
            _: &Context,
        ) -> StageResult<()> {
            self.hit("train_and_validate")
        }

        fn compute_classification_scores(
            &mut self,
            _: &Dataset,
            _: &dyn Preprocessor,
            _: &dyn PatchExtractor,
            _: &Context,
            subset: Subset,
        ) -> StageResult<ScoreReport> {
            self.hit("compute_classification_scores")?;
            let mut report = ScoreReport::new(subset);
            report.dice.insert("a".into(), 0.5);
            Ok(report)
        }
    }

    impl Postprocessor for Recorder {
        fn determine_parameters(&mut self, _: &Dataset, _: &dyn Preprocessor, _: &Context) -> StageResult<()> {
            self.hit("determine_parameters")
        }
    }

    #[test]
    fn runs_every_step_once_in_order() {
        let recorder = Recorder::default();
        let mut driver = TrainingPipelineDriver::new(recorder.modules());
        let ctx = Context::with_discard_logger("/tmp/isles-driver-test");

        let result = driver.run(&ctx).unwrap();

        let expected: Vec<_> = Step::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(*recorder.calls.lock(), expected);
        assert_eq!(result.step_names(), expected);
        assert_eq!(result.train_cases, 1);
        assert_eq!(result.validation_cases, 1);
        assert_eq!(result.scores.unwrap().mean_dice(), Some(0.5));
    }

    #[test]
    fn failing_step_stops_the_run() {
        let recorder = Recorder {
            fail_at: Some("augment_data"),
            ..Default::default()
        };
        let mut driver = TrainingPipelineDriver::new(recorder.modules());
        let ctx = Context::with_discard_logger("/tmp/isles-driver-test");

        let err = driver.run(&ctx).unwrap_err();

        assert_eq!(err.step(), Step::Augmentation);
        assert_eq!(recorder.calls.lock().last(), Some(&"augment_data"));
        assert_eq!(recorder.calls.lock().len(), Step::Augmentation.number());
    }
}
