//! Step ordering and state threading through the driver.

mod common;

use common::{Recorder, CASE_IDS};
use isles_core::orchestrator::{Context, Step, TrainingPipelineDriver};
use tempfile::tempdir;

#[test]
fn ten_calls_in_fixed_order() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::default();
    let mut driver = TrainingPipelineDriver::new(recorder.modules());

    driver.run(&Context::with_discard_logger(dir.path())).unwrap();

    assert_eq!(
        recorder.operations(),
        vec![
            "load_training_manifest",
            "train_validation_split",
            "compute_normalization_parameters",
            "compute_brain_masks",
            "compute_alignment_parameters",
            "augment_data",
            "compute_lesion_distance_maps",
            "train_and_validate",
            "compute_classification_scores",
            "determine_parameters",
        ]
    );
}

#[test]
fn later_stages_see_the_split() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::default();
    let mut driver = TrainingPipelineDriver::new(recorder.modules());

    let result = driver.run(&Context::with_discard_logger(dir.path())).unwrap();

    assert_eq!(recorder.call("train_validation_split").unwrap().train_cases, None);
    for step in &Step::ALL[2..] {
        let call = recorder.call(step.name()).unwrap();
        assert_eq!(call.train_cases, Some(4), "{} did not see the split", step);
    }
    assert_eq!(result.train_cases, 4);
    assert_eq!(result.validation_cases, 1);
}

#[test]
fn metadata_written_by_brain_masks_reaches_later_stages() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::default();
    let mut driver = TrainingPipelineDriver::new(recorder.modules());

    driver.run(&Context::with_discard_logger(dir.path())).unwrap();

    assert_eq!(recorder.call("compute_brain_masks").unwrap().brain_masks, Some(0));
    assert_eq!(recorder.call("compute_alignment_parameters").unwrap().brain_masks, Some(4));
    assert_eq!(recorder.call("augment_data").unwrap().brain_masks, Some(4));
    assert_eq!(recorder.call("train_and_validate").unwrap().brain_masks, Some(4));
}

#[test]
fn every_stage_gets_the_same_output_dir() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::default();
    let mut driver = TrainingPipelineDriver::new(recorder.modules());

    driver.run(&Context::with_discard_logger(dir.path())).unwrap();

    assert!(recorder
        .calls
        .lock()
        .iter()
        .all(|c| c.out_dir == dir.path()));
}

#[test]
fn scores_are_reported_for_train_subset() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::default();
    let mut driver = TrainingPipelineDriver::new(recorder.modules());

    let result = driver.run(&Context::with_discard_logger(dir.path())).unwrap();

    let scores = result.scores.unwrap();
    assert_eq!(scores.dice.len(), CASE_IDS.len() - 1);
    assert_eq!(scores.mean_dice(), Some(0.75));
    assert_eq!(result.steps.len(), Step::ALL.len());
}

#[test]
fn failure_stops_before_later_stages() {
    let dir = tempdir().unwrap();
    let recorder = Recorder::failing_at("train_and_validate");
    let mut driver = TrainingPipelineDriver::new(recorder.modules());

    let err = driver
        .run(&Context::with_discard_logger(dir.path()))
        .unwrap_err();

    assert_eq!(err.step(), Step::TrainAndValidate);
    assert!(err.to_string().contains("Step 8"));
    assert_eq!(recorder.operations().last(), Some(&"train_and_validate"));
    assert!(recorder.call("compute_classification_scores").is_none());
    assert!(recorder.call("determine_parameters").is_none());
}
