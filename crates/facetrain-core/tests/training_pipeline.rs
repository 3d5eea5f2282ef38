mod common;

use common::{reference_dataset, write_image, FixedLocator};
use facetrain_core::pipeline::PipelineError;
use facetrain_core::recognizer::{load_model, Prediction, TrainError};
use facetrain_core::{
    artifact_path, Algorithm, FaceExtractor, FaceRect, TrainedModel, Trainer, Trainers,
    TrainingPipeline, TrainingSample,
};
use image::GrayImage;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// What a recording trainer saw: sample sizes and labels.
type Seen = Rc<RefCell<Vec<(Algorithm, Vec<(u32, u32)>, Vec<i32>)>>>;

struct RecordingTrainer {
    algorithm: Algorithm,
    seen: Seen,
}

struct StubModel(Algorithm);

impl Trainer for RecordingTrainer {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn train(&self, samples: &[TrainingSample]) -> Result<Box<dyn TrainedModel>, TrainError> {
        self.seen.borrow_mut().push((
            self.algorithm,
            samples.iter().map(|s| s.dimensions()).collect(),
            samples.iter().map(|s| s.label).collect(),
        ));
        Ok(Box::new(StubModel(self.algorithm)))
    }
}

impl TrainedModel for StubModel {
    fn algorithm(&self) -> Algorithm {
        self.0
    }

    fn predict(&self, _image: &GrayImage) -> Result<Prediction, TrainError> {
        Ok(Prediction { label: 0, distance: 0.0 })
    }

    fn save(&self, path: &Path) -> Result<(), TrainError> {
        std::fs::write(path, self.0.name()).map_err(|source| TrainError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn recording_trainers(seen: &Seen) -> Trainers {
    let make = |algorithm| -> Box<dyn Trainer> {
        Box::new(RecordingTrainer { algorithm, seen: seen.clone() })
    };
    Trainers {
        lbph: make(Algorithm::Lbph),
        eigenface: make(Algorithm::Eigenface),
        fisherface: make(Algorithm::Fisherface),
    }
}

#[test]
fn reference_scenario_feeds_each_trainer_the_right_pass() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).unwrap();
    let locator = reference_dataset(&photos);
    let export = dir.path().join("faces");

    let seen = Seen::default();
    let mut pipeline = TrainingPipeline::new(&photos, &export, FaceExtractor::new(locator))
        .with_trainers(recording_trainers(&seen));
    let artifacts = pipeline.train().unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], (Algorithm::Lbph, vec![(40, 50), (60, 60)], vec![1, 1]));
    assert_eq!(seen[1], (Algorithm::Eigenface, vec![(60, 60), (60, 60)], vec![1, 1]));
    assert_eq!(seen[2], (Algorithm::Fisherface, vec![(60, 60), (60, 60)], vec![1, 1]));

    assert_eq!(artifacts.lbph, dir.path().join("faces_lbph.yml"));
    assert_eq!(artifacts.eigenface, dir.path().join("faces_eigenface.yml"));
    assert_eq!(artifacts.fisherface, dir.path().join("faces_fisherface.yml"));
    for path in [&artifacts.lbph, &artifacts.eigenface, &artifacts.fisherface] {
        assert!(path.exists(), "{} missing", path.display());
    }
}

fn two_person_dataset(photos: &Path) -> FixedLocator {
    write_image(photos, "1_a.png", 100, 100, 0);
    write_image(photos, "1_b.png", 120, 120, 2);
    write_image(photos, "2_c.png", 90, 90, 1);
    write_image(photos, "2_d.png", 110, 110, 3);
    write_image(photos, "2_empty.png", 70, 70, 1);
    FixedLocator::default()
        .with((100, 100), &[FaceRect::new(10, 10, 40, 50)])
        .with((120, 120), &[FaceRect::new(20, 20, 60, 60)])
        .with((90, 90), &[FaceRect::new(5, 5, 50, 50)])
        .with((110, 110), &[FaceRect::new(0, 0, 44, 44)])
}

#[test]
fn trains_and_reloads_all_three_models() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).unwrap();
    let locator = two_person_dataset(&photos);
    let export = dir.path().join("model");

    let mut pipeline = TrainingPipeline::new(&photos, &export, FaceExtractor::new(locator));
    assert_eq!(pipeline.count().unwrap(), 5);
    let artifacts = pipeline.train().unwrap();

    let lbph = load_model(&artifacts.lbph).unwrap();
    assert_eq!(lbph.algorithm(), Algorithm::Lbph);
    let eigen = load_model(&artifacts.eigenface).unwrap();
    assert_eq!(eigen.algorithm(), Algorithm::Eigenface);
    let fisher = load_model(&artifacts.fisherface).unwrap();
    assert_eq!(fisher.algorithm(), Algorithm::Fisherface);

    // Uniform models only take crops of the largest face size.
    assert!(eigen.predict(&GrayImage::new(60, 60)).is_ok());
    assert!(fisher.predict(&GrayImage::new(10, 10)).is_err());
    // LBPH takes anything.
    assert!(lbph.predict(&GrayImage::new(33, 47)).is_ok());
}

#[test]
fn rerun_overwrites_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).unwrap();
    let export = dir.path().join("model");

    let mut pipeline =
        TrainingPipeline::new(&photos, &export, FaceExtractor::new(two_person_dataset(&photos)));
    let first = pipeline.train().unwrap();
    std::fs::write(&first.lbph, "stale").unwrap();
    let second = pipeline.train().unwrap();

    assert_eq!(first, second);
    assert!(load_model(&second.lbph).is_ok());
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    // photos/ plus three artifacts, nothing accumulated.
    assert_eq!(entries, 4);
}

#[test]
fn single_class_fails_fisherfaces_after_earlier_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).unwrap();
    let locator = reference_dataset(&photos);
    let export = dir.path().join("faces");

    let mut pipeline = TrainingPipeline::new(&photos, &export, FaceExtractor::new(locator));
    let err = pipeline.train().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Train { algorithm: Algorithm::Fisherface, source: TrainError::TooFewClasses(1) }
    ));

    // No rollback: the first two artifacts stay on disk.
    assert!(artifact_path(&export, Algorithm::Lbph).exists());
    assert!(artifact_path(&export, Algorithm::Eigenface).exists());
    assert!(!artifact_path(&export, Algorithm::Fisherface).exists());
}

#[test]
fn no_faces_anywhere_fails_lbph_training() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "1_a.png", 30, 30, 0);
    let export = dir.path().join("out");

    let mut pipeline =
        TrainingPipeline::new(dir.path(), &export, FaceExtractor::new(FixedLocator::default()));
    assert_eq!(pipeline.target_size().unwrap().width, 0);
    let err = pipeline.train().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Train { algorithm: Algorithm::Lbph, source: TrainError::Empty(Algorithm::Lbph) }
    ));
}

#[test]
fn unwritable_export_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).unwrap();
    let locator = two_person_dataset(&photos);
    let export = dir.path().join("missing-dir").join("model");

    let mut pipeline = TrainingPipeline::new(&photos, &export, FaceExtractor::new(locator));
    let err = pipeline.train().unwrap_err();
    assert!(matches!(err, PipelineError::Save { algorithm: Algorithm::Lbph, .. }));
}

#[test]
fn missing_photo_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = TrainingPipeline::new(
        dir.path().join("nope"),
        dir.path().join("model"),
        FaceExtractor::new(FixedLocator::default()),
    );
    assert!(matches!(pipeline.train().unwrap_err(), PipelineError::Dataset(_)));
    assert!(pipeline.count().is_err());
}
