//! End-to-end training run: scan, extract twice, train three recognizers.

use crate::dataset::{Dataset, DatasetError};
use crate::extractor::{ExtractError, FaceExtractor};
use crate::locator::FaceLocator;
use crate::recognizer::{
    Algorithm, EigenfaceTrainer, FisherfaceTrainer, LbphTrainer, TrainError, Trainer,
};
use crate::types::{CropSize, TrainingSample};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("training {algorithm} failed: {source}")]
    Train {
        algorithm: Algorithm,
        #[source]
        source: TrainError,
    },
    #[error("saving {algorithm} model to {path} failed: {source}")]
    Save {
        algorithm: Algorithm,
        path: PathBuf,
        #[source]
        source: TrainError,
    },
}

/// The three recognizers a pipeline trains.
///
/// `lbph` gets native-size crops; `eigenface` and `fisherface` get crops
/// resized to the dataset's largest face.
pub struct Trainers {
    pub lbph: Box<dyn Trainer>,
    pub eigenface: Box<dyn Trainer>,
    pub fisherface: Box<dyn Trainer>,
}

impl Default for Trainers {
    fn default() -> Self {
        Self {
            lbph: Box::new(LbphTrainer::default()),
            eigenface: Box::new(EigenfaceTrainer::default()),
            fisherface: Box::new(FisherfaceTrainer::default()),
        }
    }
}

/// Paths of the artifacts written by one [`TrainingPipeline::train`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainedArtifacts {
    pub lbph: PathBuf,
    pub eigenface: PathBuf,
    pub fisherface: PathBuf,
}

/// `<export>_<algorithm>.yml`
pub fn artifact_path(export: &Path, algorithm: Algorithm) -> PathBuf {
    let mut name = OsString::from(export.as_os_str());
    name.push(format!("_{}.yml", algorithm.name()));
    PathBuf::from(name)
}

/// Trains LBPH, Eigenfaces and Fisherfaces from a photo directory.
pub struct TrainingPipeline<L> {
    photos: PathBuf,
    export: PathBuf,
    extractor: FaceExtractor<L>,
    trainers: Trainers,
}

impl<L: FaceLocator> TrainingPipeline<L> {
    pub fn new(
        photos: impl Into<PathBuf>,
        export: impl Into<PathBuf>,
        extractor: FaceExtractor<L>,
    ) -> Self {
        Self {
            photos: photos.into(),
            export: export.into(),
            extractor,
            trainers: Trainers::default(),
        }
    }

    pub fn with_trainers(mut self, trainers: Trainers) -> Self {
        self.trainers = trainers;
        self
    }

    pub fn photos(&self) -> &Path {
        &self.photos
    }

    /// Number of files in the photo directory.
    pub fn count(&self) -> Result<usize, PipelineError> {
        Ok(Dataset::scan(&self.photos)?.count())
    }

    /// Crop size the uniform pass would use right now.
    pub fn target_size(&mut self) -> Result<CropSize, PipelineError> {
        let dataset = Dataset::scan(&self.photos)?;
        Ok(self.extractor.compute_target_size(dataset.entries())?)
    }

    /// Run the full pipeline once, overwriting any previous artifacts.
    ///
    /// Any failure aborts the run. Artifacts already written by this call
    /// are left in place.
    pub fn train(&mut self) -> Result<TrainedArtifacts, PipelineError> {
        let dataset = Dataset::scan(&self.photos)?;
        if !dataset.unlabeled().is_empty() {
            tracing::warn!(
                count = dataset.unlabeled().len(),
                "files without a numeric label prefix were skipped"
            );
        }
        let entries = dataset.entries();

        tracing::info!(entries = entries.len(), "native-size pass");
        let native = self.extractor.extract(entries, None)?;
        let lbph = train_and_save(self.trainers.lbph.as_ref(), &native.samples, &self.export)?;
        drop(native);

        tracing::info!(entries = entries.len(), "uniform-size pass");
        let size = self.extractor.compute_target_size(entries)?;
        let uniform = self.extractor.extract(entries, Some(size))?;
        let eigenface =
            train_and_save(self.trainers.eigenface.as_ref(), &uniform.samples, &self.export)?;
        let fisherface =
            train_and_save(self.trainers.fisherface.as_ref(), &uniform.samples, &self.export)?;

        Ok(TrainedArtifacts {
            lbph,
            eigenface,
            fisherface,
        })
    }
}

fn train_and_save(
    trainer: &dyn Trainer,
    samples: &[TrainingSample],
    export: &Path,
) -> Result<PathBuf, PipelineError> {
    let algorithm = trainer.algorithm();
    tracing::info!(%algorithm, samples = samples.len(), "training recognizer");

    let model = trainer
        .train(samples)
        .map_err(|source| PipelineError::Train { algorithm, source })?;

    let path = artifact_path(export, algorithm);
    model.save(&path).map_err(|source| PipelineError::Save {
        algorithm,
        path: path.clone(),
        source,
    })?;

    tracing::info!(%algorithm, path = %path.display(), "model saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_suffixes() {
        let export = Path::new("/models/faces");
        assert_eq!(artifact_path(export, Algorithm::Lbph), PathBuf::from("/models/faces_lbph.yml"));
        assert_eq!(
            artifact_path(export, Algorithm::Eigenface),
            PathBuf::from("/models/faces_eigenface.yml")
        );
        assert_eq!(
            artifact_path(export, Algorithm::Fisherface),
            PathBuf::from("/models/faces_fisherface.yml")
        );
    }

    #[test]
    fn test_artifact_path_keeps_existing_extension() {
        assert_eq!(
            artifact_path(Path::new("out/model.v2"), Algorithm::Lbph),
            PathBuf::from("out/model.v2_lbph.yml")
        );
    }
}
