//! facetrain-core: face recognizer training from a labeled photo directory.
//!
//! Scans `<label>_<name>` image files, crops faces with a pluggable
//! [`FaceLocator`], and trains LBPH on native-size crops plus Eigenfaces and
//! Fisherfaces on crops resized to the dataset's largest face.

pub mod dataset;
pub mod detector;
pub mod extractor;
pub mod linalg;
pub mod locator;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use dataset::{parse_label, Dataset};
pub use detector::ScrfdLocator;
pub use extractor::{Extraction, FaceExtractor};
pub use locator::FaceLocator;
pub use pipeline::{artifact_path, TrainedArtifacts, Trainers, TrainingPipeline};
pub use recognizer::{Algorithm, Prediction, TrainedModel, Trainer};
pub use types::{CropSize, DatasetEntry, DetectParams, FaceRect, TrainingSample};
