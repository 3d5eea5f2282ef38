//! Face recognizer training: LBPH, Eigenfaces and Fisherfaces.
//!
//! LBPH works on crops of any size. Eigenfaces and Fisherfaces flatten each
//! crop into one vector, so every sample handed to them must share a size.

pub mod artifact;
pub mod eigenfaces;
pub mod fisherfaces;
pub mod lbph;
mod subspace;

pub use artifact::load_model;
pub use eigenfaces::EigenfaceTrainer;
pub use fisherfaces::FisherfaceTrainer;
pub use lbph::{LbphModel, LbphTrainer};
pub use subspace::SubspaceModel;

use crate::types::TrainingSample;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Lbph,
    Eigenface,
    Fisherface,
}

impl Algorithm {
    /// Name used in artifact file suffixes (`<export>_<name>.yml`).
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Lbph => "lbph",
            Algorithm::Eigenface => "eigenface",
            Algorithm::Fisherface => "fisherface",
        }
    }

    pub fn requires_uniform_size(&self) -> bool {
        !matches!(self, Algorithm::Lbph)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("{0} needs at least one training sample")]
    Empty(Algorithm),
    #[error("{algorithm} needs same-size images: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        algorithm: Algorithm,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("fisherface needs at least two distinct labels, got {0}")]
    TooFewClasses(usize),
    #[error("invalid {algorithm} parameter: {reason}")]
    InvalidParams {
        algorithm: Algorithm,
        reason: String,
    },
    #[error("{algorithm} numerical failure: {reason}")]
    Numerical {
        algorithm: Algorithm,
        reason: String,
    },
    #[error("artifact I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact {path} could not be (de)serialized: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact {path} has unsupported format version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },
}

/// Closest training sample found for a query image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: i32,
    /// Algorithm-specific distance; lower is closer.
    pub distance: f64,
}

/// A training algorithm that turns labeled face crops into a model.
pub trait Trainer {
    fn algorithm(&self) -> Algorithm;

    fn train(&self, samples: &[TrainingSample]) -> Result<Box<dyn TrainedModel>, TrainError>;
}

/// A trained recognizer that can be persisted.
pub trait TrainedModel {
    fn algorithm(&self) -> Algorithm;

    /// Nearest-neighbour label for `image`.
    fn predict(&self, image: &GrayImage) -> Result<Prediction, TrainError>;

    /// Write the model to `path`, replacing any existing file.
    fn save(&self, path: &Path) -> Result<(), TrainError>;
}

/// Check that `samples` is non-empty and every image has the same size.
fn uniform_size(algorithm: Algorithm, samples: &[TrainingSample]) -> Result<(u32, u32), TrainError> {
    let first = samples.first().ok_or(TrainError::Empty(algorithm))?;
    let expected = first.dimensions();
    if let Some(bad) = samples.iter().find(|s| s.dimensions() != expected) {
        return Err(TrainError::ShapeMismatch {
            algorithm,
            expected,
            actual: bad.dimensions(),
        });
    }
    Ok(expected)
}

fn distinct_labels(samples: &[TrainingSample]) -> Vec<i32> {
    let mut labels: Vec<i32> = samples.iter().map(|s| s.label).collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}
