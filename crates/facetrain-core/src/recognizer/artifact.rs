//! On-disk model artifacts.
//!
//! Every artifact is a JSON document (valid YAML 1.2, hence the `.yml`
//! suffix) with a small envelope around the algorithm-specific model:
//!
//! ```text
//! { "format_version": 1, "algorithm": "lbph", "trained_at": "...",
//!   "samples": 12, "classes": [1, 2], "model": { ... } }
//! ```

use super::{Algorithm, LbphModel, SubspaceModel, TrainError, TrainedModel};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactOut<'a, M> {
    format_version: u32,
    algorithm: Algorithm,
    trained_at: String,
    samples: usize,
    classes: Vec<i32>,
    model: &'a M,
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
    algorithm: Algorithm,
}

#[derive(Deserialize)]
struct ArtifactIn<M> {
    model: M,
}

/// Serialize `model` with its envelope to `path`, truncating any old file.
pub(crate) fn write<M: Serialize>(
    path: &Path,
    algorithm: Algorithm,
    labels: &[i32],
    model: &M,
) -> Result<(), TrainError> {
    let mut classes = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();

    let artifact = ArtifactOut {
        format_version: FORMAT_VERSION,
        algorithm,
        trained_at: chrono::Utc::now().to_rfc3339(),
        samples: labels.len(),
        classes,
        model,
    };

    let io_err = |source| TrainError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut writer, &artifact).map_err(|source| TrainError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;

    tracing::debug!(path = %path.display(), %algorithm, "artifact serialized");
    Ok(())
}

/// Read an artifact written by any of the trainers.
pub fn load_model(path: &Path) -> Result<Box<dyn TrainedModel>, TrainError> {
    let text = std::fs::read_to_string(path).map_err(|source| TrainError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let header: Header = parse(path, &text)?;
    if header.format_version != FORMAT_VERSION {
        return Err(TrainError::UnsupportedVersion {
            path: path.to_path_buf(),
            version: header.format_version,
        });
    }

    let model: Box<dyn TrainedModel> = match header.algorithm {
        Algorithm::Lbph => Box::new(parse::<ArtifactIn<LbphModel>>(path, &text)?.model),
        Algorithm::Eigenface | Algorithm::Fisherface => {
            let model = parse::<ArtifactIn<SubspaceModel>>(path, &text)?.model;
            if model.algorithm() != header.algorithm {
                return Err(TrainError::InvalidParams {
                    algorithm: header.algorithm,
                    reason: format!("artifact envelope disagrees with model ({})", model.algorithm()),
                });
            }
            Box::new(model)
        }
    };
    Ok(model)
}

fn parse<T: DeserializeOwned>(path: &Path, text: &str) -> Result<T, TrainError> {
    serde_json::from_str(text).map_err(|source| TrainError::Format {
        path: path.to_path_buf(),
        source,
    })
}
