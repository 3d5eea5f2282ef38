//! Dataset directory scanning and filename label parsing.
//!
//! A dataset is a flat directory of images named `<label>_<anything>`, where
//! `<label>` is the integer identity of the person in the photo.

use crate::types::DatasetEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("cannot read dataset directory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Files listed from a dataset directory, split by whether a label parsed.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    entries: Vec<DatasetEntry>,
    unlabeled: Vec<PathBuf>,
}

impl Dataset {
    /// List `dir` (no recursion, no filtering) and parse labels.
    ///
    /// Every listing entry is a candidate, sub-directories included; a labeled
    /// one fails later when it is decoded. Entries are ordered by name so
    /// repeated scans agree across platforms.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let dir = dir.as_ref();
        let read_err = |source| DatasetError::Read {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            files.push(entry.map_err(read_err)?.path());
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let dataset = Self::from_paths(files);
        tracing::info!(
            dir = %dir.display(),
            files = dataset.count(),
            labeled = dataset.entries.len(),
            unlabeled = dataset.unlabeled.len(),
            "scanned dataset"
        );
        Ok(dataset)
    }

    /// Build a dataset from already-listed paths, keeping their order.
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut dataset = Self::default();
        for path in paths {
            let label = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_label);
            match label {
                Some(label) => dataset.entries.push(DatasetEntry { path, label }),
                None => dataset.unlabeled.push(path),
            }
        }
        dataset
    }

    /// Number of directory entries, labeled or not.
    pub fn count(&self) -> usize {
        self.entries.len() + self.unlabeled.len()
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// Files dropped because their name carries no integer label.
    pub fn unlabeled(&self) -> &[PathBuf] {
        &self.unlabeled
    }
}

/// Parse the identity label from a file name: the text before the first `_`.
///
/// `"12_anything.png"` gives `Some(12)`; `"abc.png"` and `"7.png"` give `None`.
pub fn parse_label(file_name: &str) -> Option<i32> {
    let prefix = file_name.split('_').next()?;
    prefix.parse().ok()
}
