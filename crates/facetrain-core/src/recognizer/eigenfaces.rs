//! Eigenfaces: PCA over flattened face crops, nearest neighbour in PCA space.

use super::subspace::{sample_matrix, Pca, SubspaceModel};
use super::{uniform_size, Algorithm, TrainError, TrainedModel, Trainer};
use crate::types::TrainingSample;

#[derive(Debug, Clone, Default)]
pub struct EigenfaceTrainer {
    /// Components to keep; `0` keeps all with non-zero variance.
    pub num_components: usize,
}

impl EigenfaceTrainer {
    pub fn new(num_components: usize) -> Self {
        Self { num_components }
    }

    pub fn fit(&self, samples: &[TrainingSample]) -> Result<SubspaceModel, TrainError> {
        let size = uniform_size(Algorithm::Eigenface, samples)?;
        let data = sample_matrix(samples);
        let pca = Pca::fit(&data, self.num_components);

        tracing::info!(
            samples = samples.len(),
            width = size.0,
            height = size.1,
            components = pca.components.ncols(),
            "eigenfaces trained"
        );

        Ok(SubspaceModel::new(
            Algorithm::Eigenface,
            size,
            &data,
            pca.mean,
            pca.components,
            samples.iter().map(|s| s.label).collect(),
        ))
    }
}

impl Trainer for EigenfaceTrainer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Eigenface
    }

    fn train(&self, samples: &[TrainingSample]) -> Result<Box<dyn TrainedModel>, TrainError> {
        Ok(Box::new(self.fit(samples)?))
    }
}
