//! Shared machinery for the linear-subspace recognizers (Eigenfaces, Fisherfaces).

use super::{artifact, Algorithm, Prediction, TrainError, TrainedModel};
use crate::linalg;
use crate::types::TrainingSample;
use image::GrayImage;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Eigenvalues at or below this fraction of the largest are treated as zero.
const PCA_RELATIVE_EPSILON: f64 = 1e-10;

/// Flatten same-size samples into an `n × (width·height)` row matrix.
pub(super) fn sample_matrix(samples: &[TrainingSample]) -> Array2<f64> {
    let d = samples.first().map_or(0, |s| s.image.as_raw().len());
    let mut data = Array2::<f64>::zeros((samples.len(), d));
    for (mut row, sample) in data.axis_iter_mut(Axis(0)).zip(samples) {
        for (dst, &px) in row.iter_mut().zip(sample.image.as_raw()) {
            *dst = px as f64;
        }
    }
    data
}

/// Principal components of a row matrix, computed through the `n × n` Gram
/// matrix so the cost depends on the sample count rather than the pixel count.
pub(super) struct Pca {
    pub mean: Array1<f64>,
    /// `d × k`, unit-length columns ordered by decreasing variance.
    pub components: Array2<f64>,
}

impl Pca {
    /// Keep at most `max_components` components; `0` keeps every component
    /// with non-zero variance.
    pub fn fit(data: &Array2<f64>, max_components: usize) -> Pca {
        let (n, d) = data.dim();
        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(d));
        let centered = data - &mean;

        let gram = centered.dot(&centered.t());
        let (values, vectors) = linalg::symmetric_eigen(&gram);

        let limit = if max_components == 0 { n } else { max_components.min(n) };
        let floor = values.first().copied().unwrap_or(0.0).max(0.0) * PCA_RELATIVE_EPSILON;
        let kept: Vec<usize> = (0..n)
            .filter(|&i| values[i] > floor && values[i] > 0.0)
            .take(limit)
            .collect();

        let mut components = Array2::<f64>::zeros((d, kept.len()));
        for (j, &i) in kept.iter().enumerate() {
            let u = centered.t().dot(&vectors.column(i));
            let norm = u.dot(&u).sqrt();
            if norm > 0.0 {
                components.column_mut(j).assign(&(u / norm));
            }
        }

        Pca { mean, components }
    }
}

/// A trained Eigenfaces or Fisherfaces model: a mean face, a projection
/// basis, and every training sample projected onto that basis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubspaceModel {
    pub algorithm: Algorithm,
    pub width: u32,
    pub height: u32,
    pub mean: Array1<f64>,
    /// `(width·height) × k` projection basis.
    pub components: Array2<f64>,
    /// `n × k` projections of the training samples.
    pub projections: Array2<f64>,
    pub labels: Vec<i32>,
}

impl SubspaceModel {
    pub(super) fn new(
        algorithm: Algorithm,
        (width, height): (u32, u32),
        data: &Array2<f64>,
        mean: Array1<f64>,
        components: Array2<f64>,
        labels: Vec<i32>,
    ) -> Self {
        let projections = (data - &mean).dot(&components);
        Self {
            algorithm,
            width,
            height,
            mean,
            components,
            projections,
            labels,
        }
    }

    pub fn num_components(&self) -> usize {
        self.components.ncols()
    }

    fn project(&self, pixels: ArrayView1<f64>) -> Array1<f64> {
        (&pixels - &self.mean).dot(&self.components)
    }
}

impl TrainedModel for SubspaceModel {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn predict(&self, image: &GrayImage) -> Result<Prediction, TrainError> {
        if image.dimensions() != (self.width, self.height) {
            return Err(TrainError::ShapeMismatch {
                algorithm: self.algorithm,
                expected: (self.width, self.height),
                actual: image.dimensions(),
            });
        }
        let pixels = Array1::from_iter(image.as_raw().iter().map(|&p| p as f64));
        let query = self.project(pixels.view());

        let best = self
            .projections
            .axis_iter(Axis(0))
            .zip(&self.labels)
            .map(|(row, &label)| {
                let diff = &row - &query;
                (label, diff.dot(&diff).sqrt())
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((label, distance)) => Ok(Prediction { label, distance }),
            None => Err(TrainError::Empty(self.algorithm)),
        }
    }

    fn save(&self, path: &Path) -> Result<(), TrainError> {
        artifact::write(path, self.algorithm, &self.labels, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pca_finds_dominant_axis() {
        // Points spread along (1, 1) with a small (1, -1) wobble.
        let data = array![[0.0, 0.0], [1.0, 1.2], [2.0, 1.8], [3.0, 3.1], [4.0, 3.9]];
        let pca = Pca::fit(&data, 1);
        assert_eq!(pca.components.dim(), (2, 1));
        let c = pca.components.column(0);
        assert!((c[0].abs() - c[1].abs()).abs() < 0.05, "axis {c:?}");
        assert!((c.dot(&c) - 1.0).abs() < 1e-9);
        assert!((pca.mean[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pca_drops_zero_variance() {
        let data = array![[1.0, 2.0, 3.0], [1.0, 2.0, 3.0]];
        let pca = Pca::fit(&data, 0);
        assert_eq!(pca.components.ncols(), 0);
    }

    #[test]
    fn test_pca_rank_bounded_by_samples() {
        let data = array![[1.0, 0.0, 0.0, 2.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 5.0]];
        let pca = Pca::fit(&data, 0);
        // Three centered samples span at most two dimensions.
        assert_eq!(pca.components.ncols(), 2);
    }

    #[test]
    fn test_predict_rejects_wrong_size() {
        let data = array![[0.0, 1.0, 2.0, 3.0]];
        let model = SubspaceModel::new(
            Algorithm::Eigenface,
            (2, 2),
            &data,
            array![0.0, 1.0, 2.0, 3.0],
            Array2::zeros((4, 0)),
            vec![7],
        );
        let err = model.predict(&GrayImage::new(3, 2)).unwrap_err();
        assert!(matches!(err, TrainError::ShapeMismatch { .. }));
        let ok = model.predict(&GrayImage::new(2, 2)).unwrap();
        assert_eq!(ok.label, 7);
    }
}
