//! Fisherfaces: PCA down to `N - C` dimensions, then LDA down to at most
//! `C - 1`, nearest neighbour in the combined projection.

use super::subspace::{sample_matrix, Pca, SubspaceModel};
use super::{distinct_labels, uniform_size, Algorithm, TrainError, TrainedModel, Trainer};
use crate::linalg;
use crate::types::TrainingSample;
use ndarray::{s, Array2, Axis};

/// Ridge added to the within-class scatter, relative to its mean diagonal.
const WITHIN_CLASS_RIDGE: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct FisherfaceTrainer {
    /// Discriminant components to keep; `0` (or anything above `C - 1`) keeps `C - 1`.
    pub num_components: usize,
}

impl FisherfaceTrainer {
    pub fn new(num_components: usize) -> Self {
        Self { num_components }
    }

    pub fn fit(&self, samples: &[TrainingSample]) -> Result<SubspaceModel, TrainError> {
        let size = uniform_size(Algorithm::Fisherface, samples)?;
        let classes = distinct_labels(samples);
        if classes.len() < 2 {
            return Err(TrainError::TooFewClasses(classes.len()));
        }

        let n = samples.len();
        let c = classes.len();
        let data = sample_matrix(samples);
        let labels: Vec<i32> = samples.iter().map(|s| s.label).collect();

        let pca = Pca::fit(&data, n - c);
        if pca.components.ncols() == 0 {
            return Err(numerical("training images have no pixel variance"));
        }
        let reduced = (&data - &pca.mean).dot(&pca.components);

        let keep = match self.num_components {
            0 => c - 1,
            k => k.min(c - 1),
        }
        .min(reduced.ncols());
        let lda = lda(&reduced, &labels, &classes, keep)?;

        tracing::info!(
            samples = n,
            classes = c,
            width = size.0,
            height = size.1,
            pca_components = pca.components.ncols(),
            components = lda.ncols(),
            "fisherfaces trained"
        );

        let components = pca.components.dot(&lda);
        Ok(SubspaceModel::new(
            Algorithm::Fisherface,
            size,
            &data,
            pca.mean,
            components,
            labels,
        ))
    }
}

impl Trainer for FisherfaceTrainer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Fisherface
    }

    fn train(&self, samples: &[TrainingSample]) -> Result<Box<dyn TrainedModel>, TrainError> {
        Ok(Box::new(self.fit(samples)?))
    }
}

fn numerical(reason: &str) -> TrainError {
    TrainError::Numerical {
        algorithm: Algorithm::Fisherface,
        reason: reason.to_string(),
    }
}

/// Linear discriminant directions of `x` (rows are samples), `p × keep`.
///
/// Solves `Sb w = λ Sw w` by whitening with the Cholesky factor of `Sw`.
fn lda(
    x: &Array2<f64>,
    labels: &[i32],
    classes: &[i32],
    keep: usize,
) -> Result<Array2<f64>, TrainError> {
    let p = x.ncols();
    let total_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| numerical("no samples"))?;

    let mut sw = Array2::<f64>::zeros((p, p));
    let mut sb = Array2::<f64>::zeros((p, p));
    for &class in classes {
        let rows: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        let members = x.select(Axis(0), &rows);
        let class_mean = members
            .mean_axis(Axis(0))
            .ok_or_else(|| numerical("empty class"))?;

        let centered = &members - &class_mean;
        sw += &centered.t().dot(&centered);

        let d = (&class_mean - &total_mean).insert_axis(Axis(1));
        sb += &(d.dot(&d.t()) * rows.len() as f64);
    }

    let ridge = (sw.diag().sum() / p as f64).max(f64::EPSILON) * WITHIN_CLASS_RIDGE;
    sw += &(Array2::<f64>::eye(p) * ridge);

    let l = linalg::cholesky(&sw).ok_or_else(|| numerical("within-class scatter is not positive definite"))?;
    let l_inv = linalg::lower_triangular_inverse(&l)
        .ok_or_else(|| numerical("within-class scatter factor is singular"))?;
    let m = l_inv.dot(&sb).dot(&l_inv.t());
    let m = (&m + &m.t()) * 0.5;

    let (_, vectors) = linalg::symmetric_eigen(&m);
    let w = l_inv.t().dot(&vectors.slice(s![.., ..keep]));

    if w.iter().any(|v| !v.is_finite()) {
        return Err(numerical("discriminant directions are not finite"));
    }
    Ok(normalize_columns(w))
}

fn normalize_columns(mut w: Array2<f64>) -> Array2<f64> {
    for mut col in w.columns_mut() {
        let norm = col.dot(&col).sqrt();
        if norm > 0.0 {
            col /= norm;
        }
    }
    w
}
