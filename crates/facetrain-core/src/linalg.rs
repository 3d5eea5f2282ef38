//! Bridges between the `ndarray` matrices the recognizers store and the
//! `nalgebra` decompositions they train with.

use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2};

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn to_array(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues in descending order and the matching unit eigenvectors
/// as the columns of the second matrix.
pub fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let eigen = SymmetricEigen::new(to_dmatrix(a));

    let n = eigen.eigenvalues.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));

    let values = Array1::from_iter(order.iter().map(|&i| eigen.eigenvalues[i]));
    let vectors = Array2::from_shape_fn((n, n), |(row, col)| eigen.eigenvectors[(row, order[col])]);
    (values, vectors)
}

/// Cholesky factor `L` (lower triangular, `A = L Lᵀ`) of a symmetric
/// positive-definite matrix. `None` if `a` is not positive definite.
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    Cholesky::new(to_dmatrix(a)).map(|c| to_array(&c.l()))
}

/// Inverse of a lower-triangular matrix. `None` on a zero diagonal.
pub fn lower_triangular_inverse(l: &Array2<f64>) -> Option<Array2<f64>> {
    let n = l.nrows();
    to_dmatrix(l)
        .solve_lower_triangular(&DMatrix::identity(n, n))
        .map(|inv| to_array(&inv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < tol, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_eigen_2x2() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let (values, vectors) = symmetric_eigen(&a);
        assert!((values[0] - 3.0).abs() < 1e-10);
        assert!((values[1] - 1.0).abs() < 1e-10);
        let v0 = vectors.column(0);
        assert!((v0[0].abs() - 0.5f64.sqrt()).abs() < 1e-10);
        assert!((v0[0] - v0[1]).abs() < 1e-10, "top eigenvector should be ±(1, 1)/√2");
    }

    #[test]
    fn test_eigen_reconstructs_matrix() {
        let a = array![[4.0, 1.0, 2.0], [1.0, 3.0, 0.5], [2.0, 0.5, 5.0]];
        let (values, vectors) = symmetric_eigen(&a);
        let diag = Array2::from_diag(&values);
        let rebuilt = vectors.dot(&diag).dot(&vectors.t());
        assert_close(&rebuilt, &a, 1e-9);
        assert!(values[0] >= values[1] && values[1] >= values[2]);
    }

    #[test]
    fn test_eigen_sorts_descending() {
        let a = array![[1.0, 0.0], [0.0, 5.0]];
        let (values, vectors) = symmetric_eigen(&a);
        assert!((values[0] - 5.0).abs() < 1e-12 && (values[1] - 1.0).abs() < 1e-12);
        let abs = vectors.mapv(f64::abs);
        assert_close(&abs, &array![[0.0, 1.0], [1.0, 0.0]], 1e-12);
    }

    #[test]
    fn test_cholesky_roundtrip() {
        let a = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let l = cholesky(&a).unwrap();
        assert_close(&l.dot(&l.t()), &a, 1e-12);
        assert_eq!(l[[0, 1]], 0.0);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(cholesky(&a).is_none());
    }

    #[test]
    fn test_lower_triangular_inverse() {
        let l = array![[2.0, 0.0, 0.0], [1.0, 3.0, 0.0], [0.5, -1.0, 4.0]];
        let inv = lower_triangular_inverse(&l).unwrap();
        assert_close(&l.dot(&inv), &Array2::eye(3), 1e-12);
    }
}
