//! Dense Cholesky solve for symmetric positive definite systems

use crate::core::{CoresetError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Lower-triangular factor L with A = LLᵀ
pub fn cholesky(a: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(CoresetError::DimensionMismatch {
            expected: n,
            actual: a.ncols(),
        });
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diagonal = a[[j, j]];
        for k in 0..j {
            diagonal -= l[[j, k]] * l[[j, k]];
        }
        if !(diagonal > 0.0) || !diagonal.is_finite() {
            return Err(CoresetError::OptimizationError(format!(
                "matrix is not positive definite (pivot {} is {:e})",
                j, diagonal
            )));
        }
        let pivot = diagonal.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut value = a[[i, j]];
            for k in 0..j {
                value -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = value / pivot;
        }
    }
    Ok(l)
}

/// Solve Ax = b for symmetric positive definite A
pub fn cholesky_solve(a: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
    if b.len() != a.nrows() {
        return Err(CoresetError::DimensionMismatch {
            expected: a.nrows(),
            actual: b.len(),
        });
    }
    let l = cholesky(a)?;
    let n = b.len();

    // Forward substitution: Ly = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut value = b[i];
        for k in 0..i {
            value -= l[[i, k]] * y[k];
        }
        y[i] = value / l[[i, i]];
    }

    // Back substitution: Lᵀx = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut value = y[i];
        for k in (i + 1)..n {
            value -= l[[k, i]] * x[k];
        }
        x[i] = value / l[[i, i]];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_factor_reconstructs() {
        let a = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let l = cholesky(a.view()).unwrap();
        let rebuilt = l.dot(&l.t());
        for (r, e) in rebuilt.iter().zip(a.iter()) {
            assert_abs_diff_eq!(r, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_solve() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![1.0, 2.0];
        let x = cholesky_solve(a.view(), b.view()).unwrap();
        // 4x + y = 1, x + 3y = 2 -> x = 1/11, y = 7/11
        assert_abs_diff_eq!(x[0], 1.0 / 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 7.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_not_positive_definite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        let result = cholesky(a.view());
        assert!(matches!(result, Err(CoresetError::OptimizationError(_))));
    }
}
