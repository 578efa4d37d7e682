//! inference::hessian — pseudo-inverse curvature and sandwich covariances.
//!
//! Purpose
//! -------
//! Turn a curvature matrix `H` (negative Hessian of the penalized
//! log-likelihood at the optimum) and, optionally, an information matrix
//! `I` into a coefficient covariance, while reporting directions along
//! which `H` carries no information.
//!
//! Key behaviors
//! -------------
//! - [`pseudo_inverse`] eigendecomposes `H` with `nalgebra`, inverts the
//!   eigenvalues above `EIGEN_EPS · max|λ|`, and collects the remaining
//!   eigenvectors as an orthonormal null-space basis.
//! - [`calc_covariance`] returns `H⁺` (curvature) or `H⁺ I H⁺` (sandwich).
//! - [`standard_errors`] takes `sqrt(max(diag, 0))`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `H` is symmetric; only its lower triangle is read.
//! - Non-positive eigenvalues (beyond the cutoff) are treated as null
//!   directions, not inverted.
//! - No explicit inverse is ever formed.
//!
//! Conventions
//! -----------
//! - Matrices cross the boundary as `ndarray`; `nalgebra` is internal.
//! - Failures are [`InferenceError`]s, never panics.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::numerical_stability::transformations::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Eigen-based pseudo-inverse of a symmetric matrix.
///
/// - `inverse`: `Σ_{λ_k > cut} v_k v_kᵀ / λ_k`.
/// - `null_space`: `p × k` matrix whose columns are the eigenvectors with
///   `λ_k ≤ cut`, where `cut = EIGEN_EPS · max|λ|`.
/// - `rank`: number of inverted eigenvalues.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoInverse {
    pub inverse: Array2<f64>,
    pub null_space: Array2<f64>,
    pub rank: usize,
}

impl PseudoInverse {
    pub fn is_singular(&self) -> bool {
        self.null_space.ncols() > 0
    }
}

/// Coefficient covariance together with the curvature decomposition it
/// was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceEstimate {
    pub cov: Array2<f64>,
    pub curvature: PseudoInverse,
}

/// Compute the symmetric pseudo-inverse of `matrix`.
///
/// Errors
/// ------
/// - `DimensionMismatch` if `matrix` is not square.
/// - `NonFiniteEntry` for NaN/∞ entries.
/// - `ZeroCurvature` if no eigenvalue exceeds the cutoff.
pub fn pseudo_inverse(matrix: &Array2<f64>) -> InferenceResult<PseudoInverse> {
    let p = matrix.nrows();
    validate_square(matrix, p)?;
    let eigen = fill_dmatrix(matrix).symmetric_eigen();
    let max_abs = eigen.eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let cut = EIGEN_EPS * max_abs;

    let mut inverse = Array2::<f64>::zeros((p, p));
    let mut null_cols = Vec::new();
    for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
        let v = eigen.eigenvectors.column(k);
        if lambda > cut && lambda > 0.0 {
            for i in 0..p {
                for j in 0..p {
                    inverse[[i, j]] += v[i] * v[j] / lambda;
                }
            }
        } else {
            null_cols.push(k);
        }
    }
    let rank = p - null_cols.len();
    if rank == 0 && p > 0 {
        return Err(InferenceError::ZeroCurvature { max_eigenvalue: max_abs });
    }
    let null_space = Array2::from_shape_fn((p, null_cols.len()), |(i, c)| {
        eigen.eigenvectors[(i, null_cols[c])]
    });
    Ok(PseudoInverse { inverse, null_space, rank })
}

/// Coefficient covariance from curvature `H` and optional information `I`.
///
/// - `information = None`: `Cov = H⁺`.
/// - `information = Some(I)`: `Cov = H⁺ I H⁺` (sandwich).
///
/// Errors
/// ------
/// - Anything [`pseudo_inverse`] reports.
/// - `DimensionMismatch` / `NonFiniteEntry` for a malformed `I`.
pub fn calc_covariance(
    curvature: &Array2<f64>, information: Option<&Array2<f64>>,
) -> InferenceResult<CovarianceEstimate> {
    let pinv = pseudo_inverse(curvature)?;
    let cov = match information {
        None => pinv.inverse.clone(),
        Some(info) => {
            validate_square(info, curvature.nrows())?;
            let sandwich = pinv.inverse.dot(info).dot(&pinv.inverse);
            symmetrize(sandwich)
        }
    };
    Ok(CovarianceEstimate { cov, curvature: pinv })
}

/// `sqrt(max(diag(cov), 0))`; tiny negative diagonals from rounding map to 0.
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(|v| v.max(0.0).sqrt())
}

// ---- Helper methods ----

fn fill_dmatrix(matrix: &Array2<f64>) -> DMatrix<f64> {
    let n = matrix.nrows();
    let mut out = DMatrix::<f64>::zeros(n, n);
    for j in 0..n {
        for i in j..n {
            out[(i, j)] = matrix[[i, j]];
            out[(j, i)] = matrix[[i, j]];
        }
    }
    out
}

fn validate_square(matrix: &Array2<f64>, dim: usize) -> InferenceResult<()> {
    if matrix.nrows() != dim || matrix.ncols() != dim {
        return Err(InferenceError::DimensionMismatch {
            expected: dim,
            found: (matrix.nrows(), matrix.ncols()),
        });
    }
    for ((row, col), &value) in matrix.indexed_iter() {
        if !value.is_finite() {
            return Err(InferenceError::NonFiniteEntry { row, col, value });
        }
    }
    Ok(())
}

fn symmetrize(mut m: Array2<f64>) -> Array2<f64> {
    for i in 0..m.nrows() {
        for j in 0..i {
            let avg = 0.5 * (m[[i, j]] + m[[j, i]]);
            m[[i, j]] = avg;
            m[[j, i]] = avg;
        }
    }
    m
}
