//! Numerical stability utilities for the softmax parametrization.
//!
//! Prior masses are stored as unconstrained scores `η ∈ ℝᵐ` and mapped to
//! the simplex with a softmax. The naïve `exp(η_j) / Σ exp(η_k)` overflows
//! for large scores, so everything here works relative to `max η`.
//!
//! # Provided items
//! - [`EIGEN_EPS`]: relative eigenvalue cutoff for pseudo-inverses.
//! - [`GENERAL_TOL`]: absolute tolerance for "is this zero" checks.
//! - [`log_sum_exp`]: stable `ln Σ exp(η_k)`.
//! - [`safe_softmax`]: stable softmax onto the simplex.
//! - [`softmax_jacobian`]: `∂g/∂η = diag(g) - g gᵀ`.
//! - [`delta_method`]: `J Σ Jᵀ` covariance propagation.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Relative eigenvalue cutoff for symmetric pseudo-inverses.
///
/// Eigenvalues with `|λ| ≤ EIGEN_EPS · max|λ|` are treated as zero.
pub const EIGEN_EPS: f64 = 1e-10;

/// Absolute tolerance for zero checks (e.g. mass that should vanish).
pub const GENERAL_TOL: f64 = 1e-12;

/// `ln Σ_k exp(η_k)` evaluated as `m + ln Σ exp(η_k - m)` with `m = max η`.
///
/// Returns `-∞` for an empty input and propagates `NaN`.
pub fn log_sum_exp(eta: ArrayView1<f64>) -> f64 {
    let max = eta.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + eta.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}

/// Stable softmax `g_j = exp(η_j - lse(η))`.
///
/// The output is non-negative and sums to one up to rounding for any
/// finite input; an empty input yields an empty vector.
pub fn safe_softmax(eta: ArrayView1<f64>) -> Array1<f64> {
    if eta.is_empty() {
        return Array1::zeros(0);
    }
    let lse = log_sum_exp(eta);
    eta.mapv(|v| (v - lse).exp())
}

/// Jacobian of the softmax, `∂g_i/∂η_j = g_i (δ_ij - g_j)`, as a dense
/// `m × m` matrix evaluated at the simplex point `g`.
pub fn softmax_jacobian(g: ArrayView1<f64>) -> Array2<f64> {
    let m = g.len();
    let mut jac = Array2::from_shape_fn((m, m), |(i, j)| -g[i] * g[j]);
    for i in 0..m {
        jac[[i, i]] += g[i];
    }
    jac
}

/// Delta-method propagation `J Σ Jᵀ` of a parameter covariance `Σ`
/// through a Jacobian `J` (`k × p` with `Σ` of size `p × p`).
///
/// The output is symmetrized to remove rounding asymmetry.
pub fn delta_method(cov: ArrayView2<f64>, jac: ArrayView2<f64>) -> Array2<f64> {
    let mut out = jac.dot(&cov).dot(&jac.t());
    let k = out.nrows();
    for i in 0..k {
        for j in 0..i {
            let avg = 0.5 * (out[[i, j]] + out[[j, i]]);
            out[[i, j]] = avg;
            out[[j, i]] = avg;
        }
    }
    out
}
