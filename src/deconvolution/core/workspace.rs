//! Mixture workspace: everything the objective needs at one `α`.
//!
//! Purpose
//! -------
//! Map coefficients `α` to the prior `g = softmax(Qα)` and the marginal
//! `f = P g`, then expose the log-likelihood and its derivatives through
//! the softmax and the mixture structure.
//!
//! Key behaviors
//! -------------
//! - [`MixtureState::evaluate`] validates `α`, computes `η`, `g`, `f` and
//!   `log f`, and checks that every observed row has a positive marginal.
//! - [`MixtureState::posterior_matrix`]: `Π[x, j] = P[x, j] g_j / f_x`.
//! - Derivatives in `η` (then mapped through `Q`):
//!   - score `w = Σₓ yₓ (πₓ − g) = Πᵀy − N g`,
//!   - Hessian `diag(w) − ΠᵀYΠ + N g gᵀ`,
//!   - outer-product information `Σₓ yₓ (πₓ − g)(πₓ − g)ᵀ`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `g` is computed with a max-shifted softmax; entries are non-negative
//!   and sum to one without clipping.
//! - Rows with `yₓ = 0` never enter the likelihood, so a zero marginal
//!   there is harmless; their posterior rows are left at zero.
//! - A marginal that underflows `f64` is recomputed as
//!   `log fₓ = lse_j(log P[x, j] + log g_j)`, so far-out coefficients give a
//!   very negative but finite `ℓ`. Only rows whose kernel vanishes on the
//!   whole support are rejected.
//!
//! Conventions
//! -----------
//! - All quantities refer to the *unpenalized* log-likelihood; the penalty
//!   is added by the model.
//! - Purely numeric; no logging.
use crate::{
    deconvolution::{
        core::{basis::DesignMatrix, kernel::KernelMatrix},
        errors::{DeconvError, DeconvResult},
    },
    optimization::numerical_stability::transformations::{log_sum_exp, safe_softmax},
};
use ndarray::{Array1, Array2, ArrayView1, Axis};

#[derive(Debug, Clone, PartialEq)]
pub struct MixtureState {
    pub eta: Array1<f64>,
    pub g: Array1<f64>,
    pub f: Array1<f64>,
    pub log_g: Array1<f64>,
    pub log_f: Array1<f64>,
}

impl MixtureState {
    /// # Errors
    /// - `CoefficientLengthMismatch` if `alpha.len() != Q.ncols()`.
    /// - `NonFiniteCoefficient` for NaN/±inf entries.
    /// - `InvalidMarginal` if a row with a positive count has zero kernel
    ///   mass on every support point (`log f = −∞`).
    pub fn evaluate(
        design: &DesignMatrix, kernel: &KernelMatrix, counts: ArrayView1<f64>,
        alpha: ArrayView1<f64>,
    ) -> DeconvResult<Self> {
        if alpha.len() != design.n_coef() {
            return Err(DeconvError::CoefficientLengthMismatch {
                expected: design.n_coef(),
                actual: alpha.len(),
            });
        }
        if let Some(index) = alpha.iter().position(|a| !a.is_finite()) {
            return Err(DeconvError::NonFiniteCoefficient { index, value: alpha[index] });
        }
        let eta = design.eta(alpha);
        let g = safe_softmax(eta.view());
        let lse = log_sum_exp(eta.view());
        let log_g = eta.mapv(|v| v - lse);
        let f = kernel.marginal(g.view());
        let mut log_f = f.mapv(f64::ln);
        let rows = log_f.iter_mut().zip(f.iter().zip(counts.iter())).enumerate();
        for (row, (lf, (&fx, &yx))) in rows {
            if fx < f64::MIN_POSITIVE {
                *lf = log_mixture(kernel.matrix.row(row), log_g.view());
            }
            if yx > 0.0 && !lf.is_finite() {
                return Err(DeconvError::InvalidMarginal { row, value: fx });
            }
        }
        Ok(Self { eta, g, f, log_g, log_f })
    }

    /// `Σₓ yₓ log fₓ`.
    pub fn loglik(&self, counts: ArrayView1<f64>) -> f64 {
        self.log_f
            .iter()
            .zip(counts.iter())
            .map(|(&lf, &y)| if y > 0.0 { y * lf } else { 0.0 })
            .sum()
    }

    /// Posterior rows `πₓ`; rows with zero marginal stay zero.
    pub fn posterior_matrix(&self, kernel: &KernelMatrix) -> Array2<f64> {
        let mut pi = &kernel.matrix * &self.g.view().insert_axis(Axis(0));
        for (x, mut row) in pi.rows_mut().into_iter().enumerate() {
            let (fx, lf) = (self.f[x], self.log_f[x]);
            if fx >= f64::MIN_POSITIVE {
                row /= fx;
            } else if lf.is_finite() {
                for (j, v) in row.iter_mut().enumerate() {
                    let p = kernel.matrix[[x, j]];
                    *v = if p > 0.0 { (p.ln() + self.log_g[j] - lf).exp() } else { 0.0 };
                }
            } else {
                row.fill(0.0);
            }
        }
        pi
    }

    /// Score in `η`: `Πᵀy − N g`.
    pub fn score_eta(&self, kernel: &KernelMatrix, counts: ArrayView1<f64>) -> Array1<f64> {
        let pi = self.posterior_matrix(kernel);
        let n = counts.sum();
        pi.t().dot(&counts) - &self.g * n
    }

    /// Hessian of `ℓ` in `η`.
    pub fn hessian_eta(&self, kernel: &KernelMatrix, counts: ArrayView1<f64>) -> Array2<f64> {
        let w = self.score_eta(kernel, counts);
        let pi = self.posterior_matrix(kernel);
        let weighted = &pi * &counts.insert_axis(Axis(1));
        let n = counts.sum();
        let g_col = self.g.view().insert_axis(Axis(1));
        Array2::from_diag(&w) - pi.t().dot(&weighted) + g_col.dot(&g_col.t()) * n
    }

    /// `Σₓ yₓ (πₓ − g)(πₓ − g)ᵀ` in `η`.
    pub fn information_eta(&self, kernel: &KernelMatrix, counts: ArrayView1<f64>) -> Array2<f64> {
        let centered = self.posterior_matrix(kernel) - &self.g.view().insert_axis(Axis(0));
        let weighted = &centered * &counts.insert_axis(Axis(1));
        centered.t().dot(&weighted)
    }

    /// `∇ℓ(α) = Qᵀ w`.
    pub fn gradient(
        &self, design: &DesignMatrix, kernel: &KernelMatrix, counts: ArrayView1<f64>,
    ) -> Array1<f64> {
        design.q.t().dot(&self.score_eta(kernel, counts))
    }

    /// `∇²ℓ(α) = Qᵀ Hη Q`.
    pub fn hessian(
        &self, design: &DesignMatrix, kernel: &KernelMatrix, counts: ArrayView1<f64>,
    ) -> Array2<f64> {
        sandwich_q(&design.q, &self.hessian_eta(kernel, counts))
    }

    /// Outer-product information in `α`.
    pub fn information(
        &self, design: &DesignMatrix, kernel: &KernelMatrix, counts: ArrayView1<f64>,
    ) -> Array2<f64> {
        sandwich_q(&design.q, &self.information_eta(kernel, counts))
    }
}

/// `ln Σ_j P[x, j] g_j` from `log g`, skipping zero kernel entries.
fn log_mixture(p_row: ArrayView1<f64>, log_g: ArrayView1<f64>) -> f64 {
    let terms: Array1<f64> = p_row
        .iter()
        .zip(log_g.iter())
        .map(|(&p, &lg)| if p > 0.0 { p.ln() + lg } else { f64::NEG_INFINITY })
        .collect();
    log_sum_exp(terms.view())
}

fn sandwich_q(q: &Array2<f64>, inner: &Array2<f64>) -> Array2<f64> {
    let out = q.t().dot(inner).dot(q);
    (&out + &out.t()) * 0.5
}
