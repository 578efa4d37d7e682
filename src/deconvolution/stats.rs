//! Statistics engine: uncertainty and bias of the fitted prior.
//!
//! Purpose
//! -------
//! Turn the optimizer's `α̂` into the reported fit: `ĝ`, its covariance,
//! standard errors, second-order bias, the cumulative `Ĝ` with its standard
//! errors, and the `S` statistic.
//!
//! Key behaviors
//! -------------
//! - Covariance of `α̂` ([`CovarianceKind`]):
//!   - `Curvature`: `H⁺` with `H = −∇²ℓ(α̂) + ∇²pen(α̂)`;
//!   - `Sandwich`: `B⁺ I B⁺` with `B = I + ∇²pen(α̂)` and `I` the
//!     outer-product information.
//! - Delta method through `D = J_softmax(ĝ) Q`: `Cov(ĝ) = D Cov(α̂) Dᵀ`,
//!   `SE(ĝ) = sqrt(diag)`.
//! - Bias: `D b_α + ½ tr(∇²g_j V)` with `b_α = −B⁺ ∇pen(α̂)` (`B` the bread
//!   used for the covariance) and `V = Q Cov(α̂) Qᵀ`.
//! - `S = tr(∇²pen(α̂)) / tr(I(α̂))`; NaN if the information trace is zero.
//!
//! Invariants & assumptions
//! ------------------------
//! - Standard errors are non-negative or NaN, never negative.
//! - Singular curvature does not fail the fit: entries of `ĝ` (and `Ĝ`)
//!   that move along a null direction of the curvature get NaN standard
//!   error and bias, the rest are reported from the pseudo-inverse, and
//!   [`CurvatureStatus::Singular`] records the null dimension.
use crate::{
    deconvolution::{
        core::{family::Family, kernel::KernelMatrix, options::CovarianceKind},
        errors::DeconvResult,
        models::deconv::{DeconvData, DeconvModel},
    },
    inference::{
        errors::InferenceError,
        hessian::{calc_covariance, standard_errors},
    },
    optimization::{
        loglik_optimizer::OptimOutcome,
        numerical_stability::transformations::{delta_method, softmax_jacobian},
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Relative size above which a grid row counts as moving along a null
/// direction of the curvature.
const NULL_DIRECTION_TOL: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurvatureStatus {
    Regular,
    /// The curvature had `null_dims` eigenvalues at or below the cutoff.
    Singular { null_dims: usize },
}

/// Immutable snapshot of a fitted deconvolution.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub family: Family,
    pub theta: Array1<f64>,
    pub alpha: Array1<f64>,
    pub g: Array1<f64>,
    pub se_g: Array1<f64>,
    pub bias_g: Array1<f64>,
    /// `G = cumsum(g)`.
    pub cdf: Array1<f64>,
    pub se_cdf: Array1<f64>,
    pub cov_alpha: Array2<f64>,
    pub cov_g: Array2<f64>,
    pub s_statistic: f64,
    /// Unpenalized log-likelihood at `α̂`.
    pub loglik: f64,
    pub penalized_loglik: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub curvature: CurvatureStatus,
    pub covariance_kind: CovarianceKind,
    /// Whether the Poisson kernel was zero-truncated.
    pub zero_truncated: bool,
    pub kernel: KernelMatrix,
    pub counts: Array1<f64>,
}

impl FitResult {
    pub fn n_obs(&self) -> f64 {
        self.counts.sum()
    }

    /// `Σⱼ θⱼ ĝⱼ`.
    pub fn prior_mean(&self) -> f64 {
        self.theta.dot(&self.g)
    }
}

/// Build the [`FitResult`] for `model` at the optimizer's `α̂`.
///
/// # Errors
/// - Mixture errors if `α̂` is invalid for `data` (should not happen for an
///   outcome produced on the same data).
/// - Inference errors other than an all-zero curvature (malformed input).
pub fn compute_statistics(
    model: &DeconvModel, data: &DeconvData, outcome: &OptimOutcome,
) -> DeconvResult<FitResult> {
    let alpha = outcome.theta_hat.clone();
    let counts = data.counts();
    let q = &model.design.q;
    let state = model.state(&alpha, data)?;

    let loglik = state.loglik(counts);
    let penalized_loglik = loglik - model.penalty.value(alpha.view());
    let pen_grad = model.penalty.gradient(alpha.view());
    let pen_hess = model.penalty.hessian(alpha.view());
    let info = state.information(&model.design, &data.kernel, counts);
    let s_statistic = s_statistic(&pen_hess, &info);

    let kind = model.options.covariance;
    let (bread, outer) = match kind {
        CovarianceKind::Curvature => {
            (&pen_hess - &state.hessian(&model.design, &data.kernel, counts), None)
        }
        CovarianceKind::Sandwich => (&info + &pen_hess, Some(&info)),
    };

    let d = softmax_jacobian(state.g.view()).dot(q);
    let d_cdf = cumulative_rows(d.view());
    let (m, p) = d.dim();
    let cdf = cumulative(state.g.view());

    let (cov_alpha, mut cov_g, mut se_g, mut bias_g, mut se_cdf, curvature) =
        match calc_covariance(&bread, outer) {
            Ok(est) => {
                let cov = est.cov;
                let cov_g = delta_method(cov.view(), d.view());
                let se_g = standard_errors(&cov_g);
                let b_alpha = -est.curvature.inverse.dot(&pen_grad);
                let v = delta_method(cov.view(), q.view());
                let bias_g = d.dot(&b_alpha) + softmax_second_order(state.g.view(), v.view());
                let se_cdf = standard_errors(&delta_method(cov.view(), d_cdf.view()));
                let curvature = match est.curvature.null_space.ncols() {
                    0 => CurvatureStatus::Regular,
                    null_dims => CurvatureStatus::Singular { null_dims },
                };
                let null = est.curvature.null_space;
                (cov, cov_g, se_g, bias_g, se_cdf, (curvature, Some(null)))
            }
            Err(InferenceError::ZeroCurvature { .. }) => (
                Array2::from_elem((p, p), f64::NAN),
                Array2::from_elem((m, m), f64::NAN),
                Array1::from_elem(m, f64::NAN),
                Array1::from_elem(m, f64::NAN),
                Array1::from_elem(m, f64::NAN),
                (CurvatureStatus::Singular { null_dims: p }, None),
            ),
            Err(err) => return Err(err.into()),
        };
    let (curvature, null_space) = curvature;

    if let CurvatureStatus::Singular { null_dims } = curvature {
        log::warn!(
            "Curvature at the optimum has {null_dims} null direction(s); affected standard \
             errors and biases are reported as NaN."
        );
    }
    if let Some(null) = null_space.filter(|n| n.ncols() > 0) {
        for (j, hit) in null_direction_rows(d.view(), null.view()).into_iter().enumerate() {
            if hit {
                se_g[j] = f64::NAN;
                bias_g[j] = f64::NAN;
                cov_g.row_mut(j).fill(f64::NAN);
                cov_g.column_mut(j).fill(f64::NAN);
            }
        }
        for (i, hit) in null_direction_rows(d_cdf.view(), null.view()).into_iter().enumerate() {
            if hit {
                se_cdf[i] = f64::NAN;
            }
        }
    }

    Ok(FitResult {
        family: model.family,
        theta: model.grid.values().to_owned(),
        alpha,
        g: state.g,
        se_g,
        bias_g,
        cdf,
        se_cdf,
        cov_alpha,
        cov_g,
        s_statistic,
        loglik,
        penalized_loglik,
        converged: outcome.converged,
        status: outcome.status.clone(),
        iterations: outcome.iterations,
        curvature,
        covariance_kind: kind,
        zero_truncated: model.options.ignore_zero && model.family == Family::Poisson,
        kernel: data.kernel.clone(),
        counts: counts.to_owned(),
    })
}

/// `½ tr(∇²_η g_j · V)` for every `j`:
/// `½ g_j [V_jj − 2(Vg)_j − Σₖ gₖ V_kk + 2 gᵀVg]`.
pub fn softmax_second_order(g: ArrayView1<f64>, v: ArrayView2<f64>) -> Array1<f64> {
    let vg = v.dot(&g);
    let gvg = g.dot(&vg);
    let weighted_diag: f64 = g.iter().zip(v.diag().iter()).map(|(gk, vkk)| gk * vkk).sum();
    Array1::from_shape_fn(g.len(), |j| {
        0.5 * g[j] * (v[[j, j]] - 2.0 * vg[j] - weighted_diag + 2.0 * gvg)
    })
}

fn s_statistic(pen_hess: &Array2<f64>, info: &Array2<f64>) -> f64 {
    let info_trace = info.diag().sum();
    if info_trace > 0.0 { pen_hess.diag().sum() / info_trace } else { f64::NAN }
}

fn cumulative(x: ArrayView1<f64>) -> Array1<f64> {
    let mut out = x.to_owned();
    out.accumulate_axis_inplace(Axis(0), |&prev, cur| *cur += prev);
    out
}

fn cumulative_rows(d: ArrayView2<f64>) -> Array2<f64> {
    let mut out = d.to_owned();
    out.accumulate_axis_inplace(Axis(0), |&prev, cur| *cur += prev);
    out
}

/// Rows of `d` with a non-negligible component along any column of `null`.
fn null_direction_rows(d: ArrayView2<f64>, null: ArrayView2<f64>) -> Vec<bool> {
    let scale = d.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    let tol = NULL_DIRECTION_TOL * scale;
    d.dot(&null).rows().into_iter().map(|row| row.iter().any(|v| v.abs() > tol)).collect()
}
