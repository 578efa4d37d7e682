//! numerical_stability — stable transforms between coefficient space and
//! the probability simplex.
//!
//! Purpose
//! -------
//! Centralize the primitives that keep the prior parametrization finite:
//! overflow-safe softmax and log-sum-exp, the softmax Jacobian used by the
//! score and delta-method computations, and shared tolerances.
//!
//! Key behaviors
//! -------------
//! - `safe_softmax` / `log_sum_exp` shift by `max η` before exponentiating.
//! - `softmax_jacobian` returns `diag(g) - g gᵀ`.
//! - `delta_method` maps a coefficient covariance to a derived-quantity
//!   covariance.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite; the model layer validates coefficients before they
//!   reach these helpers.
//!
//! Downstream usage
//! ----------------
//! - The mixture workspace maps `η = Qα` to `g` with `safe_softmax`.
//! - Inference code uses `EIGEN_EPS` for pseudo-inverse cutoffs and
//!   `delta_method` for `Cov(g)` and `Cov(G)`.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    EIGEN_EPS, GENERAL_TOL, delta_method, log_sum_exp, safe_softmax, softmax_jacobian,
};

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, GENERAL_TOL, delta_method, log_sum_exp, safe_softmax, softmax_jacobian,
    };
}
