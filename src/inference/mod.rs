//! inference — covariance and standard errors for fitted coefficients.
//!
//! Purpose
//! -------
//! Convert the curvature of a penalized log-likelihood at its maximizer
//! into a coefficient covariance, optionally in sandwich form, and expose
//! the null space that makes some derived quantities unidentified.
//!
//! Key behaviors
//! -------------
//! - [`pseudo_inverse`]: symmetric eigen pseudo-inverse with a relative
//!   eigenvalue cutoff and an explicit null-space basis.
//! - [`calc_covariance`]: `H⁺` or `H⁺ I H⁺`.
//! - [`standard_errors`]: clamped square roots of a covariance diagonal.
//!
//! Invariants & assumptions
//! ------------------------
//! - Coefficients live in the unconstrained optimizer space; mapping to
//!   prior space is the caller's job (delta method).
//! - Every routine returns [`InferenceResult`]; none panic on numeric input.
//!
//! Downstream usage
//! ----------------
//! - `deconvolution::stats` builds `H` and `I` from the fitted mixture,
//!   calls [`calc_covariance`], and propagates the result to `g` and `G`.

pub mod errors;
pub mod hessian;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::errors::{InferenceError, InferenceResult};
pub use self::hessian::{
    CovarianceEstimate, PseudoInverse, calc_covariance, pseudo_inverse, standard_errors,
};

pub mod prelude {
    pub use super::errors::{InferenceError, InferenceResult};
    pub use super::hessian::{calc_covariance, pseudo_inverse, standard_errors};
}
