//! optimization — MLE stack, numerical helpers, and unified error surface.
//!
//! Purpose
//! -------
//! Fit coefficient vectors by maximizing a (penalized) log-likelihood
//! without exposing Argmin details to the model layer.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer`: the [`LogLikelihood`](loglik_optimizer::LogLikelihood)
//!   trait, solver configuration, ridge-Newton and L-BFGS solvers, and the
//!   [`maximize`](loglik_optimizer::maximize) entry point.
//! - `numerical_stability`: softmax, log-sum-exp, softmax Jacobian, delta
//!   method, and shared tolerances.
//! - `errors`: [`OptError`](errors::OptError) / [`OptResult`](errors::OptResult),
//!   including conversions from Argmin and model errors.
//!
//! Conventions
//! -----------
//! - Solvers minimize `c(θ) = -ℓ(θ)`; every user-facing value is `ℓ`.
//! - No logging above `debug`/`warn` and no I/O happen here.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
//     use rust_deconv::optimization::prelude::*;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
