//! loglik_optimizer — Argmin-backed maximizer for (penalized) log-likelihoods.
//!
//! Purpose
//! -------
//! Give model code a single entry point, [`maximize`], that turns a
//! [`LogLikelihood`] implementation into a fitted coefficient vector using
//! either a ridge-stabilized Newton method or L-BFGS.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] exposes `c(θ) = -ℓ(θ)` with its gradient
//!   and Hessian to Argmin, falling back to [`finite_diff`] whenever the
//!   model leaves a derivative unimplemented.
//! - [`newton::RidgeNewton`] is a custom Argmin solver for problems with a
//!   cheap exact Hessian; L-BFGS with More–Thuente or Hager–Zhang line
//!   search covers first-order use.
//! - [`run::run_solver`] executes any of these and normalizes the result
//!   into an [`OptimOutcome`].
//!
//! Invariants & assumptions
//! ------------------------
//! - User derivatives are derivatives of `ℓ`, never of the cost.
//! - Configuration types are validated on construction.
//! - Nothing here panics on bad numeric input; failures are [`OptError`]s.
//!
//! Downstream usage
//! ----------------
//! - The deconvolution model implements [`LogLikelihood`] with analytic
//!   gradient and Hessian and calls [`maximize`] with [`MLEOptions`] taken
//!   from its fit options.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests; `api` runs all three solver paths
//!   end to end on a quadratic.
//!
//! [`OptError`]: crate::optimization::errors::OptError

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod newton;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, SolverKind, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{
        LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, SolverKind, Tolerances,
    };
    pub use super::types::{Cost, Grad, Theta};
}
