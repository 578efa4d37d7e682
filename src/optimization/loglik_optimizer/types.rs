//! loglik_optimizer::types — numeric aliases shared by every solver path.
//!
//! Purpose
//! -------
//! Keep the `ndarray` and Argmin generics in one place so the solver,
//! adapter and model layers agree on the shapes of coefficients,
//! gradients, Hessians and costs.
//!
//! Conventions
//! -----------
//! - `Theta`, `Grad` are column vectors over the free coefficients.
//! - `Hessian` is a dense `p × p` matrix for `p = theta.len()`.
//! - `Cost` is the minimized quantity `c(θ) = -ℓ(θ)`.
//! - `SolverState` is the Argmin iteration state used by both the
//!   L-BFGS and the ridge-Newton solver; neither tracks Jacobians or
//!   stored inverse Hessians, hence the unit slots.
use argmin::{
    core::IterState,
    solver::{
        linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
        quasinewton::LBFGS,
    },
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Coefficient vector `α` handed to the optimizer.
pub type Theta = Array1<f64>;

/// Gradient vector, same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Dense second-derivative matrix.
pub type Hessian = Array2<f64>;

/// Scalar objective value (`-ℓ` inside the solvers).
pub type Cost = f64;

/// Function-evaluation counters reported by Argmin (e.g. `"cost_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Iteration state shared by all solver paths.
pub type SolverState = IterState<Theta, Grad, (), (), (), Cost>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Hager–Zhang line search over the crate numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search over the crate numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// L-BFGS solver wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS solver wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
