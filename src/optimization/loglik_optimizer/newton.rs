//! loglik_optimizer::newton — ridge-stabilized Newton solver for Argmin.
//!
//! Purpose
//! -------
//! Smooth, low-dimensional penalized likelihoods converge in a handful of
//! Newton steps when the exact Hessian is available. [`RidgeNewton`] is an
//! Argmin [`Solver`] that takes those steps while staying safe away from
//! the optimum.
//!
//! Key behaviors
//! -------------
//! - Direction: solve `(H + λI) d = -g` by Cholesky, starting with `λ = 0`
//!   and growing `λ` geometrically until the factorization succeeds. If it
//!   never does, or `d` is not a descent direction, fall back to `d = -g`.
//! - Step: Armijo backtracking from `t = 1`. Candidate points with an
//!   infinite cost (out of the model's domain) or whose cost errors out
//!   count as rejected steps.
//! - A line search that shrinks below its budget terminates the run with
//!   `SolverExit("line search stalled")`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The problem exposes cost, gradient and Hessian in *cost* space
//!   (see [`ArgMinAdapter`](super::adapter::ArgMinAdapter)).
//! - The iteration state always carries the cost and gradient at the
//!   current parameter; `init` seeds them.
//!
//! Testing notes
//! -------------
//! - Unit tests check the direction logic on definite and indefinite
//!   matrices; end-to-end convergence is covered in `api`.
use crate::optimization::loglik_optimizer::types::{Cost, Grad, Hessian, SolverState, Theta};
use argmin::core::{
    ArgminError, CostFunction, Error, Gradient, Hessian as ArgminHessian, KV, Problem, Solver,
    State, TerminationReason, TerminationStatus,
};
use argmin_math::ArgminL2Norm;
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;

/// Ridge-stabilized Newton method with Armijo backtracking.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeNewton {
    tol_grad: Option<f64>,
    tol_cost: Option<f64>,
    armijo_c1: f64,
    backtrack: f64,
    max_backtracks: usize,
    ridge_init: f64,
    ridge_growth: f64,
    max_ridge_tries: usize,
}

impl Default for RidgeNewton {
    fn default() -> Self {
        Self {
            tol_grad: None,
            tol_cost: None,
            armijo_c1: 1e-4,
            backtrack: 0.5,
            max_backtracks: 50,
            ridge_init: 1e-8,
            ridge_growth: 10.0,
            max_ridge_tries: 16,
        }
    }
}

impl RidgeNewton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop once `‖∇c‖₂ < tol`.
    pub fn with_tolerance_grad(mut self, tol: f64) -> Result<Self, Error> {
        if !(tol.is_finite() && tol > 0.0) {
            return Err(ArgminError::InvalidParameter {
                text: "RidgeNewton: gradient tolerance must be finite and positive.".to_string(),
            }
            .into());
        }
        self.tol_grad = Some(tol);
        Ok(self)
    }

    /// Stop once `|c_k - c_{k-1}| < tol`.
    pub fn with_tolerance_cost(mut self, tol: f64) -> Result<Self, Error> {
        if !(tol.is_finite() && tol > 0.0) {
            return Err(ArgminError::InvalidParameter {
                text: "RidgeNewton: cost tolerance must be finite and positive.".to_string(),
            }
            .into());
        }
        self.tol_cost = Some(tol);
        Ok(self)
    }

    /// Newton direction for cost Hessian `hess` and cost gradient `grad`.
    ///
    /// Returns `-g` whenever no ridge level yields a Cholesky factor or
    /// the regularized solution fails the descent test `gᵀd < 0`.
    pub fn direction(&self, hess: &Hessian, grad: &Grad) -> Grad {
        let p = grad.len();
        let steepest = grad.mapv(|v| -v);
        if p == 0 {
            return steepest;
        }
        let h = DMatrix::from_fn(p, p, |i, j| hess[[i, j]]);
        let rhs = DVector::from_iterator(p, steepest.iter().copied());
        let scale = (h.diagonal().iter().map(|v| v.abs()).sum::<f64>() / p as f64).max(1.0);

        let mut ridge = 0.0;
        for attempt in 0..=self.max_ridge_tries {
            let mut shifted = h.clone();
            for i in 0..p {
                shifted[(i, i)] += ridge;
            }
            if let Some(chol) = shifted.cholesky() {
                let d = chol.solve(&rhs);
                let candidate = Array1::from_iter(d.iter().copied());
                let slope = grad.dot(&candidate);
                if candidate.iter().all(|v| v.is_finite()) && slope < 0.0 {
                    if attempt > 0 {
                        log::debug!("RidgeNewton: Hessian regularized with ridge {ridge:.3e}");
                    }
                    return candidate;
                }
            }
            ridge = if attempt == 0 { self.ridge_init * scale } else { ridge * self.ridge_growth };
        }
        log::debug!("RidgeNewton: falling back to steepest descent");
        steepest
    }
}

impl<O> Solver<O, SolverState> for RidgeNewton
where
    O: CostFunction<Param = Theta, Output = Cost>
        + Gradient<Param = Theta, Gradient = Grad>
        + ArgminHessian<Param = Theta, Hessian = Hessian>,
{
    const NAME: &'static str = "Ridge-stabilized Newton";

    fn init(
        &mut self, problem: &mut Problem<O>, state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let param = state.get_param().cloned().ok_or_else(|| ArgminError::NotInitialized {
            text: "RidgeNewton requires an initial parameter vector.".to_string(),
        })?;
        let cost = problem.cost(&param)?;
        let grad = problem.gradient(&param)?;
        Ok((state.param(param).cost(cost).gradient(grad), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<O>, mut state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let param = state.take_param().ok_or_else(|| ArgminError::NotInitialized {
            text: "RidgeNewton: parameter missing from state.".to_string(),
        })?;
        let cost = state.get_cost();
        let grad = match state.take_gradient() {
            Some(g) => g,
            None => problem.gradient(&param)?,
        };
        let hess = problem.hessian(&param)?;
        let direction = self.direction(&hess, &grad);
        let slope = grad.dot(&direction);

        let mut step = 1.0;
        for _ in 0..self.max_backtracks {
            let candidate = &param + &(&direction * step);
            match problem.cost(&candidate) {
                Ok(c) if c.is_finite() && c <= cost + self.armijo_c1 * step * slope => {
                    let new_grad = problem.gradient(&candidate)?;
                    return Ok((state.param(candidate).cost(c).gradient(new_grad), None));
                }
                _ => step *= self.backtrack,
            }
        }
        let stalled = state
            .param(param)
            .gradient(grad)
            .terminate_with(TerminationReason::SolverExit("line search stalled".to_string()));
        Ok((stalled, None))
    }

    fn terminate(&mut self, state: &SolverState) -> TerminationStatus {
        if let (Some(tol), Some(grad)) = (self.tol_grad, state.get_gradient()) {
            if grad.l2_norm() < tol {
                return TerminationStatus::Terminated(TerminationReason::SolverConverged);
            }
        }
        if let Some(tol) = self.tol_cost {
            if (state.get_prev_cost() - state.get_cost()).abs() < tol {
                return TerminationStatus::Terminated(TerminationReason::SolverConverged);
            }
        }
        TerminationStatus::NotTerminated
    }
}
