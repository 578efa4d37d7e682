//! Adapter that exposes a [`LogLikelihood`] as an Argmin problem.
//!
//! The solvers minimize, so the adapter serves `c(θ) = -ℓ(θ)`, `-∇ℓ(θ)`
//! and `-∇²ℓ(θ)`. Missing analytic derivatives are replaced by finite
//! differences of the cost (gradient) or of the cost gradient (Hessian);
//! those are already in cost space and need no sign flip.
//!
//! Trial points outside the model's domain (see
//! [`OptError::is_out_of_domain`]) are rejected rather than fatal: their
//! cost is `+∞` and their gradient is zero, so a line search backs off
//! from them. Errors at the starting point are caught earlier by
//! `maximize`.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::{compute_hessian, fd_gradient},
        traits::LogLikelihood,
        types::{Cost, Grad, Hessian, Theta},
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::{CostFunction, Error, Gradient, Hessian as ArgminHessian};
use ndarray::Array1;

/// Bridges `(model, data)` to Argmin's `CostFunction`, `Gradient` and
/// `Hessian` traits.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// `c(θ) = -ℓ(θ)`; out-of-domain points (including `ℓ = -∞`) cost `+∞`.
    /// `ℓ = NaN` or `+∞` is reported as `NonFiniteCost`.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        match self.f.value(theta, self.data) {
            Ok(v) if v.is_finite() => Ok(-v),
            Ok(v) if v == f64::NEG_INFINITY => Ok(f64::INFINITY),
            Ok(v) => Err((OptError::NonFiniteCost { value: v }).into()),
            Err(e) if e.is_out_of_domain() => Ok(f64::INFINITY),
            Err(e) => Err(e.into()),
        }
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// `∇c(θ)`: the negated analytic gradient when available, otherwise a
    /// finite-difference gradient of [`CostFunction::cost`].
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                Ok(fd_gradient(theta, |x: &Theta| self.cost(x))?)
            }
            Err(e) if e.is_out_of_domain() => Ok(Array1::zeros(theta.len())),
            Err(e) => Err(e.into()),
        }
    }
}

impl<'a, F: LogLikelihood> ArgminHessian for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Hessian = Hessian;

    /// `∇²c(θ)`: the negated analytic Hessian when available, otherwise a
    /// finite-difference Jacobian of [`Gradient::gradient`].
    ///
    /// Errors raised while differencing the gradient are captured and the
    /// first one is returned after the sweep.
    fn hessian(&self, theta: &Self::Param) -> Result<Self::Hessian, Error> {
        match self.f.hessian(theta, self.data) {
            Ok(h) => {
                validate_hessian(&h, theta.len())?;
                Ok(-h)
            }
            Err(OptError::HessianNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let grad_map = |x: &Theta| -> Grad {
                    match self.gradient(x) {
                        Ok(g) => g,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            Array1::from_elem(x.len(), f64::NAN)
                        }
                    }
                };
                let hess = compute_hessian(&grad_map, theta);
                if let Some(err) = closure_err.take() {
                    return Err(err);
                }
                Ok(hess?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Sign conventions for cost, gradient and Hessian.
    // - Finite-difference fallbacks when derivatives are not implemented.
    // - Rejection of out-of-domain trial points.
    // - Propagation of other model errors.
    // -------------------------------------------------------------------------

    /// ℓ(θ) = -(θ₀² + 2θ₁²), optionally with analytic derivatives.
    struct Bowl {
        analytic_grad: bool,
        analytic_hess: bool,
    }

    impl LogLikelihood for Bowl {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            Ok(-(theta[0] * theta[0] + 2.0 * theta[1] * theta[1]))
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
            if self.analytic_grad {
                Ok(array![-2.0 * theta[0], -4.0 * theta[1]])
            } else {
                Err(OptError::GradientNotImplemented)
            }
        }

        fn hessian(&self, _: &Theta, _: &()) -> OptResult<Hessian> {
            if self.analytic_hess {
                Ok(Array2::from_diag(&array![-2.0, -4.0]))
            } else {
                Err(OptError::HessianNotImplemented)
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Analytic derivatives are negated into cost space.
    //
    // Given
    // -----
    // - A fully analytic `Bowl` at θ = (1, -1).
    //
    // Expect
    // ------
    // - cost = 3, gradient = (2, -4), Hessian = diag(2, 4).
    fn analytic_derivatives_are_negated() {
        // Arrange
        let model = Bowl { analytic_grad: true, analytic_hess: true };
        let adapter = ArgMinAdapter::new(&model, &());
        let theta = array![1.0, -1.0];

        // Act
        let c = adapter.cost(&theta).expect("cost");
        let g = adapter.gradient(&theta).expect("gradient");
        let h = adapter.hessian(&theta).expect("hessian");

        // Assert
        assert_abs_diff_eq!(c, 3.0);
        assert_abs_diff_eq!(g[0], 2.0);
        assert_abs_diff_eq!(g[1], -4.0);
        assert_abs_diff_eq!(h[[0, 0]], 2.0);
        assert_abs_diff_eq!(h[[1, 1]], 4.0);
    }

    #[test]
    // Purpose
    // -------
    // Finite-difference fallbacks agree with the analytic derivatives.
    //
    // Given
    // -----
    // - A `Bowl` without analytic gradient (for the FD gradient) and one
    //   with an analytic gradient but no Hessian (for the FD Hessian), at
    //   θ = (0.5, 0.25).
    //
    // Expect
    // ------
    // - Gradient ≈ (1, 1) and Hessian ≈ diag(2, 4).
    fn finite_difference_fallbacks_match_analytic() {
        // Arrange
        let fd_grad_model = Bowl { analytic_grad: false, analytic_hess: false };
        let fd_hess_model = Bowl { analytic_grad: true, analytic_hess: false };
        let theta = array![0.5, 0.25];

        // Act
        let g = ArgMinAdapter::new(&fd_grad_model, &()).gradient(&theta).expect("fd gradient");
        let h = ArgMinAdapter::new(&fd_hess_model, &()).hessian(&theta).expect("fd hessian");

        // Assert
        assert_abs_diff_eq!(g[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(g[1], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(h[[0, 0]], 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(h[[1, 1]], 4.0, epsilon = 1e-3);
        assert_abs_diff_eq!(h[[0, 1]], 0.0, epsilon = 1e-3);
    }

    /// Fails with a fixed error everywhere.
    struct Failing(OptError);

    impl LogLikelihood for Failing {
        type Data = ();

        fn value(&self, _: &Theta, _: &()) -> OptResult<f64> {
            Err(self.0.clone())
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, _: &Theta, _: &()) -> OptResult<Grad> {
            Err(self.0.clone())
        }
    }

    #[test]
    // Purpose
    // -------
    // Trial points outside the model's domain become rejected steps.
    //
    // Given
    // -----
    // - Models failing with `InvalidMarginal` and with `InvalidThetaInput`.
    //
    // Expect
    // ------
    // - `cost` is `+∞` and `gradient` is the zero vector for both.
    fn out_of_domain_points_are_rejected_steps() {
        // Arrange
        let models = [
            Failing(OptError::InvalidMarginal { row: 2, value: 0.0 }),
            Failing(OptError::InvalidThetaInput { index: 0, value: f64::INFINITY }),
        ];
        let theta = array![0.0, 1.0];

        for model in &models {
            // Act
            let adapter = ArgMinAdapter::new(model, &());
            let c = adapter.cost(&theta).expect("rejected cost");
            let g = adapter.gradient(&theta).expect("rejected gradient");

            // Assert
            assert_eq!(c, f64::INFINITY);
            assert_eq!(g, Array1::<f64>::zeros(2));
        }
    }

    #[test]
    // Purpose
    // -------
    // Other model errors keep their variant when routed through Argmin.
    //
    // Given
    // -----
    // - A model whose `value` and `grad` fail with `ModelFailure`.
    //
    // Expect
    // ------
    // - Both `cost` and `gradient` return that error.
    fn model_errors_survive_the_adapter() {
        // Arrange
        let failure = OptError::ModelFailure { text: "broken kernel".to_string() };
        let model = Failing(failure.clone());
        let adapter = ArgMinAdapter::new(&model, &());
        let theta = array![0.0];

        // Act
        let cost_err = OptError::from(adapter.cost(&theta).expect_err("cost must fail"));
        let grad_err = OptError::from(adapter.gradient(&theta).expect_err("gradient must fail"));

        // Assert
        assert_eq!(cost_err, failure);
        assert_eq!(grad_err, failure);
    }
}
