//! loglik_optimizer::finite_diff — finite-difference derivative fallbacks.
//!
//! Purpose
//! -------
//! Supply gradients and Hessians for models that only implement part of
//! [`LogLikelihood`](super::LogLikelihood), without the rest of the
//! optimizer touching the `finitediff` API directly.
//!
//! Key behaviors
//! -------------
//! - [`fd_gradient`]: central differences of a fallible scalar function,
//!   retried with forward differences if any evaluation failed or the
//!   result is non-finite.
//! - [`compute_hessian`]: central-difference Jacobian of a gradient map,
//!   falling back to forward differences, then symmetrized.
//!
//! Invariants & assumptions
//! ------------------------
//! - Finite-difference closures must return plain `f64`; failures inside
//!   them are parked in a `RefCell<Option<Error>>` and the closure returns
//!   `NaN`. The first parked error wins.
//! - Every returned gradient/Hessian passes [`validate_grad`] /
//!   [`validate_hessian`].
//!
//! Testing notes
//! -------------
//! - Unit tests below use quadratics with known derivatives and closures
//!   that fail on purpose to exercise the fallback chain.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Finite-difference gradient of a fallible scalar map.
///
/// Parameters
/// ----------
/// - `theta`: evaluation point.
/// - `func`: `θ ↦ Result<f64, Error>`, typically the adapter's cost.
///
/// Errors
/// ------
/// - The first error raised by `func` on the forward-difference retry.
/// - `InvalidGradient` if the forward-difference result is still non-finite.
pub fn fd_gradient<G>(theta: &Theta, func: G) -> OptResult<Grad>
where
    G: Fn(&Theta) -> Result<f64, Error>,
{
    let closure_err: RefCell<Option<Error>> = RefCell::new(None);
    let scalar = |x: &Theta| -> f64 {
        match func(x) {
            Ok(v) => v,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };
    let central = theta.central_diff(&scalar);
    if closure_err.borrow().is_none() && validate_grad(&central, theta.len()).is_ok() {
        return Ok(central);
    }
    run_fd_diff(theta, &scalar, &closure_err)
}

/// Forward-difference gradient with error capture.
///
/// Clears `closure_err`, differentiates `func`, and surfaces any error the
/// closure parked during the sweep.
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// Finite-difference Hessian from a gradient map.
///
/// Central differences first, forward differences if the central result
/// fails validation. The result is symmetrized in place before returning.
///
/// Errors
/// ------
/// - `HessianDimMismatch` / `InvalidHessian` if the forward fallback also
///   fails validation.
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut hess = theta.central_hessian(f);
    if validate_hessian(&hess, dim).is_err() {
        hess = theta.forward_hessian(f);
        validate_hessian(&hess, dim)?;
    }
    symmetrize_hess(&mut hess);
    Ok(hess)
}

// ---- Helper methods ----

fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, array};
    use std::cell::Cell;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Central → forward fallback in `fd_gradient`.
    // - Error propagation out of finite-difference closures.
    // - Hessian symmetry and accuracy on quadratics.
    //
    // They intentionally DO NOT cover:
    // - Use inside the Argmin adapter (see `adapter`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `fd_gradient` reproduces the analytic gradient of a smooth quadratic.
    //
    // Given
    // -----
    // - `f(θ) = θ₀² + 3θ₀θ₁` at θ = (1, 2).
    //
    // Expect
    // ------
    // - Gradient ≈ (2θ₀ + 3θ₁, 3θ₀) = (8, 3).
    fn fd_gradient_matches_quadratic() {
        // Arrange
        let theta = array![1.0, 2.0];
        let f = |x: &Theta| -> Result<f64, Error> { Ok(x[0] * x[0] + 3.0 * x[0] * x[1]) };

        // Act
        let grad = fd_gradient(&theta, f).expect("gradient should succeed");

        // Assert
        assert_abs_diff_eq!(grad[0], 8.0, epsilon = 1e-5);
        assert_abs_diff_eq!(grad[1], 3.0, epsilon = 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // An error raised on every evaluation surfaces as an `OptError`.
    //
    // Given
    // -----
    // - A closure that always returns `OptError::NonFiniteCost`.
    //
    // Expect
    // ------
    // - `fd_gradient` returns that same variant.
    fn fd_gradient_propagates_closure_error() {
        // Arrange
        let theta = array![0.0];
        let f = |_: &Theta| -> Result<f64, Error> {
            Err(OptError::NonFiniteCost { value: f64::NAN }.into())
        };

        // Act
        let err = fd_gradient(&theta, f).expect_err("closure error should propagate");

        // Assert
        assert!(matches!(err, OptError::NonFiniteCost { .. }));
    }

    #[test]
    // Purpose
    // -------
    // A failure on the backward step of central differences is recovered
    // by the forward-difference retry.
    //
    // Given
    // -----
    // - `f(θ) = θ²` that errors whenever θ < 0, evaluated at θ = 0.
    //
    // Expect
    // ------
    // - A finite gradient close to 0 and the closure called more than twice.
    fn fd_gradient_falls_back_to_forward_difference() {
        // Arrange
        let theta = array![0.0];
        let calls = Cell::new(0usize);
        let f = |x: &Theta| -> Result<f64, Error> {
            calls.set(calls.get() + 1);
            if x[0] < 0.0 {
                Err(OptError::NonFiniteCost { value: f64::NAN }.into())
            } else {
                Ok(x[0] * x[0])
            }
        };

        // Act
        let grad = fd_gradient(&theta, f).expect("forward retry should succeed");

        // Assert
        assert_abs_diff_eq!(grad[0], 0.0, epsilon = 1e-6);
        assert!(calls.get() > 2);
    }

    #[test]
    // Purpose
    // -------
    // `compute_hessian` recovers a known symmetric matrix from a linear
    // gradient map.
    //
    // Given
    // -----
    // - `g(θ) = A θ` with A = [[2, 1], [1, 4]].
    //
    // Expect
    // ------
    // - Hessian ≈ A and exactly symmetric.
    fn compute_hessian_recovers_linear_gradient_map() {
        // Arrange
        let theta = array![0.3, -0.7];
        let g = |x: &Theta| -> Grad { Array1::from(vec![2.0 * x[0] + x[1], x[0] + 4.0 * x[1]]) };

        // Act
        let hess = compute_hessian(&g, &theta).expect("Hessian should be computed");

        // Assert
        assert_abs_diff_eq!(hess[[0, 0]], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(hess[[1, 1]], 4.0, epsilon = 1e-5);
        assert_abs_diff_eq!(hess[[0, 1]], 1.0, epsilon = 1e-5);
        assert_eq!(hess[[0, 1]], hess[[1, 0]]);
    }

    #[test]
    // Purpose
    // -------
    // Non-finite gradients make both Hessian paths fail validation.
    //
    // Given
    // -----
    // - A gradient map returning NaN everywhere.
    //
    // Expect
    // ------
    // - `InvalidHessian`.
    fn compute_hessian_rejects_non_finite_gradients() {
        // Arrange
        let theta = array![1.0, 1.0];
        let g = |_: &Theta| -> Grad { Array1::from(vec![f64::NAN, f64::NAN]) };

        // Act
        let err = compute_hessian(&g, &theta).expect_err("NaN gradient must fail");

        // Assert
        assert!(matches!(err, OptError::InvalidHessian { .. }));
    }
}
