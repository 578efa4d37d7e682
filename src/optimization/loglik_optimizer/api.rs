//! High-level entry point for maximizing a [`LogLikelihood`].
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente, build_optimizer_newton},
        run::run_solver,
        traits::{LineSearcher, LogLikelihood, MLEOptions, SolverKind},
    },
};

/// Maximize `ℓ(θ)` starting from `theta0`.
///
/// # Behavior
/// - Validates the start with `f.check(theta0, data)` and requires a
///   finite `ℓ(theta0)`. Later trial points outside the model's domain are
///   rejected steps (see [`ArgMinAdapter`]); the start point must be inside.
/// - Wraps `(f, data)` in an [`ArgMinAdapter`] (cost `-ℓ`).
/// - Dispatches on `opts.solver`: ridge-Newton, or L-BFGS with the chosen
///   line search.
///
/// # Errors
/// - Anything `f.check` or `f.value` rejects at `theta0`.
/// - `NonFiniteCost` when `ℓ(theta0)` is not finite.
/// - Solver construction or runtime errors, as [`OptError`](crate::optimization::errors::OptError).
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use rust_deconv::optimization::{
///     errors::OptResult,
///     loglik_optimizer::{maximize, LogLikelihood, MLEOptions, Theta},
/// };
///
/// struct Quadratic;
/// impl LogLikelihood for Quadratic {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Quadratic, array![0.1, -0.2], &(), &MLEOptions::default())?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), rust_deconv::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let start = f.value(&theta0, data)?;
    if !start.is_finite() {
        return Err(OptError::NonFiniteCost { value: start });
    }
    let problem = ArgMinAdapter::new(f, data);
    match opts.solver {
        SolverKind::Newton => {
            let solver = build_optimizer_newton(opts)?;
            run_solver(theta0, opts, problem, solver)
        }
        SolverKind::Lbfgs { line_searcher: LineSearcher::MoreThuente } => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_solver(theta0, opts, problem, solver)
        }
        SolverKind::Lbfgs { line_searcher: LineSearcher::HagerZhang } => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_solver(theta0, opts, problem, solver)
        }
    }
}
