//! Execution helper: run an Argmin solver over an [`ArgMinAdapter`] and
//! return an [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
        types::SolverState,
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::CostFunction;
use argmin::core::{Executor, Gradient, Solver, State, TerminationStatus};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run `solver` from `theta0` on `problem`.
///
/// Parameters
/// ----------
/// - `theta0`: initial coefficients, consumed into the executor state.
/// - `opts`: `max_iter` is applied here; `verbose` attaches the slog
///   observer when the `obs_slog` feature is enabled.
/// - `problem`: the adapted model.
/// - `solver`: any solver over [`SolverState`] (L-BFGS or ridge-Newton).
///
/// Returns
/// -------
/// The best parameter and `ℓ(θ̂) = -c_best`, the termination reason, the
/// iteration and evaluation counts and the gradient norm at the best
/// parameter (which need not be the last iterate). A run that
/// stops without meeting a tolerance is logged at `warn` level but still
/// returned, with `converged = false`.
///
/// Errors
/// ------
/// - Argmin runtime errors, converted through `From<argmin::core::Error>`.
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_solver<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, SolverState> + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let (f, data) = (problem.f, problem.data);
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let best = result.take_best_param();
    let grad = best.as_ref().and_then(|theta| ArgMinAdapter::new(f, data).gradient(theta).ok());
    let outcome = OptimOutcome::new(
        best,
        -result.get_best_cost(),
        termination.clone(),
        iterations,
        function_counts,
        grad,
    )?;
    if !outcome.converged {
        if let TerminationStatus::Terminated(reason) = termination {
            log::warn!(
                "{}: stopped after {} iterations without meeting a tolerance ({reason})",
                S::NAME,
                outcome.iterations
            );
        }
    }
    Ok(outcome)
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let ll0 = -problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    log::info!(
        "init: ell(theta0) = {:.6}{}",
        ll0,
        g0n.map(|n| format!(", ||grad|| = {n:.6}")).unwrap_or_default()
    );
    Ok(())
}
