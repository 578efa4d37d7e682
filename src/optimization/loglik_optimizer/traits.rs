//! Public API surface for penalized log-likelihood maximization.
//!
//! - [`LogLikelihood`]: trait models implement (value, check, optional
//!   analytic gradient and Hessian).
//! - [`MLEOptions`], [`Tolerances`], [`SolverKind`], [`LineSearcher`]:
//!   optimizer configuration.
//! - [`OptimOutcome`]: normalized result returned by [`maximize`](super::maximize).
//!
//! Convention: we *maximize* `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`. Analytic
//! derivatives, when provided, are derivatives of `ℓ`; the adapter flips
//! signs for the solvers.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        types::Hessian,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Model-side interface for maximum likelihood.
///
/// Required:
/// - `value(&Theta, &Data)`: evaluate `ℓ(θ)` (penalized, if the model is).
/// - `check(&Theta, &Data)`: reject invalid `θ`/data pairs before the run.
///
/// Optional:
/// - `grad(&Theta, &Data)`: analytic `∇ℓ(θ)`. Defaults to
///   `GradientNotImplemented`, which triggers finite differences.
/// - `hessian(&Theta, &Data)`: analytic `∇²ℓ(θ)`. Defaults to
///   `HessianNotImplemented`, which triggers finite differences of the
///   gradient.
pub trait LogLikelihood {
    type Data: 'static;

    // Required methods
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }

    fn hessian(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Hessian> {
        Err(OptError::HessianNotImplemented)
    }
}

/// Line search used inside L-BFGS. Parses case-insensitively from
/// `"MoreThuente"` / `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Which Argmin solver drives the fit.
///
/// - `Newton`: ridge-stabilized Newton with Armijo backtracking; uses the
///   model Hessian (analytic or finite-difference).
/// - `Lbfgs`: quasi-Newton with the chosen line search; first-order only.
///
/// Parsing accepts `"newton"`, `"lbfgs"` (More–Thuente), `"lbfgs-morethuente"`
/// and `"lbfgs-hagerzhang"`, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    Newton,
    Lbfgs { line_searcher: LineSearcher },
}

impl Default for SolverKind {
    fn default() -> Self {
        SolverKind::Newton
    }
}

impl FromStr for SolverKind {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "newton" => Ok(SolverKind::Newton),
            "lbfgs" => Ok(SolverKind::Lbfgs { line_searcher: LineSearcher::MoreThuente }),
            other => match other.strip_prefix("lbfgs-") {
                Some(ls) => Ok(SolverKind::Lbfgs { line_searcher: ls.parse()? }),
                None => Err(OptError::InvalidSolver {
                    name: s.to_string(),
                    reason: "Valid options are 'newton', 'lbfgs', 'lbfgs-morethuente' or \
                             'lbfgs-hagerzhang'.",
                }),
            },
        }
    }
}

/// Optimizer configuration.
///
/// `lbfgs_mem` only matters for [`SolverKind::Lbfgs`]; `verbose` attaches
/// the slog observer when the `obs_slog` feature is compiled in.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub solver: SolverKind,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// Build validated options.
    ///
    /// # Errors
    /// - `OptError::InvalidLBFGSMem` if `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, solver: SolverKind, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self { tols, solver, verbose, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            solver: SolverKind::Newton,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Stopping criteria. At least one must be set.
///
/// - `tol_grad`: stop once `‖∇c(θ)‖₂` falls below it.
/// - `tol_cost`: stop once `|c_k - c_{k-1}|` falls below it.
/// - `max_iter`: hard iteration cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// # Errors
    /// - `NoTolerancesProvided` if every field is `None`.
    /// - `InvalidTolGrad` / `InvalidTolCost` for non-finite or non-positive tolerances.
    /// - `InvalidMaxIter` if `max_iter == Some(0)`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-6), tol_cost: Some(1e-10), max_iter: Some(300) }
    }
}

/// Normalized optimizer result.
///
/// `value` is the best `ℓ(θ̂)` (not the cost). `converged` is true only
/// when the solver met a tolerance; hitting `max_iter`, a stalled line
/// search or an interrupt all report `false` with the reason in `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// # Errors
    /// - `MissingThetaHat` / `InvalidThetaHat` if the best parameter is
    ///   absent or non-finite.
    /// - `NonFiniteCost` if `value` is not finite.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            TerminationStatus::Terminated(reason) => (met_tolerance(&reason), reason.to_string()),
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self { theta_hat, value, converged, status, iterations, fn_evals, grad_norm })
    }
}

fn met_tolerance(reason: &TerminationReason) -> bool {
    matches!(reason, TerminationReason::SolverConverged | TerminationReason::TargetCostReached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - String parsing for `LineSearcher` and `SolverKind`.
    // - Validation in `Tolerances::new` and `MLEOptions::new`.
    // - Mapping of Argmin termination reasons onto `OptimOutcome::converged`.
    //
    // They intentionally DO NOT cover:
    // - Solver execution (see `api` and `newton`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Solver names parse case-insensitively, including the line-search suffix.
    //
    // Given
    // -----
    // - "Newton", "LBFGS", "lbfgs-HagerZhang".
    //
    // Expect
    // ------
    // - The matching `SolverKind` variants.
    fn solver_kind_parses_known_names() {
        // Arrange / Act
        let newton: SolverKind = "Newton".parse().expect("newton should parse");
        let lbfgs: SolverKind = "LBFGS".parse().expect("lbfgs should parse");
        let hz: SolverKind = "lbfgs-HagerZhang".parse().expect("lbfgs-hagerzhang should parse");

        // Assert
        assert_eq!(newton, SolverKind::Newton);
        assert_eq!(lbfgs, SolverKind::Lbfgs { line_searcher: LineSearcher::MoreThuente });
        assert_eq!(hz, SolverKind::Lbfgs { line_searcher: LineSearcher::HagerZhang });
    }

    #[test]
    // Purpose
    // -------
    // Unknown solver and line-search names are rejected with the right variant.
    //
    // Given
    // -----
    // - "gradient-descent" and "lbfgs-wolfe".
    //
    // Expect
    // ------
    // - `InvalidSolver` and `InvalidLineSearch` respectively.
    fn solver_kind_rejects_unknown_names() {
        // Act
        let bad_solver = "gradient-descent".parse::<SolverKind>();
        let bad_ls = "lbfgs-wolfe".parse::<SolverKind>();

        // Assert
        assert!(matches!(bad_solver, Err(OptError::InvalidSolver { .. })));
        assert!(matches!(bad_ls, Err(OptError::InvalidLineSearch { .. })));
    }

    #[test]
    // Purpose
    // -------
    // `Tolerances::new` requires at least one criterion and positive values.
    //
    // Given
    // -----
    // - All-`None` input, a negative gradient tolerance, and `max_iter = 0`.
    //
    // Expect
    // ------
    // - `NoTolerancesProvided`, `InvalidTolGrad`, `InvalidMaxIter`.
    fn tolerances_new_validates_inputs() {
        // Act
        let none = Tolerances::new(None, None, None);
        let neg = Tolerances::new(Some(-1.0), None, None);
        let zero_iter = Tolerances::new(None, None, Some(0));

        // Assert
        assert_eq!(none, Err(OptError::NoTolerancesProvided));
        assert!(matches!(neg, Err(OptError::InvalidTolGrad { .. })));
        assert!(matches!(zero_iter, Err(OptError::InvalidMaxIter { .. })));
    }

    #[test]
    // Purpose
    // -------
    // A zero L-BFGS history is rejected.
    //
    // Given
    // -----
    // - Default tolerances, `lbfgs_mem = Some(0)`.
    //
    // Expect
    // ------
    // - `InvalidLBFGSMem`.
    fn mle_options_rejects_zero_memory() {
        // Act
        let opts = MLEOptions::new(Tolerances::default(), SolverKind::Newton, false, Some(0));

        // Assert
        assert!(matches!(opts, Err(OptError::InvalidLBFGSMem { mem: 0, .. })));
    }

    #[test]
    // Purpose
    // -------
    // Only tolerance-based terminations count as converged.
    //
    // Given
    // -----
    // - Outcomes built with `SolverConverged`, `MaxItersReached` and a
    //   `SolverExit` reason.
    //
    // Expect
    // ------
    // - `converged` is true, false, false.
    fn optim_outcome_maps_termination_reasons() {
        // Arrange
        let build = |reason: TerminationReason| {
            OptimOutcome::new(
                Some(array![0.5, -0.5]),
                -1.0,
                TerminationStatus::Terminated(reason),
                4,
                FnEvalMap::new(),
                Some(array![1e-9, 0.0]),
            )
            .expect("outcome should be valid")
        };

        // Act
        let ok = build(TerminationReason::SolverConverged);
        let capped = build(TerminationReason::MaxItersReached);
        let exit = build(TerminationReason::SolverExit("line search stalled".to_string()));

        // Assert
        assert!(ok.converged);
        assert!(!capped.converged);
        assert!(!exit.converged);
        assert_eq!(ok.iterations, 4);
        assert!(ok.grad_norm.expect("gradient norm") < 1e-8);
    }

    #[test]
    // Purpose
    // -------
    // Missing or non-finite estimates are reported rather than wrapped.
    //
    // Given
    // -----
    // - `None` parameters, and a finite parameter with a NaN value.
    //
    // Expect
    // ------
    // - `MissingThetaHat` and `NonFiniteCost`.
    fn optim_outcome_rejects_invalid_inputs() {
        // Act
        let missing = OptimOutcome::new(
            None,
            0.0,
            TerminationStatus::NotTerminated,
            0,
            FnEvalMap::new(),
            None,
        );
        let nan_value = OptimOutcome::new(
            Some(array![0.0]),
            f64::NAN,
            TerminationStatus::NotTerminated,
            0,
            FnEvalMap::new(),
            None,
        );

        // Assert
        assert_eq!(missing, Err(OptError::MissingThetaHat));
        assert!(matches!(nan_value, Err(OptError::NonFiniteCost { .. })));
    }
}
