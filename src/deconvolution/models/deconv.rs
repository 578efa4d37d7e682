//! g-modeling deconvolution model: penalized log-likelihood in `α`.
//!
//! This module wires a support grid, a design matrix and a penalty to the
//! `LogLikelihood` trait. The optimizer sees
//!
//! `ℓ_pen(α) = Σₓ yₓ log fₓ(α) − pen(α)`, with `f(α) = P softmax(Qα)`,
//!
//! together with its analytic gradient `Qᵀw − ∇pen` and Hessian
//! `QᵀHηQ − ∇²pen` from [`MixtureState`].
//!
//! The model holds only read-only artifacts (grid, `Q`, penalty, options),
//! so one instance can serve many samples; per-sample state lives in
//! [`DeconvData`].
use crate::{
    deconvolution::{
        core::{
            basis::DesignMatrix,
            family::Family,
            grid::SupportGrid,
            kernel::KernelMatrix,
            observations::{Histogram, Observations},
            options::DeconvOptions,
            penalty::Penalty,
            workspace::MixtureState,
        },
        errors::DeconvResult,
        stats::{FitResult, compute_statistics},
    },
    optimization::{
        errors::OptResult,
        loglik_optimizer::{
            Grad, LogLikelihood, OptimOutcome, Theta, maximize, types::Hessian,
            validation::validate_theta,
        },
    },
};
use ndarray::Array1;

/// Per-sample data: the aggregated histogram and its kernel matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DeconvData {
    pub histogram: Histogram,
    pub kernel: KernelMatrix,
}

impl DeconvData {
    pub fn counts(&self) -> ndarray::ArrayView1<'_, f64> {
        self.histogram.counts.view()
    }

    pub fn total(&self) -> f64 {
        self.histogram.total()
    }
}

/// Deconvolution model over a fixed grid, family and basis.
///
/// After [`DeconvModel::fit`], `results` holds the optimizer outcome and
/// `fitted` the full statistics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DeconvModel {
    pub grid: SupportGrid,
    pub family: Family,
    pub design: DesignMatrix,
    pub penalty: Penalty,
    pub options: DeconvOptions,
    pub results: Option<OptimOutcome>,
    pub fitted: Option<FitResult>,
}

impl DeconvModel {
    /// Build the read-only parts of a fit.
    ///
    /// # Errors
    /// - `GridOutsideFamily` if the grid leaves the family's parameter domain.
    /// - `InvalidGrid(DegreesOfFreedom)` / `InvalidAtom` from the basis.
    /// - `InvalidRegularization` from the penalty.
    pub fn new(grid: SupportGrid, family: Family, options: DeconvOptions) -> DeconvResult<Self> {
        family.validate_grid(&grid, options.ignore_zero && family == Family::Poisson)?;
        let design = DesignMatrix::build(&grid, &options.basis, options.atom)?;
        let penalty = Penalty::new(
            options.penalty,
            options.regularization,
            design.n_coef(),
            design.atom_column,
        )?;
        Ok(Self { grid, family, design, penalty, options, results: None, fitted: None })
    }

    pub fn n_coef(&self) -> usize {
        self.design.n_coef()
    }

    /// Aggregate `observations` and evaluate the kernel on their sample space.
    ///
    /// # Errors
    /// Anything [`Observations::to_histogram`] or [`KernelMatrix::build`]
    /// reports.
    pub fn prepare(&self, observations: &Observations) -> DeconvResult<DeconvData> {
        let histogram = observations.to_histogram(self.family, &self.options.sample_space())?;
        let kernel =
            KernelMatrix::build(self.family, &self.grid, &histogram.space, self.options.ignore_zero)?;
        Ok(DeconvData { histogram, kernel })
    }

    /// Fit one sample without touching `self`; safe to call concurrently.
    ///
    /// Steps
    /// 1. Start from `options.start` (default `α = 0`, uniform `g`).
    /// 2. Maximize the penalized log-likelihood with `options.mle_opts`.
    /// 3. Derive `g`, covariance, SE, bias and `S` at `α̂`.
    ///
    /// Non-convergence is not an error: the best iterate is kept and
    /// `FitResult::converged` is `false`.
    pub fn fit_data(&self, data: &DeconvData) -> DeconvResult<(OptimOutcome, FitResult)> {
        let alpha0 = match &self.options.start {
            Some(start) => start.clone(),
            None => Array1::zeros(self.n_coef()),
        };
        let outcome = maximize(self, alpha0, data, &self.options.mle_opts)?;
        let fit = compute_statistics(self, data, &outcome)?;
        Ok((outcome, fit))
    }

    /// Aggregate, fit and cache the results on the model.
    pub fn fit(&mut self, observations: &Observations) -> DeconvResult<&FitResult> {
        let data = self.prepare(observations)?;
        let (outcome, fit) = self.fit_data(&data)?;
        self.results = Some(outcome);
        Ok(self.fitted.insert(fit))
    }

    /// Mixture quantities at `alpha`.
    pub fn state(&self, alpha: &Theta, data: &DeconvData) -> DeconvResult<MixtureState> {
        MixtureState::evaluate(&self.design, &data.kernel, data.counts(), alpha.view())
    }
}

impl LogLikelihood for DeconvModel {
    type Data = DeconvData;

    /// `Σₓ yₓ log fₓ(α) − pen(α)`.
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<f64> {
        let state = self.state(theta, data)?;
        Ok(state.loglik(data.counts()) - self.penalty.value(theta.view()))
    }

    fn check(&self, theta: &Theta, _data: &Self::Data) -> OptResult<()> {
        validate_theta(theta, self.n_coef())
    }

    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
        let state = self.state(theta, data)?;
        let grad = state.gradient(&self.design, &data.kernel, data.counts());
        Ok(grad - self.penalty.gradient(theta.view()))
    }

    fn hessian(&self, theta: &Theta, data: &Self::Data) -> OptResult<Hessian> {
        let state = self.state(theta, data)?;
        let hess = state.hessian(&self.design, &data.kernel, data.counts());
        Ok(hess - self.penalty.hessian(theta.view()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deconvolution::{
            core::{basis::BasisOptions, observations::SampleSpace},
            errors::DeconvError,
        },
        optimization::loglik_optimizer::finite_diff::fd_gradient,
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction checks (family domain, basis size).
    // - Consistency of value/grad/hessian with the penalty included.
    // - `fit` caching and convergence on a small Poisson histogram.
    //
    // End-to-end statistical behavior lives in the integration tests.
    // -------------------------------------------------------------------------

    fn poisson_model(options: DeconvOptions) -> DeconvModel {
        let grid = SupportGrid::new(Array1::linspace(0.5, 10.0, 20)).expect("grid");
        DeconvModel::new(grid, Family::Poisson, options).expect("model")
    }

    fn poisson_histogram() -> Observations {
        Observations::Histogram(
            Histogram::new(
                SampleSpace::Counts { lower: 0, upper: 10 },
                array![12.0, 25.0, 30.0, 24.0, 18.0, 14.0, 10.0, 8.0, 5.0, 3.0, 1.0],
            )
            .expect("histogram"),
        )
    }

    #[test]
    // Purpose
    // -------
    // Grids outside the family's domain and oversized bases are rejected.
    //
    // Given
    // -----
    // - A Binomial model on a grid reaching 1.5; a 4-point grid with df = 5.
    //
    // Expect
    // ------
    // - `GridOutsideFamily`, then `InvalidGrid`.
    fn new_validates_grid_and_basis() {
        // Arrange
        let wide = SupportGrid::new(array![0.1, 0.5, 1.0, 1.5]).expect("grid");
        let small = SupportGrid::new(array![0.1, 0.2, 0.3, 0.4]).expect("grid");

        // Act / Assert
        assert!(matches!(
            DeconvModel::new(wide, Family::Binomial, DeconvOptions::default()),
            Err(DeconvError::GridOutsideFamily { index: 3, .. })
        ));
        assert!(matches!(
            DeconvModel::new(small, Family::Binomial, DeconvOptions::default()),
            Err(DeconvError::InvalidGrid(_))
        ));
    }

    #[test]
    // Purpose
    // -------
    // The penalized gradient is the derivative of the penalized value.
    //
    // Given
    // -----
    // - Poisson model with ridge penalty c0 = 2 at a non-zero α.
    //
    // Expect
    // ------
    // - Analytic gradient ≈ finite differences of `value`.
    fn penalized_gradient_matches_value() {
        // Arrange
        let options = DeconvOptions {
            penalty: crate::deconvolution::core::penalty::PenaltyKind::Ridge,
            regularization: 2.0,
            ..DeconvOptions::default()
        };
        let model = poisson_model(options);
        let data = model.prepare(&poisson_histogram()).expect("data");
        let alpha = array![0.2, -0.4, 0.1, 0.3, -0.2];

        // Act
        let grad = model.grad(&alpha, &data).expect("grad");
        let fd = fd_gradient(&alpha, |a| Ok(model.value(a, &data)?)).expect("fd");

        // Assert
        for k in 0..alpha.len() {
            assert_relative_eq!(grad[k], fd[k], epsilon = 1e-5, max_relative = 1e-5);
        }
    }

    #[test]
    // Purpose
    // -------
    // A fit converges, caches its results and zeroes the penalized gradient.
    //
    // Given
    // -----
    // - The Poisson histogram with default options.
    //
    // Expect
    // ------
    // - `results` and `fitted` set; converged; ‖∇ℓ_pen(α̂)‖ small.
    fn fit_caches_results_at_stationary_point() {
        // Arrange
        let mut model = poisson_model(DeconvOptions::default());
        let obs = poisson_histogram();

        // Act
        let converged = model.fit(&obs).expect("fit").converged;

        // Assert
        assert!(converged);
        let outcome = model.results.as_ref().expect("results");
        let data = model.prepare(&obs).expect("data");
        let grad = model.grad(&outcome.theta_hat, &data).expect("grad");
        assert!(grad.dot(&grad).sqrt() < 1e-3);
        assert!(model.fitted.is_some());
    }

    #[test]
    // Purpose
    // -------
    // A start vector of the wrong length is rejected before optimizing.
    //
    // Given
    // -----
    // - `start = Some([0, 0])` with a five-column basis.
    //
    // Expect
    // ------
    // - `CoefficientLengthMismatch { expected: 5, actual: 2 }`.
    fn wrong_start_length_is_rejected() {
        // Arrange
        let options = DeconvOptions {
            start: Some(array![0.0, 0.0]),
            basis: BasisOptions::default(),
            ..DeconvOptions::default()
        };
        let mut model = poisson_model(options);

        // Act
        let err = model.fit(&poisson_histogram()).expect_err("length mismatch");

        // Assert
        assert_eq!(err, DeconvError::CoefficientLengthMismatch { expected: 5, actual: 2 });
    }
}
