//! rust_deconv — empirical-Bayes deconvolution (g-modeling) with Python
//! bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the deconvolution engine to Python via the `_rust_deconv`
//! extension module when the `python-bindings` feature is enabled.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules:
//!   - `deconvolution`: grids, bases, families, kernels, the penalized
//!     model, statistics, posteriors and batch fits;
//!   - `inference`: curvature pseudo-inverses and covariance estimates;
//!   - `optimization`: the `LogLikelihood` trait and Argmin-backed solvers.
//! - Define `#[pyclass]` wrappers (`Deconv`, `DeconvFit`) and the
//!   `#[pymodule]` initializer.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work happens in the inner modules; this file performs
//!   FFI glue, input conversion, and error mapping only.
//! - Errors cross the boundary as `ValueError` through
//!   `From<DeconvError> for PyErr`.
//!
//! Downstream usage
//! ----------------
//! - Rust code should use `deconvolution::prelude` and ignore the
//!   feature-gated PyO3 items.
//! - The Python packaging layer imports `_rust_deconv.deconvolution`.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and
//!   by the pipeline tests under `tests/`.

pub mod deconvolution;
pub mod inference;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    deconvolution::{
        core::{family::Family, grid::SupportGrid},
        models::deconv::DeconvModel,
        posterior::{PosteriorTable, posterior},
        stats::{CurvatureStatus, FitResult},
    },
    utils::{build_deconv_options, extract_array1, extract_mle_opts, extract_observations},
};

/// Deconv — Python-facing wrapper for a configured g-modeling fit.
///
/// Constructed once per grid/family/configuration; `fit` may be called on
/// many samples and returns a fresh [`DeconvFit`] each time.
///
/// Parameters
/// ----------
/// - `grid`: strictly increasing 1-D float64 support.
/// - `family`: `"poisson"`, `"normal"` or `"binomial"`.
/// - `regularization`, `df`, `basis`, `standardize`, `penalty`, `atom`,
///   `ignore_zero`, `count_bound`, `normal_bins`, `covariance`: see
///   [`DeconvOptions`](crate::deconvolution::core::options::DeconvOptions).
/// - `tol_grad`, `tol_cost`, `max_iter`, `solver`, `lbfgs_mem`, `verbose`:
///   optimizer settings.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_deconv.deconvolution")]
pub struct Deconv {
    pub inner: DeconvModel,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl Deconv {
    #[new]
    #[pyo3(
        signature = (
            grid,
            family,
            regularization = 1.0,
            df = 5,
            basis = None,
            standardize = true,
            penalty = None,
            atom = None,
            ignore_zero = false,
            count_bound = None,
            normal_bins = None,
            covariance = None,
            tol_grad = None,
            tol_cost = None,
            max_iter = None,
            solver = None,
            lbfgs_mem = None,
            verbose = false,
        ),
        text_signature = "(grid, family, /, regularization=1.0, df=5, basis='ns', \
                          standardize=True, penalty='norm', atom=None, ignore_zero=False, \
                          count_bound=None, normal_bins=None, covariance='curvature', \
                          tol_grad=None, tol_cost=None, max_iter=None, solver='newton', \
                          lbfgs_mem=None, verbose=False)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new<'py>(
        py: Python<'py>, grid: &Bound<'py, PyAny>, family: &str, regularization: f64, df: usize,
        basis: Option<&str>, standardize: bool, penalty: Option<&str>, atom: Option<f64>,
        ignore_zero: bool, count_bound: Option<u64>, normal_bins: Option<usize>,
        covariance: Option<&str>, tol_grad: Option<f64>, tol_cost: Option<f64>,
        max_iter: Option<usize>, solver: Option<&str>, lbfgs_mem: Option<usize>, verbose: bool,
    ) -> PyResult<Self> {
        let grid = SupportGrid::new(extract_array1(py, grid, "grid")?)?;
        let family: Family = family.parse()?;
        let mle_opts = extract_mle_opts(tol_grad, tol_cost, max_iter, solver, lbfgs_mem, verbose)?;
        let options = build_deconv_options(
            regularization,
            df,
            basis,
            standardize,
            penalty,
            atom,
            ignore_zero,
            count_bound,
            normal_bins,
            covariance,
            mle_opts,
        )?;
        Ok(Deconv { inner: DeconvModel::new(grid, family, options)? })
    }

    /// Fit raw values (Poisson/Normal) or `(trials, successes=data)` pairs
    /// (Binomial).
    #[pyo3(signature = (data, trials = None), text_signature = "(self, data, /, trials=None)")]
    pub fn fit<'py>(
        &self, py: Python<'py>, data: &Bound<'py, PyAny>, trials: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<DeconvFit> {
        let obs = extract_observations(py, data, trials)?;
        let prepared = self.inner.prepare(&obs)?;
        let (_, fit) = py.allow_threads(|| self.inner.fit_data(&prepared))?;
        Ok(DeconvFit { inner: fit })
    }

    #[getter]
    pub fn n_coef(&self) -> usize {
        self.inner.n_coef()
    }
}

/// DeconvFit — read-only view of a [`FitResult`] for Python.
///
/// Array getters copy into Python lists; matrices come back row-major.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_deconv.deconvolution")]
pub struct DeconvFit {
    pub inner: FitResult,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl DeconvFit {
    #[getter]
    pub fn theta(&self) -> Vec<f64> {
        self.inner.theta.to_vec()
    }

    #[getter]
    pub fn g(&self) -> Vec<f64> {
        self.inner.g.to_vec()
    }

    #[getter]
    pub fn se_g(&self) -> Vec<f64> {
        self.inner.se_g.to_vec()
    }

    #[getter]
    pub fn bias_g(&self) -> Vec<f64> {
        self.inner.bias_g.to_vec()
    }

    #[getter]
    pub fn cdf(&self) -> Vec<f64> {
        self.inner.cdf.to_vec()
    }

    #[getter]
    pub fn se_cdf(&self) -> Vec<f64> {
        self.inner.se_cdf.to_vec()
    }

    #[getter]
    pub fn alpha(&self) -> Vec<f64> {
        self.inner.alpha.to_vec()
    }

    #[getter]
    pub fn cov_alpha(&self) -> Vec<Vec<f64>> {
        self.inner.cov_alpha.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    #[getter]
    pub fn cov_g(&self) -> Vec<Vec<f64>> {
        self.inner.cov_g.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    #[getter]
    pub fn s_statistic(&self) -> f64 {
        self.inner.s_statistic
    }

    #[getter]
    pub fn loglik(&self) -> f64 {
        self.inner.loglik
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    pub fn status(&self) -> String {
        self.inner.status.clone()
    }

    #[getter]
    pub fn iterations(&self) -> usize {
        self.inner.iterations
    }

    /// Number of null directions of the curvature (0 when regular).
    #[getter]
    pub fn null_dims(&self) -> usize {
        match self.inner.curvature {
            CurvatureStatus::Regular => 0,
            CurvatureStatus::Singular { null_dims } => null_dims,
        }
    }

    #[pyo3(signature = (x, trials = None), text_signature = "(self, x, /, trials=None)")]
    pub fn posterior(&self, x: f64, trials: Option<u64>) -> PyResult<Vec<f64>> {
        Ok(posterior(&self.inner, x, trials)?.to_vec())
    }

    /// Posterior rows for every sample-space point.
    pub fn posterior_table(&self) -> Vec<Vec<f64>> {
        let table = PosteriorTable::from_fit(&self.inner);
        table.matrix.rows().into_iter().map(|r| r.to_vec()).collect()
    }
}

/// _rust_deconv — PyO3 module initializer.
///
/// Registers the `deconvolution` submodule and adds it to `sys.modules` so
/// `rust_deconv.deconvolution` imports with dot notation.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_deconv<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let deconvolution_mod = PyModule::new(_py, "deconvolution")?;
    deconvolution_mod.add_class::<Deconv>()?;
    deconvolution_mod.add_class::<DeconvFit>()?;
    m.add_submodule(&deconvolution_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_deconv.deconvolution", deconvolution_mod)?;
    Ok(())
}
