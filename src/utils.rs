//! Conversion helpers for the PyO3 surface.
//!
//! Python inputs (numpy arrays, pandas Series, plain sequences, strings for
//! enum options) are turned into validated Rust configuration here, so the
//! `#[pymethods]` in the crate root stay thin.
#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    deconvolution::{
        core::{
            basis::{BasisKind, BasisOptions},
            observations::Observations,
            options::{CovarianceKind, DeconvOptions},
            penalty::PenaltyKind,
        },
        errors::DeconvError,
    },
    optimization::loglik_optimizer::traits::{MLEOptions, SolverKind, Tolerances},
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

/// Borrow or copy a 1-D float64 input (ndarray, Series, or sequence).
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Owned `Array1<f64>` from any accepted 1-D input.
#[cfg(feature = "python-bindings")]
pub fn extract_array1<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(Array1::from(slice.to_vec()))
}

/// Raw values, or `(trials, successes)` pairs when `trials` is given.
#[cfg(feature = "python-bindings")]
pub fn extract_observations<'py>(
    py: Python<'py>, data: &Bound<'py, PyAny>, trials: Option<&Bound<'py, PyAny>>,
) -> PyResult<Observations> {
    let values = extract_array1(py, data, "data")?;
    let Some(trials) = trials else {
        return Ok(Observations::Values(values));
    };
    let trials = extract_array1(py, trials, "trials")?;
    let to_counts = |arr: &Array1<f64>| -> PyResult<Vec<u64>> {
        arr.iter()
            .enumerate()
            .map(|(i, &v)| {
                crate::deconvolution::core::family::as_count(v, i).map_err(PyErr::from)
            })
            .collect()
    };
    Ok(Observations::Trials { trials: to_counts(&trials)?, successes: to_counts(&values)? })
}

#[cfg(feature = "python-bindings")]
pub fn extract_mle_opts(
    tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    solver: Option<&str>, lbfgs_mem: Option<usize>, verbose: bool,
) -> PyResult<MLEOptions> {
    use std::str::FromStr;

    let defaults = Tolerances::default();
    let tols = Tolerances::new(
        tol_grad.or(defaults.tol_grad),
        tol_cost.or(defaults.tol_cost),
        max_iter.or(defaults.max_iter),
    )
    .map_err(DeconvError::from)?;
    let solver = match solver {
        Some(name) => SolverKind::from_str(name).map_err(DeconvError::from)?,
        None => SolverKind::Newton,
    };
    Ok(MLEOptions::new(tols, solver, verbose, lbfgs_mem).map_err(DeconvError::from)?)
}

/// Assemble [`DeconvOptions`] from keyword arguments; string options parse
/// case-insensitively.
#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn build_deconv_options(
    regularization: f64, df: usize, basis: Option<&str>, standardize: bool, penalty: Option<&str>,
    atom: Option<f64>, ignore_zero: bool, count_bound: Option<u64>, normal_bins: Option<usize>,
    covariance: Option<&str>, mle_opts: MLEOptions,
) -> PyResult<DeconvOptions> {
    let kind: BasisKind = basis.map_or(Ok(BasisKind::NaturalSpline), str::parse)?;
    let penalty: PenaltyKind = penalty.map_or(Ok(PenaltyKind::Norm), str::parse)?;
    let covariance: CovarianceKind =
        covariance.map_or(Ok(CovarianceKind::Curvature), str::parse)?;
    Ok(DeconvOptions::new(
        regularization,
        penalty,
        BasisOptions::new(kind, df, standardize),
        atom,
        ignore_zero,
        count_bound,
        normal_bins,
        covariance,
        None,
        mle_opts,
    )?)
}
