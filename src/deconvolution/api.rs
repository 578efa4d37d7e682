//! One-call entry points.
//!
//! [`fit`] runs the whole pipeline (grid check → basis → kernel →
//! optimizer → statistics) for a single sample; use
//! [`DeconvModel`](crate::deconvolution::models::deconv::DeconvModel)
//! directly to reuse the basis across samples.
use crate::deconvolution::{
    core::{family::Family, grid::SupportGrid, observations::Observations, options::DeconvOptions},
    errors::DeconvResult,
    models::deconv::DeconvModel,
    stats::FitResult,
};
use ndarray::Array1;

/// Fit the prior `g` on `grid` to `observations` under `family`.
///
/// # Errors
/// Input validation failures (`InvalidGrid`, `InvalidAtom`,
/// `GridOutsideFamily`, observation errors) are raised before optimizing.
/// Optimizer non-convergence is reported through `FitResult::converged`.
///
/// # Example
/// ```rust
/// use ndarray::{Array1, array};
/// use rust_deconv::deconvolution::prelude::*;
///
/// let grid = Array1::linspace(0.5, 6.0, 12);
/// let obs = Observations::Values(array![0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 4.0, 1.0, 2.0, 5.0]);
/// let fit = fit(grid, &obs, Family::Poisson, &DeconvOptions::default()).unwrap();
/// assert!((fit.g.sum() - 1.0).abs() < 1e-12);
/// ```
pub fn fit(
    grid: impl Into<Array1<f64>>, observations: &Observations, family: Family,
    options: &DeconvOptions,
) -> DeconvResult<FitResult> {
    let grid = SupportGrid::new(grid)?;
    let model = DeconvModel::new(grid, family, options.clone())?;
    let data = model.prepare(observations)?;
    let (_, fit) = model.fit_data(&data)?;
    Ok(fit)
}
