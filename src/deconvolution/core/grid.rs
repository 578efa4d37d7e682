//! Support grid for the latent parameter θ.
//!
//! [`SupportGrid`] is the validated, immutable θ-support `θ₁ < … < θₘ`
//! every other component is indexed by. Spacing may be irregular.
use crate::deconvolution::errors::{DeconvResult, GridError};
use ndarray::{Array1, ArrayView1};

/// Relative tolerance used to match a requested value against a grid point.
pub const GRID_MATCH_TOL: f64 = 1e-9;

/// Strictly increasing, finite θ-support with at least two points.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportGrid {
    theta: Array1<f64>,
}

impl SupportGrid {
    /// Validate and wrap `theta`.
    ///
    /// # Errors
    /// - `GridError::TooShort` for fewer than two points.
    /// - `GridError::NonFinite` for NaN/±inf entries.
    /// - `GridError::NotIncreasing` for ties or decreases.
    pub fn new(theta: impl Into<Array1<f64>>) -> DeconvResult<Self> {
        let theta = theta.into();
        if theta.len() < 2 {
            return Err(GridError::TooShort { len: theta.len() }.into());
        }
        for (index, &value) in theta.iter().enumerate() {
            if !value.is_finite() {
                return Err(GridError::NonFinite { index, value }.into());
            }
            if index > 0 && value <= theta[index - 1] {
                return Err(GridError::NotIncreasing { index, value }.into());
            }
        }
        Ok(Self { theta })
    }

    /// `m + 1` evenly spaced points from `start` to `stop` (inclusive) in
    /// steps of `step`; points are computed as `start + k·step` to avoid
    /// accumulated rounding.
    pub fn linspace_step(start: f64, stop: f64, step: f64) -> DeconvResult<Self> {
        let count = if step > 0.0 && stop >= start {
            ((stop - start) / step + 1e-9).floor() as usize + 1
        } else {
            0
        };
        Self::new(Array1::from_iter((0..count).map(|k| start + k as f64 * step)))
    }

    pub fn len(&self) -> usize {
        self.theta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.theta.is_empty()
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.theta.view()
    }

    pub fn min(&self) -> f64 {
        self.theta[0]
    }

    pub fn max(&self) -> f64 {
        self.theta[self.theta.len() - 1]
    }

    /// Index of the grid point equal to `value` up to
    /// `GRID_MATCH_TOL · max(1, |value|)`.
    pub fn position(&self, value: f64) -> Option<usize> {
        let tol = GRID_MATCH_TOL * value.abs().max(1.0);
        self.theta.iter().position(|&t| (t - value).abs() <= tol)
    }
}
