//! Deconvolution options — configuration for one g-modeling fit.
//!
//! Purpose
//! -------
//! Collect every knob of a fit in one validated value: regularization,
//! penalty form, basis, atom, sample-space handling, covariance flavor,
//! optimizer start, and optimizer settings.
//!
//! Key behaviors
//! -------------
//! - [`DeconvOptions::new`] validates the fields it owns (regularization
//!   weight, Normal bin count); components with their own builders
//!   (`MLEOptions`, `BasisOptions`) are taken as given.
//! - [`DeconvOptions::default`] reproduces the documented defaults:
//!   `c0 = 1`, norm penalty, natural spline with `df = 5`, standardized
//!   columns, no atom, zeros kept, curvature covariance, `α₀ = 0`, Newton.
//! - [`CovarianceKind`] selects between the inverse penalized curvature and
//!   the outer-product sandwich.
//!
//! Invariants & assumptions
//! ------------------------
//! - `regularization` is finite and non-negative.
//! - `normal_bins`, when set, is positive.
//! - `start`, when set, must match the number of basis columns; that check
//!   happens at fit time once the design matrix is known.
//!
//! Downstream usage
//! ----------------
//! - Pass a `DeconvOptions` to [`DeconvModel::new`] or the top-level
//!   `fit` entry point; reuse the same options across a batch.
//!
//! [`DeconvModel::new`]: crate::deconvolution::models::deconv::DeconvModel::new
use crate::{
    deconvolution::{
        core::{basis::BasisOptions, observations::SampleSpaceOptions, penalty::PenaltyKind},
        errors::{DeconvError, DeconvResult},
    },
    optimization::loglik_optimizer::MLEOptions,
};
use ndarray::Array1;
use std::str::FromStr;

/// Which covariance estimate the statistics engine reports.
///
/// - `Curvature`: `H⁺` with `H = −∇²ℓ(α̂) + ∇²pen(α̂)`.
/// - `Sandwich`: `(I + ∇²pen)⁺ I (I + ∇²pen)⁺` with `I` the outer-product
///   information at `α̂`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceKind {
    #[default]
    Curvature,
    Sandwich,
}

impl FromStr for CovarianceKind {
    type Err = DeconvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "curvature" | "hessian" | "classical" => Ok(CovarianceKind::Curvature),
            "sandwich" | "robust" => Ok(CovarianceKind::Sandwich),
            _ => Err(DeconvError::UnknownOption { option: "covariance", name: s.to_string() }),
        }
    }
}

/// DeconvOptions — configuration of a single fit.
///
/// Fields
/// ------
/// - `regularization`: `c0`, the penalty weight.
/// - `penalty`: [`PenaltyKind`] applied to all non-atom coefficients.
/// - `basis`: [`BasisOptions`] (kind, `df`, standardization).
/// - `atom`: optional grid location of a point mass.
/// - `ignore_zero`: drop zero counts and truncate the Poisson kernel.
/// - `count_bound`: upper end of the Poisson count range.
/// - `normal_bins`: bin raw Normal values into this many bins.
/// - `covariance`: [`CovarianceKind`] for the reported covariance.
/// - `start`: optimizer start `α₀`; `None` means zeros (uniform `g`).
/// - `mle_opts`: optimizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DeconvOptions {
    pub regularization: f64,
    pub penalty: PenaltyKind,
    pub basis: BasisOptions,
    pub atom: Option<f64>,
    pub ignore_zero: bool,
    pub count_bound: Option<u64>,
    pub normal_bins: Option<usize>,
    pub covariance: CovarianceKind,
    pub start: Option<Array1<f64>>,
    pub mle_opts: MLEOptions,
}

impl DeconvOptions {
    /// Validated constructor.
    ///
    /// Errors
    /// ------
    /// - `InvalidRegularization` if `regularization` is negative or not
    ///   finite.
    /// - `InvalidBins` if `normal_bins == Some(0)`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        regularization: f64, penalty: PenaltyKind, basis: BasisOptions, atom: Option<f64>,
        ignore_zero: bool, count_bound: Option<u64>, normal_bins: Option<usize>,
        covariance: CovarianceKind, start: Option<Array1<f64>>, mle_opts: MLEOptions,
    ) -> DeconvResult<Self> {
        if !(regularization.is_finite() && regularization >= 0.0) {
            return Err(DeconvError::InvalidRegularization { value: regularization });
        }
        if let Some(0) = normal_bins {
            return Err(DeconvError::InvalidBins { bins: 0 });
        }
        Ok(Self {
            regularization,
            penalty,
            basis,
            atom,
            ignore_zero,
            count_bound,
            normal_bins,
            covariance,
            start,
            mle_opts,
        })
    }

    /// Sample-space settings used during aggregation.
    pub fn sample_space(&self) -> SampleSpaceOptions {
        SampleSpaceOptions {
            ignore_zero: self.ignore_zero,
            count_bound: self.count_bound,
            normal_bins: self.normal_bins,
        }
    }
}

impl Default for DeconvOptions {
    fn default() -> Self {
        Self {
            regularization: 1.0,
            penalty: PenaltyKind::Norm,
            basis: BasisOptions::default(),
            atom: None,
            ignore_zero: false,
            count_bound: None,
            normal_bins: None,
            covariance: CovarianceKind::Curvature,
            start: None,
            mle_opts: MLEOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deconvolution::core::basis::BasisKind;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Defaults and validation in `DeconvOptions::new`.
    // - Parsing of `CovarianceKind`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Defaults match the documented configuration.
    //
    // Given
    // -----
    // - `DeconvOptions::default()`.
    //
    // Expect
    // ------
    // - c0 = 1, norm penalty, natural spline df = 5, curvature covariance.
    fn defaults_are_documented_values() {
        // Act
        let opts = DeconvOptions::default();

        // Assert
        assert_eq!(opts.regularization, 1.0);
        assert_eq!(opts.penalty, PenaltyKind::Norm);
        assert_eq!(opts.basis, BasisOptions::new(BasisKind::NaturalSpline, 5, true));
        assert_eq!(opts.covariance, CovarianceKind::Curvature);
        assert_eq!(opts.sample_space(), SampleSpaceOptions::default());
    }

    #[test]
    // Purpose
    // -------
    // Invalid weights and bin counts are rejected.
    //
    // Given
    // -----
    // - c0 = -0.5; c0 = inf; bins = 0.
    //
    // Expect
    // ------
    // - `InvalidRegularization` twice, then `InvalidBins`.
    fn new_rejects_invalid_fields() {
        // Arrange
        let build = |c0: f64, bins: Option<usize>| {
            DeconvOptions::new(
                c0,
                PenaltyKind::Ridge,
                BasisOptions::default(),
                None,
                false,
                None,
                bins,
                CovarianceKind::Sandwich,
                None,
                MLEOptions::default(),
            )
        };

        // Act / Assert
        assert!(matches!(build(-0.5, None), Err(DeconvError::InvalidRegularization { .. })));
        assert!(matches!(build(f64::INFINITY, None), Err(DeconvError::InvalidRegularization { .. })));
        assert_eq!(build(1.0, Some(0)), Err(DeconvError::InvalidBins { bins: 0 }));
        assert!(build(0.0, Some(20)).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Covariance names parse case-insensitively.
    //
    // Given
    // -----
    // - "Sandwich", "hessian", "bootstrap".
    //
    // Expect
    // ------
    // - Sandwich, Curvature, `UnknownOption`.
    fn covariance_kind_parses() {
        assert_eq!("Sandwich".parse::<CovarianceKind>(), Ok(CovarianceKind::Sandwich));
        assert_eq!("hessian".parse::<CovarianceKind>(), Ok(CovarianceKind::Curvature));
        assert!("bootstrap".parse::<CovarianceKind>().is_err());
    }
}
