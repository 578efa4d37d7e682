//! Regularization penalty on the basis coefficients.
//!
//! - [`PenaltyKind::Norm`]: `c0 · sqrt(Σ mₖ αₖ² + ε²)`, the Euclidean norm
//!   smoothed at the origin so Newton steps stay defined at `α = 0`.
//! - [`PenaltyKind::Ridge`]: `c0 · Σ mₖ αₖ²`.
//!
//! `m` is a 0/1 mask; the atom coefficient has `mₖ = 0` and is never
//! shrunk. The objective subtracts the penalty from the log-likelihood.
use crate::deconvolution::errors::{DeconvError, DeconvResult};
use ndarray::{Array1, Array2, ArrayView1};
use std::str::FromStr;

/// Smoothing constant of the norm penalty at the origin.
pub const NORM_SMOOTHING: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenaltyKind {
    #[default]
    Norm,
    Ridge,
}

impl FromStr for PenaltyKind {
    type Err = DeconvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "norm" | "l2" => Ok(PenaltyKind::Norm),
            "ridge" | "squared" => Ok(PenaltyKind::Ridge),
            _ => Err(DeconvError::UnknownOption { option: "penalty", name: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Penalty {
    pub kind: PenaltyKind,
    pub c0: f64,
    pub mask: Array1<f64>,
}

impl Penalty {
    /// Penalty on `n_coef` coefficients, leaving `unpenalized` (the atom
    /// column) out.
    ///
    /// # Errors
    /// `InvalidRegularization` if `c0` is negative or not finite.
    pub fn new(
        kind: PenaltyKind, c0: f64, n_coef: usize, unpenalized: Option<usize>,
    ) -> DeconvResult<Self> {
        if !(c0.is_finite() && c0 >= 0.0) {
            return Err(DeconvError::InvalidRegularization { value: c0 });
        }
        let mut mask = Array1::<f64>::ones(n_coef);
        if let Some(k) = unpenalized.filter(|&k| k < n_coef) {
            mask[k] = 0.0;
        }
        Ok(Self { kind, c0, mask })
    }

    fn radius(&self, alpha: ArrayView1<f64>) -> f64 {
        let ss: f64 = alpha.iter().zip(self.mask.iter()).map(|(a, m)| m * a * a).sum();
        (ss + NORM_SMOOTHING * NORM_SMOOTHING).sqrt()
    }

    pub fn value(&self, alpha: ArrayView1<f64>) -> f64 {
        match self.kind {
            PenaltyKind::Norm => self.c0 * self.radius(alpha),
            PenaltyKind::Ridge => {
                self.c0 * alpha.iter().zip(self.mask.iter()).map(|(a, m)| m * a * a).sum::<f64>()
            }
        }
    }

    pub fn gradient(&self, alpha: ArrayView1<f64>) -> Array1<f64> {
        let masked = &self.mask * &alpha;
        match self.kind {
            PenaltyKind::Norm => masked * (self.c0 / self.radius(alpha)),
            PenaltyKind::Ridge => masked * (2.0 * self.c0),
        }
    }

    pub fn hessian(&self, alpha: ArrayView1<f64>) -> Array2<f64> {
        let diag = Array2::from_diag(&self.mask);
        match self.kind {
            PenaltyKind::Norm => {
                let r = self.radius(alpha);
                let masked = (&self.mask * &alpha).insert_axis(ndarray::Axis(1));
                let outer = masked.dot(&masked.t());
                (diag / r - outer / r.powi(3)) * self.c0
            }
            PenaltyKind::Ridge => diag * (2.0 * self.c0),
        }
    }
}
