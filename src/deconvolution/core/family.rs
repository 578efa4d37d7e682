//! Exponential-family kernels `p(x | θ)`.
//!
//! Purpose
//! -------
//! Hold every family-specific numeric in one closed enum. Downstream code
//! only sees the kernel matrix built from [`Family::row`] and never
//! branches on the family again.
//!
//! Key behaviors
//! -------------
//! - Poisson: `p(x | θ) = e^{-θ} θˣ / x!` for rate `θ ≥ 0`.
//! - Normal: `φ(x - θ)`, the unit-variance density, for `θ ∈ ℝ`.
//! - Binomial: `C(n, x) θˣ (1 - θ)^{n-x}` for `θ ∈ [0, 1]`.
//!
//! Conventions
//! -----------
//! - Densities are evaluated with `statrs`; a rate of exactly zero is
//!   handled directly since `statrs` requires a positive Poisson rate.
use crate::deconvolution::{
    core::{grid::SupportGrid, observations::SamplePoint},
    errors::{DeconvError, DeconvResult},
};
use ndarray::Array1;
use statrs::distribution::{Binomial, Continuous, ContinuousCDF, Discrete, Normal, Poisson};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Poisson,
    Normal,
    Binomial,
}

impl Family {
    pub fn name(&self) -> &'static str {
        match self {
            Family::Poisson => "Poisson",
            Family::Normal => "Normal",
            Family::Binomial => "Binomial",
        }
    }

    /// Check that every grid point lies in the family's parameter domain.
    ///
    /// With `ignore_zero` the Poisson rate must be strictly positive, since
    /// the zero-truncated kernel divides by `1 - e^{-θ}`.
    pub fn validate_grid(&self, grid: &SupportGrid, ignore_zero: bool) -> DeconvResult<()> {
        let outside = |index: usize, value: f64| DeconvError::GridOutsideFamily {
            index,
            value,
            family: self.name(),
        };
        for (index, &theta) in grid.values().iter().enumerate() {
            let valid = match self {
                Family::Poisson if ignore_zero => theta > 0.0,
                Family::Poisson => theta >= 0.0,
                Family::Binomial => (0.0..=1.0).contains(&theta),
                Family::Normal => true,
            };
            if !valid {
                return Err(outside(index, theta));
            }
        }
        Ok(())
    }

    /// `p(x | θ_j)` for every grid point, as one row of the kernel matrix.
    ///
    /// # Errors
    /// - `InvalidPoint` if `point` is not in the family's sample space
    ///   (negative or fractional counts, successes above trials, missing
    ///   trial count for Binomial). Callers iterating over records attach
    ///   the record index.
    pub fn row(&self, point: &SamplePoint, grid: &SupportGrid) -> DeconvResult<Array1<f64>> {
        let x = point.value;
        match self {
            Family::Poisson => {
                let k = point_count(x)?;
                Ok(grid.values().mapv(|theta| poisson_pmf(k, theta)))
            }
            Family::Normal => Ok(grid.values().mapv(|theta| normal_pdf(x - theta))),
            Family::Binomial => {
                let n = point.trials.ok_or(DeconvError::InvalidPoint {
                    value: x,
                    reason: "Binomial observations need a trial count",
                })?;
                let k = point_count(x)?;
                if k > n {
                    return Err(DeconvError::InvalidPoint {
                        value: x,
                        reason: "successes exceed trials",
                    });
                }
                Ok(grid.values().mapv(|theta| binomial_pmf(k, n, theta)))
            }
        }
    }

    /// Probability that a Normal observation falls in `[lower, upper)`
    /// for each grid point.
    pub fn normal_bin_row(lower: f64, upper: f64, grid: &SupportGrid) -> Array1<f64> {
        grid.values().mapv(|theta| normal_cdf(upper - theta) - normal_cdf(lower - theta))
    }
}

impl FromStr for Family {
    type Err = DeconvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "poisson" => Ok(Family::Poisson),
            "normal" | "gaussian" => Ok(Family::Normal),
            "binomial" => Ok(Family::Binomial),
            _ => Err(DeconvError::UnknownFamily { name: s.to_string() }),
        }
    }
}

/// Interpret record `index` with value `x` as a non-negative integer count.
pub(crate) fn as_count(x: f64, index: usize) -> DeconvResult<u64> {
    parse_count(x).map_err(|reason| DeconvError::DomainMismatch { index, value: x, reason })
}

/// Interpret a single query value `x` as a non-negative integer count.
pub(crate) fn point_count(x: f64) -> DeconvResult<u64> {
    parse_count(x).map_err(|reason| DeconvError::InvalidPoint { value: x, reason })
}

fn parse_count(x: f64) -> Result<u64, &'static str> {
    if !x.is_finite() || x < 0.0 {
        return Err("counts must be finite and non-negative");
    }
    if x.fract() != 0.0 {
        return Err("counts must be integers");
    }
    Ok(x as u64)
}

fn poisson_pmf(k: u64, rate: f64) -> f64 {
    if rate == 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    match Poisson::new(rate) {
        Ok(dist) => dist.pmf(k),
        Err(_) => f64::NAN,
    }
}

fn binomial_pmf(k: u64, n: u64, p: f64) -> f64 {
    match Binomial::new(p, n) {
        Ok(dist) => dist.pmf(k),
        Err(_) => f64::NAN,
    }
}

fn standard_normal() -> Option<Normal> {
    Normal::new(0.0, 1.0).ok()
}

fn normal_pdf(z: f64) -> f64 {
    standard_normal().map_or(f64::NAN, |d| d.pdf(z))
}

fn normal_cdf(z: f64) -> f64 {
    standard_normal().map_or(f64::NAN, |d| d.cdf(z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Density values for each family on small grids.
    // - Parameter-domain checks for grids.
    // - Sample-space checks for observations.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Poisson rows match closed-form pmfs, including the zero-rate edge.
    //
    // Given
    // -----
    // - Grid (0, 1, 2), x = 0 and x = 2.
    //
    // Expect
    // ------
    // - Row(0) = (1, e⁻¹, e⁻²); Row(2) = (0, e⁻¹/2, 2e⁻²).
    fn poisson_row_matches_closed_form() {
        // Arrange
        let grid = SupportGrid::new(array![0.0, 1.0, 2.0]).expect("grid");

        // Act
        let zero = Family::Poisson.row(&SamplePoint::count(0), &grid).expect("row");
        let two = Family::Poisson.row(&SamplePoint::count(2), &grid).expect("row");

        // Assert
        assert_abs_diff_eq!(zero[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(zero[1], (-1f64).exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(two[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(two[1], (-1f64).exp() / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(two[2], 2.0 * (-2f64).exp(), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Binomial rows sum to one over the full sample space.
    //
    // Given
    // -----
    // - Grid (0.1, 0.5, 0.9), n = 6.
    //
    // Expect
    // ------
    // - Σₓ p(x | θ) = 1 for every θ.
    fn binomial_rows_sum_to_one() {
        // Arrange
        let grid = SupportGrid::new(array![0.1, 0.5, 0.9]).expect("grid");

        // Act
        let mut total = Array1::<f64>::zeros(3);
        for x in 0..=6 {
            total += &Family::Binomial.row(&SamplePoint::trial(6, x), &grid).expect("row");
        }

        // Assert
        for v in total.iter() {
            assert_abs_diff_eq!(*v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Normal rows are the unit-variance density of x - θ and bins integrate it.
    //
    // Given
    // -----
    // - Grid (-1, 0), x = 0, and the bin [-10, 10).
    //
    // Expect
    // ------
    // - Row = (φ(1), φ(0)); bin probabilities ≈ 1.
    fn normal_row_and_bins() {
        // Arrange
        let grid = SupportGrid::new(array![-1.0, 0.0]).expect("grid");
        let phi0 = 1.0 / (2.0 * std::f64::consts::PI).sqrt();

        // Act
        let row = Family::Normal.row(&SamplePoint::value(0.0), &grid).expect("row");
        let bins = Family::normal_bin_row(-10.0, 10.0, &grid);

        // Assert
        assert_abs_diff_eq!(row[1], phi0, epsilon = 1e-12);
        assert_abs_diff_eq!(row[0], phi0 * (-0.5f64).exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(bins[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Grids outside the parameter domain and invalid observations are rejected.
    //
    // Given
    // -----
    // - A Binomial grid reaching 1.2, a Poisson grid containing 0 with
    //   `ignore_zero`, a fractional count and successes above trials.
    //
    // Expect
    // ------
    // - `GridOutsideFamily` twice, then `InvalidPoint` twice.
    fn domain_violations_are_reported() {
        // Arrange
        let binom_grid = SupportGrid::new(array![0.5, 1.2]).expect("grid");
        let pois_grid = SupportGrid::new(array![0.0, 1.0]).expect("grid");

        // Act / Assert
        assert!(matches!(
            Family::Binomial.validate_grid(&binom_grid, false),
            Err(DeconvError::GridOutsideFamily { index: 1, .. })
        ));
        assert!(matches!(
            Family::Poisson.validate_grid(&pois_grid, true),
            Err(DeconvError::GridOutsideFamily { index: 0, .. })
        ));
        assert!(Family::Poisson.validate_grid(&pois_grid, false).is_ok());
        assert!(matches!(
            Family::Poisson.row(&SamplePoint::value(1.5), &pois_grid),
            Err(DeconvError::InvalidPoint { .. })
        ));
        assert!(matches!(
            Family::Binomial.row(&SamplePoint::trial(3, 4), &binom_grid),
            Err(DeconvError::InvalidPoint { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Family names parse case-insensitively.
    //
    // Given
    // -----
    // - "POISSON", "gaussian", "Binomial", "gamma".
    //
    // Expect
    // ------
    // - Three matches, one `UnknownFamily`.
    fn family_parses_names() {
        // Act / Assert
        assert_eq!("POISSON".parse::<Family>(), Ok(Family::Poisson));
        assert_eq!("gaussian".parse::<Family>(), Ok(Family::Normal));
        assert_eq!("Binomial".parse::<Family>(), Ok(Family::Binomial));
        assert_eq!(
            "gamma".parse::<Family>(),
            Err(DeconvError::UnknownFamily { name: "gamma".to_string() })
        );
    }
}
