//! Posterior engine: Bayes' rule on the fitted prior.
//!
//! - [`posterior`]: `g(θ | x) ∝ ĝ(θ) p(x | θ)` for one observation,
//!   normalized by a plain sum over the grid.
//! - [`PosteriorTable`]: the posterior for every row of the fitted sample
//!   space, with posterior means and fitted marginal counts `N f`.
//!
//! A zero-truncated Poisson fit conditions on `x ≥ 1`, so single-point
//! posteriors use the truncated kernel and `x = 0` is rejected.
use crate::deconvolution::{
    core::{
        family::{Family, point_count},
        grid::SupportGrid,
        observations::SamplePoint,
    },
    errors::{DeconvError, DeconvResult},
    stats::FitResult,
};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Posterior over the grid for a single observation `x` (with `trials`
/// for Binomial fits).
///
/// # Errors
/// - `InvalidPoint` if `x` is outside the family's sample space, or
///   `x = 0` for a zero-truncated fit.
/// - `DegeneratePosterior` if `x` has zero marginal probability under `ĝ`.
pub fn posterior(fit: &FitResult, x: f64, trials: Option<u64>) -> DeconvResult<Array1<f64>> {
    let point = match fit.family {
        Family::Binomial => SamplePoint {
            value: x,
            trials: Some(trials.ok_or(DeconvError::InvalidPoint {
                value: x,
                reason: "Binomial observations need a trial count",
            })?),
        },
        Family::Poisson => SamplePoint::count(point_count(x)?),
        Family::Normal => SamplePoint::value(x),
    };
    if fit.zero_truncated && point.value == 0.0 {
        return Err(DeconvError::InvalidPoint {
            value: x,
            reason: "zero counts are excluded from this fit",
        });
    }
    let grid = SupportGrid::new(fit.theta.clone())?;
    let mut kernel = fit.family.row(&point, &grid)?;
    if fit.zero_truncated {
        kernel.zip_mut_with(&fit.theta, |p, &theta| *p /= -(-theta).exp_m1());
    }
    normalize(&fit.g * &kernel).ok_or(DeconvError::DegeneratePosterior { value: x })
}

/// Posteriors for every sample-space row of a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorTable {
    /// Representative value of each row (bin midpoints for binned Normal).
    pub points: Vec<SamplePoint>,
    /// `matrix[[x, j]] = g(θ_j | x)`; rows with zero marginal are NaN.
    pub matrix: Array2<f64>,
    /// `E[θ | x]` per row.
    pub posterior_mean: Array1<f64>,
    /// Fitted marginal probabilities `f = P ĝ`.
    pub marginal: Array1<f64>,
    /// Expected counts `N f`.
    pub fitted_counts: Array1<f64>,
}

impl PosteriorTable {
    pub fn from_fit(fit: &FitResult) -> Self {
        let kernel = &fit.kernel.matrix;
        let marginal = kernel.dot(&fit.g);
        let mut matrix = kernel * &fit.g.view().insert_axis(Axis(0));
        for (mut row, &fx) in matrix.axis_iter_mut(Axis(0)).zip(marginal.iter()) {
            if fx > 0.0 && fx.is_finite() {
                row /= fx;
            } else {
                row.fill(f64::NAN);
            }
        }
        let posterior_mean = matrix.dot(&fit.theta);
        let fitted_counts = &marginal * fit.n_obs();
        Self { points: fit.kernel.space.points(), matrix, posterior_mean, marginal, fitted_counts }
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.matrix.row(i)
    }
}

fn normalize(weights: Array1<f64>) -> Option<Array1<f64>> {
    let total = weights.sum();
    (total > 0.0 && total.is_finite()).then(|| weights / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deconvolution::{
        core::{
            observations::{Histogram, Observations, SampleSpace},
            options::DeconvOptions,
        },
        models::deconv::DeconvModel,
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Normalization of single-point and tabulated posteriors.
    // - Agreement between `posterior` and `PosteriorTable` rows.
    // - Domain errors and the zero-truncated case.
    // -------------------------------------------------------------------------

    fn fit(ignore_zero: bool) -> FitResult {
        let grid = SupportGrid::new(Array1::linspace(0.5, 10.0, 20)).expect("grid");
        let options = DeconvOptions { ignore_zero, ..DeconvOptions::default() };
        let mut model = DeconvModel::new(grid, Family::Poisson, options).expect("model");
        let obs = Observations::Histogram(
            Histogram::new(
                SampleSpace::Counts { lower: 0, upper: 10 },
                array![12.0, 25.0, 30.0, 24.0, 18.0, 14.0, 10.0, 8.0, 5.0, 3.0, 1.0],
            )
            .expect("histogram"),
        );
        model.fit(&obs).expect("fit").clone()
    }

    #[test]
    // Purpose
    // -------
    // Single-observation posteriors are distributions and match the table.
    //
    // Given
    // -----
    // - A Poisson fit and x = 3.
    //
    // Expect
    // ------
    // - Sum 1, non-negative, equal to table row 3.
    fn posterior_is_normalized_and_matches_table() {
        // Arrange
        let fit = fit(false);

        // Act
        let post = posterior(&fit, 3.0, None).expect("posterior");
        let table = PosteriorTable::from_fit(&fit);

        // Assert
        assert_relative_eq!(post.sum(), 1.0, epsilon = 1e-12);
        assert!(post.iter().all(|&p| p >= 0.0));
        for j in 0..post.len() {
            assert_relative_eq!(post[j], table.row(3)[j], epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // The table's rows are normalized and its fitted counts total N.
    //
    // Given
    // -----
    // - A Poisson fit over counts 0..=10.
    //
    // Expect
    // ------
    // - Each row sums to 1; posterior means increase with x; Σ fitted ≤ N.
    fn table_rows_are_normalized() {
        // Arrange
        let fit = fit(false);

        // Act
        let table = PosteriorTable::from_fit(&fit);

        // Assert
        for row in table.matrix.rows() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-10);
        }
        for w in table.posterior_mean.windows(2) {
            assert!(w[1] > w[0]);
        }
        assert!(table.fitted_counts.sum() <= fit.n_obs() + 1e-9);
        assert_eq!(table.points.len(), 11);
    }

    #[test]
    // Purpose
    // -------
    // Invalid observations are rejected.
    //
    // Given
    // -----
    // - x = 2.5 and x = -1 for Poisson; x = 0 for a zero-truncated fit.
    //
    // Expect
    // ------
    // - `InvalidPoint` in each case.
    fn invalid_observations_are_rejected() {
        // Arrange
        let plain = fit(false);
        let truncated = fit(true);

        // Act / Assert
        for (f, x) in [(&plain, 2.5), (&plain, -1.0), (&truncated, 0.0)] {
            assert!(matches!(posterior(f, x, None), Err(DeconvError::InvalidPoint { .. })));
        }
        assert!(posterior(&truncated, 1.0, None).is_ok());
    }
}
