//! Kernel matrix `P[x, j] = p(x | θ_j)` over a sample space and grid.
//!
//! This is the single place family numerics enter the fit; everything
//! downstream only sees `P`.
//!
//! Row order follows [`SampleSpace::points`]. With zero exclusion on a
//! Poisson count space, each column is divided by `1 - e^{-θ_j}` so the
//! truncated kernel sums to one over `x ≥ 1`.
use crate::deconvolution::{
    core::{
        family::Family,
        grid::SupportGrid,
        observations::SampleSpace,
    },
    errors::{DeconvError, DeconvResult},
};
use ndarray::{Array1, Array2, ArrayView1};

#[derive(Debug, Clone, PartialEq)]
pub struct KernelMatrix {
    pub family: Family,
    pub space: SampleSpace,
    pub matrix: Array2<f64>,
}

impl KernelMatrix {
    /// Evaluate `P` for `family` over `space × grid`.
    ///
    /// # Errors
    /// - `FamilyMismatch` if `space` belongs to another family.
    /// - `GridOutsideFamily` for grid points outside the parameter domain.
    /// - Anything [`SampleSpace::validate`] reports, including
    ///   `SampleSpaceTooLarge`, before the matrix is allocated.
    pub fn build(
        family: Family, grid: &SupportGrid, space: &SampleSpace, ignore_zero: bool,
    ) -> DeconvResult<Self> {
        if space.family() != family {
            return Err(DeconvError::FamilyMismatch {
                family: family.name(),
                observations: "Sample space",
            });
        }
        let truncated = matches!(space, SampleSpace::Counts { lower, .. } if *lower > 0) && ignore_zero;
        family.validate_grid(grid, truncated)?;
        space.validate()?;

        let mut matrix = Array2::<f64>::zeros((space.len(), grid.len()));
        match space {
            SampleSpace::Bins { lower, width, bins } => {
                for i in 0..*bins {
                    let lo = lower + i as f64 * width;
                    let row = Family::normal_bin_row(lo, lo + width, grid);
                    matrix.row_mut(i).assign(&row);
                }
            }
            _ => {
                for (i, point) in space.points().iter().enumerate() {
                    let row = family.row(point, grid)?;
                    matrix.row_mut(i).assign(&row);
                }
            }
        }

        if truncated {
            let mass = grid.values().mapv(|theta| -(-theta).exp_m1());
            for mut row in matrix.rows_mut() {
                row /= &mass;
            }
        }
        Ok(Self { family, space: space.clone(), matrix })
    }

    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_grid(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.matrix.row(i)
    }

    /// Marginal `f = P g`.
    pub fn marginal(&self, g: ArrayView1<f64>) -> Array1<f64> {
        self.matrix.dot(&g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deconvolution::core::observations::MAX_SAMPLE_SPACE_ROWS;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Row layout for each family's sample space.
    // - Zero-truncation of the Poisson kernel.
    // - Normal bin probabilities and family/space agreement.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Poisson rows hold the pmf of each count under each rate.
    //
    // Given
    // -----
    // - Rates (1, 2) and counts 0..=2.
    //
    // Expect
    // ------
    // - P[x, j] = e^{-θ} θˣ / x!.
    fn poisson_kernel_matches_pmf() {
        // Arrange
        let grid = SupportGrid::new(array![1.0, 2.0]).expect("grid");
        let space = SampleSpace::Counts { lower: 0, upper: 2 };

        // Act
        let kernel = KernelMatrix::build(Family::Poisson, &grid, &space, false).expect("kernel");

        // Assert
        assert_eq!(kernel.matrix.dim(), (3, 2));
        assert_relative_eq!(kernel.matrix[[0, 0]], (-1.0f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(kernel.matrix[[2, 1]], 2.0 * (-2.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Zero-truncated Poisson columns renormalize over x ≥ 1.
    //
    // Given
    // -----
    // - Rate 0.5 and counts 1..=60.
    //
    // Expect
    // ------
    // - Column sums to 1.
    fn truncated_poisson_columns_sum_to_one() {
        // Arrange
        let grid = SupportGrid::new(array![0.5, 1.5]).expect("grid");
        let space = SampleSpace::Counts { lower: 1, upper: 60 };

        // Act
        let kernel = KernelMatrix::build(Family::Poisson, &grid, &space, true).expect("kernel");

        // Assert
        assert_relative_eq!(kernel.matrix.column(0).sum(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(kernel.matrix.column(1).sum(), 1.0, epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // Binomial blocks each form a complete distribution per grid point.
    //
    // Given
    // -----
    // - Probabilities (0.2, 0.7) and trial counts (2, 5).
    //
    // Expect
    // ------
    // - 9 rows; each block's column sums are 1.
    fn binomial_blocks_are_complete() {
        // Arrange
        let grid = SupportGrid::new(array![0.2, 0.7]).expect("grid");
        let space = SampleSpace::Trials { trials: vec![2, 5] };

        // Act
        let kernel = KernelMatrix::build(Family::Binomial, &grid, &space, false).expect("kernel");

        // Assert
        assert_eq!(kernel.n_rows(), 9);
        let first = kernel.matrix.slice(ndarray::s![0..3, ..]).sum_axis(ndarray::Axis(0));
        let second = kernel.matrix.slice(ndarray::s![3..9, ..]).sum_axis(ndarray::Axis(0));
        for j in 0..2 {
            assert_relative_eq!(first[j], 1.0, epsilon = 1e-12);
            assert_relative_eq!(second[j], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Bins covering the real line carry all Normal mass.
    //
    // Given
    // -----
    // - Mean 0 and 40 unit bins from -20.
    //
    // Expect
    // ------
    // - Column sum ≈ 1 and the bin [0, 1) holds Φ(1) − Φ(0).
    fn normal_bins_use_cdf_differences() {
        // Arrange
        let grid = SupportGrid::new(array![0.0, 1.0]).expect("grid");
        let space = SampleSpace::Bins { lower: -20.0, width: 1.0, bins: 40 };

        // Act
        let kernel = KernelMatrix::build(Family::Normal, &grid, &space, false).expect("kernel");

        // Assert
        assert_relative_eq!(kernel.matrix.column(0).sum(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(kernel.matrix[[20, 0]], 0.341_344_746_068_542_9, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // A sample space from another family is rejected, as are grid points
    // outside the parameter domain.
    //
    // Given
    // -----
    // - A count space with the Binomial family; a Binomial grid above 1.
    //
    // - A count space wider than the supported number of rows.
    //
    // Expect
    // ------
    // - `FamilyMismatch`, then `GridOutsideFamily`, then
    //   `SampleSpaceTooLarge`.
    fn mismatched_inputs_are_rejected() {
        // Arrange
        let grid = SupportGrid::new(array![0.5, 1.5]).expect("grid");
        let counts = SampleSpace::Counts { lower: 0, upper: 3 };
        let trials = SampleSpace::Trials { trials: vec![3] };
        let huge = SampleSpace::Counts { lower: 0, upper: MAX_SAMPLE_SPACE_ROWS };

        // Act / Assert
        assert!(matches!(
            KernelMatrix::build(Family::Binomial, &grid, &counts, false),
            Err(DeconvError::FamilyMismatch { .. })
        ));
        assert!(matches!(
            KernelMatrix::build(Family::Binomial, &grid, &trials, false),
            Err(DeconvError::GridOutsideFamily { index: 1, .. })
        ));
        assert!(matches!(
            KernelMatrix::build(Family::Poisson, &grid, &huge, false),
            Err(DeconvError::SampleSpaceTooLarge { .. })
        ));
    }
}
