//! Design matrix `Q` for the log-linear prior model `g = softmax(Qα)`.
//!
//! Purpose
//! -------
//! Build the smooth column space the prior is allowed to move in, plus an
//! optional point-mass column.
//!
//! Key behaviors
//! -------------
//! - [`BasisKind::NaturalSpline`]: natural cubic spline in truncated-power
//!   form with `df + 1` knots at equally spaced quantiles of the grid
//!   (boundary knots at the grid ends). Linear beyond the boundary knots by
//!   construction, which is what keeps tails of `g` from oscillating.
//! - [`BasisKind::Polynomial`]: orthonormal polynomials of degree `1..=df`
//!   on the grid, from modified Gram–Schmidt.
//! - Standardization centers every smooth column and scales it to unit sum
//!   of squares across grid rows.
//! - An atom appends the raw indicator column `1{θ = θ₀}` after
//!   standardization.
//!
//! Invariants & assumptions
//! ------------------------
//! - No intercept column: it is not identified under softmax.
//! - `1 ≤ df` and `df + atom < m`; otherwise
//!   [`GridError::DegreesOfFreedom`].
//! - The grid is rescaled to `[0, 1]` (spline) or `[-1, 1]` (polynomial)
//!   before evaluation, so the raw basis does not depend on grid units.
use crate::deconvolution::{
    core::grid::SupportGrid,
    errors::{DeconvError, DeconvResult, GridError},
};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::str::FromStr;

/// Smallest column norm that is still rescaled during standardization.
const MIN_COLUMN_NORM: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BasisKind {
    #[default]
    NaturalSpline,
    Polynomial,
}

impl FromStr for BasisKind {
    type Err = DeconvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ns" | "spline" | "natural_spline" | "naturalspline" => Ok(BasisKind::NaturalSpline),
            "poly" | "polynomial" => Ok(BasisKind::Polynomial),
            _ => Err(DeconvError::UnknownOption { option: "basis", name: s.to_string() }),
        }
    }
}

/// Basis configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisOptions {
    pub kind: BasisKind,
    /// Number of smooth columns.
    pub df: usize,
    pub standardize: bool,
}

impl BasisOptions {
    pub fn new(kind: BasisKind, df: usize, standardize: bool) -> Self {
        Self { kind, df, standardize }
    }
}

impl Default for BasisOptions {
    fn default() -> Self {
        Self { kind: BasisKind::NaturalSpline, df: 5, standardize: true }
    }
}

/// `Q` (m × p) and the index of the atom column, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    pub q: Array2<f64>,
    pub atom_column: Option<usize>,
}

impl DesignMatrix {
    /// Build `Q` on `grid`, optionally with an atom at `atom`.
    ///
    /// # Errors
    /// - `InvalidGrid(DegreesOfFreedom)` if `df == 0` or there are not more
    ///   grid points than columns.
    /// - `InvalidAtom` if `atom` is not a grid point.
    pub fn build(grid: &SupportGrid, opts: &BasisOptions, atom: Option<f64>) -> DeconvResult<Self> {
        let m = grid.len();
        let columns = opts.df + usize::from(atom.is_some());
        if opts.df == 0 || columns >= m {
            return Err(GridError::DegreesOfFreedom { df: opts.df, columns, len: m }.into());
        }
        let atom_row = match atom {
            Some(value) => Some(grid.position(value).ok_or(DeconvError::InvalidAtom { value })?),
            None => None,
        };

        let mut smooth = match opts.kind {
            BasisKind::NaturalSpline => natural_spline(grid.values(), opts.df),
            BasisKind::Polynomial => orthogonal_polynomial(grid.values(), opts.df),
        };
        if opts.standardize {
            standardize_columns(&mut smooth);
        }

        let Some(row) = atom_row else {
            return Ok(Self { q: smooth, atom_column: None });
        };
        let mut q = Array2::<f64>::zeros((m, columns));
        q.slice_mut(ndarray::s![.., ..opts.df]).assign(&smooth);
        q[[row, opts.df]] = 1.0;
        Ok(Self { q, atom_column: Some(opts.df) })
    }

    pub fn n_grid(&self) -> usize {
        self.q.nrows()
    }

    pub fn n_coef(&self) -> usize {
        self.q.ncols()
    }

    /// Linear predictor `η = Qα`.
    pub fn eta(&self, alpha: ArrayView1<f64>) -> Array1<f64> {
        self.q.dot(&alpha)
    }
}

// ---- Column constructors ----

fn natural_spline(theta: ArrayView1<f64>, df: usize) -> Array2<f64> {
    let u = rescale(theta, 0.0, 1.0);
    let n_knots = df + 1;
    let knots: Vec<f64> =
        (0..n_knots).map(|i| quantile_sorted(u.view(), i as f64 / df as f64)).collect();
    let last = n_knots - 1;
    let boundary = knots[last];
    let d = |k: usize, x: f64| {
        let cube = |v: f64| v.max(0.0).powi(3);
        (cube(x - knots[k]) - cube(x - boundary)) / (boundary - knots[k])
    };

    let mut out = Array2::<f64>::zeros((u.len(), df));
    for (i, &x) in u.iter().enumerate() {
        out[[i, 0]] = x;
        for k in 0..last.saturating_sub(1) {
            out[[i, k + 1]] = d(k, x) - d(last - 1, x);
        }
    }
    out
}

fn orthogonal_polynomial(theta: ArrayView1<f64>, df: usize) -> Array2<f64> {
    let u = rescale(theta, -1.0, 1.0);
    let m = u.len();
    let mut basis: Vec<Array1<f64>> = vec![Array1::from_elem(m, 1.0 / (m as f64).sqrt())];
    for power in 1..=df {
        let mut col = u.mapv(|x| x.powi(power as i32));
        for prev in &basis {
            let proj = col.dot(prev);
            col.scaled_add(-proj, prev);
        }
        let norm = col.dot(&col).sqrt();
        if norm > MIN_COLUMN_NORM {
            col /= norm;
        }
        basis.push(col);
    }
    let mut out = Array2::<f64>::zeros((m, df));
    for (j, col) in basis.iter().skip(1).enumerate() {
        out.column_mut(j).assign(col);
    }
    out
}

fn standardize_columns(q: &mut Array2<f64>) {
    for mut col in q.axis_iter_mut(Axis(1)) {
        let mean = col.mean().unwrap_or(0.0);
        col -= mean;
        let norm = col.dot(&col).sqrt();
        if norm > MIN_COLUMN_NORM {
            col /= norm;
        }
    }
}

fn rescale(theta: ArrayView1<f64>, lo: f64, hi: f64) -> Array1<f64> {
    let (min, max) = (theta[0], theta[theta.len() - 1]);
    theta.mapv(|t| lo + (hi - lo) * (t - min) / (max - min))
}

/// Linearly interpolated quantile of an ascending sample.
fn quantile_sorted(x: ArrayView1<f64>, p: f64) -> f64 {
    let h = (x.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(x.len() - 1);
    x[lo] + (h - lo as f64) * (x[hi] - x[lo])
}
