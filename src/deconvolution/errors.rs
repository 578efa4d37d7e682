//! Errors for the deconvolution layer (grid and basis checks, observation
//! validation, mixture evaluation, and optimizer/inference failures).
//!
//! [`DeconvError`] is the single error type returned by the public fitting
//! and posterior API; [`GridError`] details why a support grid (or the
//! basis requested on it) was rejected and is wrapped by
//! [`DeconvError::InvalidGrid`].
//!
//! ## Conventions
//! - **Indices are 0-based** and refer to the caller's input order
//!   (grid position, observation position, or histogram row).
//! - Validation failures are raised before any optimization starts.
//! - Non-convergence and singular curvature are *not* errors; they are
//!   reported on the fit result.
use crate::{inference::errors::InferenceError, optimization::errors::OptError};
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Result alias for deconvolution operations.
pub type DeconvResult<T> = Result<T, DeconvError>;

/// Why a support grid (or the basis built on it) is unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Fewer than two support points.
    TooShort { len: usize },

    /// A support point is NaN/±inf.
    NonFinite { index: usize, value: f64 },

    /// `θ[index] ≤ θ[index - 1]`.
    NotIncreasing { index: usize, value: f64 },

    /// Requested basis columns (`df`, plus one for an atom) must be at least
    /// one and strictly fewer than the number of grid points.
    DegreesOfFreedom { df: usize, columns: usize, len: usize },
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::TooShort { len } => {
                write!(f, "grid needs at least 2 points, got {len}")
            }
            GridError::NonFinite { index, value } => {
                write!(f, "grid point {index} is not finite: {value}")
            }
            GridError::NotIncreasing { index, value } => {
                write!(f, "grid point {index} ({value}) is not greater than its predecessor")
            }
            GridError::DegreesOfFreedom { df, columns, len } => write!(
                f,
                "basis with df = {df} needs {columns} columns, which must be in 1..{len} for a \
                 grid of {len} points"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeconvError {
    // ---- Grid, basis and atom ----
    InvalidGrid(GridError),

    /// Atom location is not (within tolerance) a grid point.
    InvalidAtom { value: f64 },

    /// Grid point outside the family's parameter domain
    /// (e.g. a negative Poisson rate or a Binomial probability above 1).
    GridOutsideFamily { index: usize, value: f64, family: &'static str },

    // ---- Observations ----
    /// No observations (or a histogram with zero total count).
    EmptyObservations,

    /// Family name could not be parsed.
    UnknownFamily { name: String },

    /// Observation kind does not fit the family (e.g. trials for Poisson).
    FamilyMismatch { family: &'static str, observations: &'static str },

    /// A record lies outside the family's sample space.
    DomainMismatch { index: usize, value: f64, reason: &'static str },

    /// A single query point (not part of a data set) lies outside the
    /// family's sample space.
    InvalidPoint { value: f64, reason: &'static str },

    /// A caller-supplied sample space is malformed as a whole.
    InvalidSampleSpace { reason: &'static str },

    /// The dense sample space would need more rows than supported.
    SampleSpaceTooLarge { rows: u64, limit: u64 },

    /// Paired or histogram inputs disagree in length.
    LengthMismatch { expected: usize, actual: usize },

    // ---- Options ----
    /// Regularization weight must be finite and non-negative.
    InvalidRegularization { value: f64 },

    /// Normal binning needs at least one bin.
    InvalidBins { bins: usize },

    /// A named option (basis, penalty, covariance) could not be parsed.
    UnknownOption { option: &'static str, name: String },

    // ---- Mixture evaluation ----
    /// Coefficient vector does not match the design matrix.
    CoefficientLengthMismatch { expected: usize, actual: usize },

    /// Coefficient vector contains NaN/±inf.
    NonFiniteCoefficient { index: usize, value: f64 },

    /// Observed sample point has zero (or non-finite) marginal probability.
    InvalidMarginal { row: usize, value: f64 },

    /// Observation has zero marginal probability under the fitted prior,
    /// so its posterior is undefined.
    DegeneratePosterior { value: f64 },

    // ---- Downstream layers ----
    Optimization(OptError),

    Inference(InferenceError),
}

impl std::error::Error for DeconvError {}
impl std::error::Error for GridError {}

impl std::fmt::Display for DeconvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Grid, basis and atom ----
            DeconvError::InvalidGrid(err) => write!(f, "Invalid grid: {err}"),
            DeconvError::InvalidAtom { value } => {
                write!(f, "Atom location {value} is not a grid point")
            }
            DeconvError::GridOutsideFamily { index, value, family } => {
                write!(f, "Grid point {index} ({value}) is outside the {family} parameter domain")
            }

            // ---- Observations ----
            DeconvError::EmptyObservations => write!(f, "No observations supplied"),
            DeconvError::UnknownFamily { name } => {
                write!(f, "Unknown family '{name}': expected Poisson, Normal or Binomial")
            }
            DeconvError::FamilyMismatch { family, observations } => {
                write!(f, "{observations} observations cannot be used with the {family} family")
            }
            DeconvError::DomainMismatch { index, value, reason } => {
                write!(f, "Observation {index} ({value}) is invalid: {reason}")
            }
            DeconvError::InvalidPoint { value, reason } => {
                write!(f, "Sample point {value} is invalid: {reason}")
            }
            DeconvError::InvalidSampleSpace { reason } => {
                write!(f, "Invalid sample space: {reason}")
            }
            DeconvError::SampleSpaceTooLarge { rows, limit } => {
                write!(f, "Sample space needs {rows} rows; at most {limit} are supported")
            }
            DeconvError::LengthMismatch { expected, actual } => {
                write!(f, "Length mismatch: expected {expected}, actual {actual}")
            }

            // ---- Options ----
            DeconvError::InvalidRegularization { value } => {
                write!(f, "Regularization weight {value} must be finite and non-negative")
            }
            DeconvError::InvalidBins { bins } => {
                write!(f, "Number of Normal bins must be positive, got {bins}")
            }
            DeconvError::UnknownOption { option, name } => {
                write!(f, "Unknown {option} '{name}'")
            }

            // ---- Mixture evaluation ----
            DeconvError::CoefficientLengthMismatch { expected, actual } => {
                write!(f, "Coefficient length mismatch: expected {expected}, actual {actual}")
            }
            DeconvError::NonFiniteCoefficient { index, value } => {
                write!(f, "Coefficient {index} is not finite: {value}")
            }
            DeconvError::InvalidMarginal { row, value } => {
                write!(f, "Sample point at row {row} has marginal probability {value}")
            }
            DeconvError::DegeneratePosterior { value } => {
                write!(f, "Observation {value} has zero marginal probability under the fitted prior")
            }

            // ---- Downstream layers ----
            DeconvError::Optimization(err) => write!(f, "Optimization failed: {err}"),
            DeconvError::Inference(err) => write!(f, "{err}"),
        }
    }
}

impl From<GridError> for DeconvError {
    fn from(err: GridError) -> Self {
        DeconvError::InvalidGrid(err)
    }
}

impl From<OptError> for DeconvError {
    fn from(err: OptError) -> Self {
        match err {
            OptError::ThetaLengthMismatch { expected, actual } => {
                DeconvError::CoefficientLengthMismatch { expected, actual }
            }
            OptError::InvalidThetaInput { index, value } => {
                DeconvError::NonFiniteCoefficient { index, value }
            }
            OptError::InvalidMarginal { row, value } => DeconvError::InvalidMarginal { row, value },
            other => DeconvError::Optimization(other),
        }
    }
}

impl From<InferenceError> for DeconvError {
    fn from(err: InferenceError) -> Self {
        DeconvError::Inference(err)
    }
}

#[cfg(feature = "python-bindings")]
impl From<DeconvError> for PyErr {
    fn from(err: DeconvError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
