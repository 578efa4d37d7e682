//! Error surface for post-fit covariance and standard-error routines.
//!
//! `InferenceError` covers malformed matrices handed to the covariance
//! helpers and wraps optimizer-layer failures (e.g. a finite-difference
//! Hessian that could not be formed). `InferenceResult<T>` is the common
//! return type.
use crate::optimization::errors::OptError;

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    // ---- Matrix shape ----
    /// Matrix is not square or does not match the parameter dimension.
    DimensionMismatch {
        expected: usize,
        found: (usize, usize),
    },

    // ---- Matrix values ----
    /// A matrix entry is NaN or infinite.
    NonFiniteEntry {
        row: usize,
        col: usize,
        value: f64,
    },

    /// Every eigenvalue of the curvature matrix fell below the cutoff.
    ZeroCurvature {
        max_eigenvalue: f64,
    },

    // ---- Optimizer passthrough ----
    Optimization(OptError),

    // ---- Fallback ----
    UnknownError,
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl std::error::Error for InferenceError {}

impl From<OptError> for InferenceError {
    fn from(err: OptError) -> Self {
        InferenceError::Optimization(err)
    }
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Matrix shape ----
            InferenceError::DimensionMismatch { expected, found } => write!(
                f,
                "Inference Error: expected a ({expected}, {expected}) matrix, found {found:?}"
            ),

            // ---- Matrix values ----
            InferenceError::NonFiniteEntry { row, col, value } => {
                write!(f, "Inference Error: non-finite entry {value} at ({row}, {col})")
            }
            InferenceError::ZeroCurvature { max_eigenvalue } => write!(
                f,
                "Inference Error: curvature matrix has no positive eigenvalues (max = {max_eigenvalue})"
            ),

            // ---- Optimizer passthrough ----
            InferenceError::Optimization(err) => write!(f, "Inference Error: {err}"),

            // ---- Fallback ----
            InferenceError::UnknownError => write!(f, "Inference Error: Unknown error occurred"),
        }
    }
}
