use argmin::core::{ArgminError, Error};

use crate::deconvolution::errors::DeconvError;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Derivatives ----
    /// Implies that FD should be used
    GradientNotImplemented,

    /// Implies that an FD Hessian of the gradient should be used
    HessianNotImplemented,

    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- MLEOptions ----
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    /// Cost change tolerance needs to be positive and finite.
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// At least one tolerance must be provided.
    NoTolerancesProvided,

    /// Invalid line searcher name.
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },

    /// Invalid solver name.
    InvalidSolver {
        name: String,
        reason: &'static str,
    },

    /// lbfgs_mem needs to be at least 1.
    InvalidLBFGSMem {
        mem: usize,
        reason: &'static str,
    },

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Theta hat is missing
    MissingThetaHat,

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Finite Diffs ----
    /// Hessian matrix dimensions do not match parameter dimensions.
    HessianDimMismatch {
        expected: usize,
        found: (usize, usize),
    },

    /// Hessian values need to be finite.
    InvalidHessian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Mixture likelihood ----
    /// Coefficient vector length does not match the design matrix.
    ThetaLengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// Unconstrained optimization input must have finite values.
    InvalidThetaInput {
        index: usize,
        value: f64,
    },

    /// An observed sample point received zero (or non-finite) marginal probability.
    InvalidMarginal {
        row: usize,
        value: f64,
    },

    /// Any other model-side failure surfaced during optimization.
    ModelFailure {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl OptError {
    /// `true` for failures that only say the trial point lies outside the
    /// model's domain (non-finite coefficients, an impossible marginal or a
    /// non-finite log-likelihood). Line searches treat such points as
    /// rejected steps instead of aborting the run.
    pub fn is_out_of_domain(&self) -> bool {
        matches!(
            self,
            OptError::InvalidThetaInput { .. }
                | OptError::InvalidMarginal { .. }
                | OptError::NonFiniteCost { .. }
        )
    }
}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Derivatives ----
            OptError::GradientNotImplemented => {
                write!(f, "Gradient optimization not implemented")
            }
            OptError::HessianNotImplemented => {
                write!(f, "Analytic Hessian not implemented")
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- MLEOptions ----
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost function change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "No tolerances provided")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidSolver { name, reason } => {
                write!(f, "Invalid solver '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => {
                write!(f, "Missing estimated parameters (theta hat)")
            }

            // ---- Argmin ----
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Finite Diffs ----
            OptError::HessianDimMismatch { expected, found } => {
                write!(
                    f,
                    "Hessian dimension mismatch: expected ({expected}, {expected}), found {found:?}"
                )
            }
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Invalid Hessian at ({row}, {col}): {value}, must be finite")
            }

            // ---- Mixture likelihood ----
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Coefficient length mismatch: expected {expected}, actual {actual}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid coefficient at index {index}: {value}, must be finite")
            }
            OptError::InvalidMarginal { row, value } => {
                write!(
                    f,
                    "Observed sample point at row {row} has marginal probability {value}, must be > 0"
                )
            }
            OptError::ModelFailure { text } => {
                write!(f, "Model failure: {text}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(opt_err) => match opt_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<DeconvError> for OptError {
    fn from(err: DeconvError) -> Self {
        match err {
            DeconvError::CoefficientLengthMismatch { expected, actual } => {
                OptError::ThetaLengthMismatch { expected, actual }
            }
            DeconvError::NonFiniteCoefficient { index, value } => {
                OptError::InvalidThetaInput { index, value }
            }
            DeconvError::InvalidMarginal { row, value } => OptError::InvalidMarginal { row, value },
            DeconvError::Optimization(inner) => inner,
            other => OptError::ModelFailure { text: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Round-tripping `OptError` through `argmin::core::Error`.
    // - Mapping of `ArgminError` variants and mixture-model errors.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Errors raised inside the adapter travel through argmin as `anyhow`
    // errors; converting back must recover the original variant.
    //
    // Given
    // -----
    // - `OptError::NonFiniteCost` converted into `argmin::core::Error`.
    //
    // Expect
    // ------
    // - `OptError::from` returns the identical variant.
    fn opt_error_round_trips_through_argmin_error() {
        // Arrange
        let original = OptError::NonFiniteCost { value: f64::INFINITY };
        let wrapped: Error = original.clone().into();

        // Act
        let recovered = OptError::from(wrapped);

        // Assert
        assert_eq!(recovered, original);
    }

    #[test]
    // Purpose
    // -------
    // Ensure that argmin's own error enum is mapped variant-by-variant.
    //
    // Given
    // -----
    // - `ArgminError::NotInitialized` wrapped in `argmin::core::Error`.
    //
    // Expect
    // ------
    // - `OptError::NotInitialized` with the same text.
    fn argmin_error_maps_to_matching_variant() {
        // Arrange
        let wrapped: Error = ArgminError::NotInitialized { text: "no param".to_string() }.into();

        // Act
        let mapped = OptError::from(wrapped);

        // Assert
        assert_eq!(mapped, OptError::NotInitialized { text: "no param".to_string() });
    }

    #[test]
    // Purpose
    // -------
    // Mixture-model failures must keep their row information when they
    // surface through the optimizer.
    //
    // Given
    // -----
    // - `DeconvError::InvalidMarginal { row: 3, value: 0.0 }`.
    //
    // Expect
    // ------
    // - `OptError::InvalidMarginal { row: 3, value: 0.0 }`.
    fn deconv_marginal_error_maps_to_invalid_marginal() {
        // Arrange
        let err = DeconvError::InvalidMarginal { row: 3, value: 0.0 };

        // Act
        let mapped = OptError::from(err);

        // Assert
        assert_eq!(mapped, OptError::InvalidMarginal { row: 3, value: 0.0 });
    }

    #[test]
    // Purpose
    // -------
    // Only trial-point domain failures are classified as out of domain.
    //
    // Given
    // -----
    // - A non-finite coefficient and an impossible marginal (both via
    //   `DeconvError`), a non-finite cost, a model failure and a backend error.
    //
    // Expect
    // ------
    // - The first three are out of domain; the last two are not.
    fn domain_failures_are_classified() {
        // Arrange
        let domain = [
            OptError::from(DeconvError::NonFiniteCoefficient { index: 0, value: f64::NAN }),
            OptError::from(DeconvError::InvalidMarginal { row: 1, value: 0.0 }),
            OptError::NonFiniteCost { value: f64::NEG_INFINITY },
        ];
        let fatal = [
            OptError::ModelFailure { text: "broken".to_string() },
            OptError::BackendError { text: "broken".to_string() },
        ];

        // Act / Assert
        assert!(domain.iter().all(OptError::is_out_of_domain));
        assert!(!fatal.iter().any(OptError::is_out_of_domain));
    }
}
