//! Empirical-Bayes deconvolution by g-modeling.
//!
//! Purpose
//! -------
//! Estimate a discrete prior `g` on a grid `θ₁ < … < θₘ` from observations
//! `Xᵢ ~ p(· | θᵢ)`, `θᵢ ~ g`, by penalized maximum likelihood over the
//! log-linear family `g = softmax(Qα)`, and report `ĝ` with standard
//! errors, bias, the cumulative `Ĝ`, the `S` statistic and posteriors.
//!
//! Key behaviors
//! -------------
//! - [`core`]: grid, basis, families, observations, kernel, penalty,
//!   mixture workspace and options.
//! - [`models`]: [`DeconvModel`](models::DeconvModel), implementing
//!   `LogLikelihood` with analytic gradient and Hessian.
//! - [`stats`]: covariance, SE, bias and `S` at the optimum.
//! - [`posterior`]: Bayes' rule for single observations and whole tables.
//! - [`batch`]: parallel fits sharing one model.
//! - [`api::fit`]: single-call pipeline.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ĝ` is always on the simplex; it is never clipped or renormalized
//!   after the fit.
//! - Equivalent inputs (raw values vs. the matching histogram) produce the
//!   same histogram and therefore the same fit.
//! - The grid, design matrix and kernel are read-only after construction.
//!
//! Downstream usage
//! ----------------
//! - `use rust_deconv::deconvolution::prelude::*;` then call [`api::fit`],
//!   or build a [`DeconvModel`](models::DeconvModel) for repeated fits.
pub mod api;
pub mod batch;
pub mod core;
pub mod errors;
pub mod models;
pub mod posterior;
pub mod stats;

pub use self::api::fit;
pub use self::errors::{DeconvError, DeconvResult, GridError};

pub mod prelude {
    pub use super::api::fit;
    pub use super::batch::fit_batch;
    pub use super::core::{
        basis::{BasisKind, BasisOptions, DesignMatrix},
        family::Family,
        grid::SupportGrid,
        kernel::KernelMatrix,
        observations::{
            Histogram, MAX_SAMPLE_SPACE_ROWS, Observations, SamplePoint, SampleSpace,
            SampleSpaceOptions,
        },
        options::{CovarianceKind, DeconvOptions},
        penalty::{Penalty, PenaltyKind},
    };
    pub use super::errors::{DeconvError, DeconvResult, GridError};
    pub use super::models::deconv::{DeconvData, DeconvModel};
    pub use super::posterior::{PosteriorTable, posterior};
    pub use super::stats::{CurvatureStatus, FitResult};
}
