//! Core building blocks of a deconvolution fit.
//!
//! - [`grid`]: validated support grid `θ₁ < … < θₘ`.
//! - [`basis`]: design matrix `Q` (natural spline or polynomial, optional
//!   atom column).
//! - [`family`]: Poisson / Normal / Binomial kernels `p(x | θ)`.
//! - [`observations`]: input shapes, sample spaces and histogram
//!   aggregation.
//! - [`kernel`]: kernel matrix `P` over sample space × grid.
//! - [`penalty`]: norm and ridge penalties on `α`.
//! - [`workspace`]: `g`, `f`, log-likelihood and derivatives at one `α`.
//! - [`options`]: fit configuration.
pub mod basis;
pub mod family;
pub mod grid;
pub mod kernel;
pub mod observations;
pub mod options;
pub mod penalty;
pub mod workspace;
