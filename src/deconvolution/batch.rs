//! Parallel fits of many independent samples against one model.
//!
//! The model (grid, design matrix, penalty, options) is shared read-only;
//! each sample gets its own histogram, kernel and optimizer run on the
//! rayon pool. Results come back in input order, one `Result` per sample,
//! so a bad sample does not abort the batch.
use crate::deconvolution::{
    core::observations::Observations, errors::DeconvResult, models::deconv::DeconvModel,
    stats::FitResult,
};
use rayon::prelude::*;

pub fn fit_batch(model: &DeconvModel, samples: &[Observations]) -> Vec<DeconvResult<FitResult>> {
    samples
        .par_iter()
        .map(|obs| {
            let data = model.prepare(obs)?;
            let (_, fit) = model.fit_data(&data)?;
            Ok(fit)
        })
        .collect()
}
