//! Observation specs, sample spaces, and histogram aggregation.
//!
//! Purpose
//! -------
//! Accept data in any of the three supported shapes and reduce it to a
//! single canonical form, a [`Histogram`] over a [`SampleSpace`], so that
//! equivalent inputs produce identical kernels and identical fits.
//!
//! Key behaviors
//! -------------
//! - [`Observations::Values`]: raw Poisson counts or Normal values.
//! - [`Observations::Trials`]: paired `(trials nᵢ, successes xᵢ)` for Binomial.
//! - [`Observations::Histogram`]: a pre-aggregated histogram, validated
//!   against the family.
//! - [`Observations::to_histogram`] performs the aggregation, applying the
//!   zero-exclusion, count-bound and Normal-binning settings.
//!
//! Invariants & assumptions
//! ------------------------
//! - Sample-space rows are ordered: counts ascending; Binomial blocks by
//!   ascending trial count, then successes `0..=n`; Normal values ascending;
//!   bins left to right.
//! - Histogram counts are finite, non-negative, and have positive total.
//! - Count and Binomial spaces are dense, so a space may hold at most
//!   [`MAX_SAMPLE_SPACE_ROWS`] rows; larger ranges (e.g. a count of 1e12)
//!   are rejected before anything is allocated.
//!
//! Conventions
//! -----------
//! - Indices in `DomainMismatch` errors refer to the caller's record order
//!   (raw inputs) or histogram row (pre-aggregated input).
use crate::deconvolution::{
    core::family::{Family, as_count},
    errors::{DeconvError, DeconvResult},
};
use ndarray::Array1;
use std::collections::BTreeMap;

/// Largest number of rows a sample space (and so a kernel matrix) may have.
pub const MAX_SAMPLE_SPACE_ROWS: u64 = 1 << 20;

/// One possible observed value; `trials` is set for Binomial points only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub value: f64,
    pub trials: Option<u64>,
}

impl SamplePoint {
    pub fn value(value: f64) -> Self {
        Self { value, trials: None }
    }

    pub fn count(count: u64) -> Self {
        Self { value: count as f64, trials: None }
    }

    pub fn trial(trials: u64, successes: u64) -> Self {
        Self { value: successes as f64, trials: Some(trials) }
    }
}

/// Domain of observable values for one fit.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleSpace {
    /// Poisson counts `lower..=upper`.
    Counts { lower: u64, upper: u64 },
    /// Binomial blocks: for each distinct trial count `n` (ascending), the
    /// successes `0..=n`.
    Trials { trials: Vec<u64> },
    /// Distinct observed Normal values, ascending.
    Values { points: Vec<f64> },
    /// Equal-width Normal bins `[lower + i·width, lower + (i+1)·width)`.
    Bins { lower: f64, width: f64, bins: usize },
}

impl SampleSpace {
    /// Number of rows, saturating at `u64::MAX`.
    pub fn rows(&self) -> u64 {
        match self {
            SampleSpace::Counts { lower, upper } => upper.saturating_sub(*lower).saturating_add(1),
            SampleSpace::Trials { trials } => {
                trials.iter().fold(0u64, |acc, n| acc.saturating_add(n.saturating_add(1)))
            }
            SampleSpace::Values { points } => points.len() as u64,
            SampleSpace::Bins { bins, .. } => *bins as u64,
        }
    }

    pub fn len(&self) -> usize {
        usize::try_from(self.rows()).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Family whose observations live in this space.
    pub fn family(&self) -> Family {
        match self {
            SampleSpace::Counts { .. } => Family::Poisson,
            SampleSpace::Trials { .. } => Family::Binomial,
            SampleSpace::Values { .. } | SampleSpace::Bins { .. } => Family::Normal,
        }
    }

    /// Representative point of every row (bin midpoints for `Bins`).
    pub fn points(&self) -> Vec<SamplePoint> {
        match self {
            SampleSpace::Counts { lower, upper } => (*lower..=*upper).map(SamplePoint::count).collect(),
            SampleSpace::Trials { trials } => trials
                .iter()
                .flat_map(|&n| (0..=n).map(move |x| SamplePoint::trial(n, x)))
                .collect(),
            SampleSpace::Values { points } => points.iter().map(|&v| SamplePoint::value(v)).collect(),
            SampleSpace::Bins { lower, width, bins } => (0..*bins)
                .map(|i| SamplePoint::value(lower + (i as f64 + 0.5) * width))
                .collect(),
        }
    }

    /// Structural checks on a caller-supplied space.
    ///
    /// # Errors
    /// - `InvalidSampleSpace` for an inverted count range or unusable bin
    ///   geometry.
    /// - `DomainMismatch` / `InvalidBins` for malformed trial lists, values
    ///   or a zero bin count.
    /// - `SampleSpaceTooLarge` above [`MAX_SAMPLE_SPACE_ROWS`] rows.
    pub fn validate(&self) -> DeconvResult<()> {
        self.validate_shape()?;
        let rows = self.rows();
        if rows > MAX_SAMPLE_SPACE_ROWS {
            return Err(DeconvError::SampleSpaceTooLarge { rows, limit: MAX_SAMPLE_SPACE_ROWS });
        }
        Ok(())
    }

    fn validate_shape(&self) -> DeconvResult<()> {
        match self {
            SampleSpace::Counts { lower, upper } if upper < lower => {
                Err(DeconvError::InvalidSampleSpace {
                    reason: "count range upper bound is below its lower bound",
                })
            }
            SampleSpace::Trials { trials } => {
                ensure_increasing(
                    trials.iter().map(|&n| n as f64),
                    "trial counts must be strictly increasing",
                )
            }
            SampleSpace::Values { points } => {
                if let Some(index) = points.iter().position(|v| !v.is_finite()) {
                    return Err(DeconvError::DomainMismatch {
                        index,
                        value: points[index],
                        reason: "Normal values must be finite",
                    });
                }
                ensure_increasing(points.iter().copied(), "Normal values must be strictly increasing")
            }
            SampleSpace::Bins { bins: 0, .. } => Err(DeconvError::InvalidBins { bins: 0 }),
            SampleSpace::Bins { lower, width, .. } if !(lower.is_finite() && *width > 0.0) => {
                Err(DeconvError::InvalidSampleSpace {
                    reason: "bins need a finite origin and positive width",
                })
            }
            _ => Ok(()),
        }
    }
}

/// Counts per sample-space row.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub space: SampleSpace,
    pub counts: Array1<f64>,
}

impl Histogram {
    /// # Errors
    /// - Anything [`SampleSpace::validate`] reports.
    /// - `LengthMismatch` if `counts.len() != space.len()`.
    /// - `DomainMismatch` for negative or non-finite counts.
    /// - `EmptyObservations` if the counts sum to zero.
    pub fn new(space: SampleSpace, counts: impl Into<Array1<f64>>) -> DeconvResult<Self> {
        let counts = counts.into();
        space.validate()?;
        if counts.len() != space.len() {
            return Err(DeconvError::LengthMismatch { expected: space.len(), actual: counts.len() });
        }
        if let Some(index) = counts.iter().position(|c| !(c.is_finite() && *c >= 0.0)) {
            return Err(DeconvError::DomainMismatch {
                index,
                value: counts[index],
                reason: "histogram counts must be finite and non-negative",
            });
        }
        if counts.sum() <= 0.0 {
            return Err(DeconvError::EmptyObservations);
        }
        Ok(Self { space, counts })
    }

    pub fn total(&self) -> f64 {
        self.counts.sum()
    }
}

/// Sample-space settings applied during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleSpaceOptions {
    /// Drop zero counts (Poisson only); the kernel is zero-truncated.
    pub ignore_zero: bool,
    /// Upper end of the Poisson count range; defaults to the largest
    /// observed count.
    pub count_bound: Option<u64>,
    /// Bin raw Normal values into this many equal-width bins.
    pub normal_bins: Option<usize>,
}

/// The three accepted input shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Observations {
    Values(Array1<f64>),
    Trials { trials: Vec<u64>, successes: Vec<u64> },
    Histogram(Histogram),
}

impl Observations {
    fn kind(&self) -> &'static str {
        match self {
            Observations::Values(_) => "Raw-value",
            Observations::Trials { .. } => "Trial/success",
            Observations::Histogram(_) => "Histogram",
        }
    }

    /// Aggregate into the canonical histogram for `family`.
    ///
    /// # Errors
    /// - `FamilyMismatch` when the input shape or histogram space does not
    ///   belong to `family`.
    /// - `DomainMismatch` for records outside the sample space.
    /// - `LengthMismatch` for unequal trial/success vectors.
    /// - `EmptyObservations` when nothing is left to fit.
    /// - `SampleSpaceTooLarge` when the dense space would exceed
    ///   [`MAX_SAMPLE_SPACE_ROWS`] rows.
    pub fn to_histogram(&self, family: Family, opts: &SampleSpaceOptions) -> DeconvResult<Histogram> {
        let mismatch = || DeconvError::FamilyMismatch { family: family.name(), observations: self.kind() };
        match (self, family) {
            (Observations::Values(values), Family::Poisson) => poisson_histogram(values, opts),
            (Observations::Values(values), Family::Normal) => match opts.normal_bins {
                Some(bins) => binned_histogram(values, bins),
                None => value_histogram(values),
            },
            (Observations::Trials { trials, successes }, Family::Binomial) => {
                trial_histogram(trials, successes)
            }
            (Observations::Histogram(hist), _) => {
                if hist.space.family() != family {
                    return Err(mismatch());
                }
                match hist.space {
                    SampleSpace::Counts { lower: 0, upper } if opts.ignore_zero => {
                        if upper == 0 {
                            return Err(DeconvError::EmptyObservations);
                        }
                        let counts = hist.counts.slice(ndarray::s![1..]).to_owned();
                        Histogram::new(SampleSpace::Counts { lower: 1, upper }, counts)
                    }
                    _ => Ok(hist.clone()),
                }
            }
            _ => Err(mismatch()),
        }
    }
}

// ---- Helper methods ----

fn poisson_histogram(values: &Array1<f64>, opts: &SampleSpaceOptions) -> DeconvResult<Histogram> {
    let mut counts = Vec::with_capacity(values.len());
    for (index, &v) in values.iter().enumerate() {
        counts.push(as_count(v, index)?);
    }
    let lower = u64::from(opts.ignore_zero);
    let kept: Vec<u64> = counts.iter().copied().filter(|&k| k >= lower).collect();
    let max = kept.iter().copied().max().ok_or(DeconvError::EmptyObservations)?;
    let upper = match opts.count_bound {
        Some(bound) if bound < max => {
            let index = counts.iter().position(|&k| k > bound).unwrap_or(0);
            return Err(DeconvError::DomainMismatch {
                index,
                value: counts[index] as f64,
                reason: "count exceeds the configured count bound",
            });
        }
        Some(bound) => bound,
        None => max,
    };
    let space = SampleSpace::Counts { lower, upper };
    space.validate()?;
    let mut hist = Array1::<f64>::zeros(space.len());
    for k in kept {
        hist[(k - lower) as usize] += 1.0;
    }
    Histogram::new(space, hist)
}

fn value_histogram(values: &Array1<f64>) -> DeconvResult<Histogram> {
    let mut tally: BTreeMap<u64, (f64, f64)> = BTreeMap::new();
    for (index, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(DeconvError::DomainMismatch {
                index,
                value: v,
                reason: "Normal values must be finite",
            });
        }
        tally.entry(order_key(v)).or_insert((v, 0.0)).1 += 1.0;
    }
    if tally.is_empty() {
        return Err(DeconvError::EmptyObservations);
    }
    let (points, counts): (Vec<f64>, Vec<f64>) = tally.into_values().unzip();
    Histogram::new(SampleSpace::Values { points }, counts)
}

fn binned_histogram(values: &Array1<f64>, bins: usize) -> DeconvResult<Histogram> {
    if bins == 0 {
        return Err(DeconvError::InvalidBins { bins });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(DeconvError::DomainMismatch {
            index,
            value: values[index],
            reason: "Normal values must be finite",
        });
    }
    if values.is_empty() {
        return Err(DeconvError::EmptyObservations);
    }
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (lower, width) = if hi > lo { (lo, (hi - lo) / bins as f64) } else { (lo - 0.5, 1.0 / bins as f64) };
    let space = SampleSpace::Bins { lower, width, bins };
    space.validate()?;
    let mut counts = Array1::<f64>::zeros(bins);
    for &v in values.iter() {
        let i = (((v - lower) / width).floor().max(0.0) as usize).min(bins - 1);
        counts[i] += 1.0;
    }
    Histogram::new(space, counts)
}

fn trial_histogram(trials: &[u64], successes: &[u64]) -> DeconvResult<Histogram> {
    if trials.len() != successes.len() {
        return Err(DeconvError::LengthMismatch { expected: trials.len(), actual: successes.len() });
    }
    if let Some(index) = (0..trials.len()).find(|&i| successes[i] > trials[i]) {
        return Err(DeconvError::DomainMismatch {
            index,
            value: successes[index] as f64,
            reason: "successes exceed trials",
        });
    }
    let mut distinct: Vec<u64> = trials.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    let space = SampleSpace::Trials { trials: distinct.clone() };
    space.validate()?;
    let mut offsets = BTreeMap::new();
    let mut offset = 0usize;
    for &n in &distinct {
        offsets.insert(n, offset);
        offset += n as usize + 1;
    }
    let mut counts = Array1::<f64>::zeros(space.len());
    for (&n, &x) in trials.iter().zip(successes) {
        counts[offsets[&n] + x as usize] += 1.0;
    }
    Histogram::new(space, counts)
}

/// Order-preserving integer key for finite floats (0.0 and -0.0 merge).
fn order_key(v: f64) -> u64 {
    let v = if v == 0.0 { 0.0 } else { v };
    let bits = v.to_bits();
    if bits >> 63 == 1 { !bits } else { bits | (1 << 63) }
}

fn ensure_increasing(values: impl Iterator<Item = f64>, reason: &'static str) -> DeconvResult<()> {
    let mut prev = f64::NEG_INFINITY;
    for (index, v) in values.enumerate() {
        if v <= prev {
            return Err(DeconvError::DomainMismatch { index, value: v, reason });
        }
        prev = v;
    }
    Ok(())
}
