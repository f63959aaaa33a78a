//! Goodness-of-fit testing of defect data.
//!
//! Two interchangeable tests, selected by [`FitMethod`]:
//!
//! - [`binomial_fit`] — per-batch χ² of defect counts against `size × p̂`
//! - [`normal_approximation_fit`] — quantile-binned χ² of defect rates
//!   against a fitted normal, with a Shapiro-Wilk fallback below
//!   `small_sample_threshold` batches
//!
//! Neither test fails on validated input: degenerate data yields
//! [`FitTestResult::Inconclusive`] with a reason.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - Cochran, W.G. (1954). "Some methods for strengthening the common χ² tests".
//!   Biometrics, 10(4), 417–451.

mod binomial;
mod normal;
mod result;

pub use binomial::{binomial_fit, expected_defects};
pub use normal::normal_approximation_fit;
pub use result::{FitBin, FitReport, FitTestResult, FitWarning, InconclusiveReason, Verdict};

use crate::aggregate::AggregateStats;
use crate::config::{FitConfig, FitMethod};
use crate::dataset::Dataset;

/// Runs the test chosen by `config.method`.
pub fn run_fit(dataset: &Dataset, stats: &AggregateStats, config: &FitConfig) -> FitReport {
    match config.method {
        FitMethod::Binomial => binomial_fit(dataset.records(), stats.avg_defect_rate, config),
        FitMethod::NormalApproximation => normal_approximation_fit(dataset.records(), config),
    }
}
