//! Per-batch binomial chi-squared test.
//!
//! H₀: every batch draws defects from the same binomial rate p̂, the pooled
//! rate of the dataset.
//!
//! # Formulas
//!
//! - Eᵢ = sizeᵢ · p̂
//! - χ² = Σ (Oᵢ − Eᵢ)² / Eᵢ
//! - df = k − 2 (one constraint, one estimated parameter)
//!
//! Expected counts below `min_expected` make the χ² approximation
//! unreliable. They raise a [`FitWarning`] but the test still runs.

use crate::config::{FitConfig, FitMethod};
use crate::dataset::BatchRecord;
use crate::testing;

use super::result::{FitReport, FitTestResult, FitWarning, InconclusiveReason};

/// Expected defect count `size × rate` of every batch.
pub fn expected_defects(batches: &[BatchRecord], avg_defect_rate: f64) -> Vec<f64> {
    batches
        .iter()
        .map(|b| b.size as f64 * avg_defect_rate)
        .collect()
}

/// Runs the binomial chi-squared test.
///
/// # Examples
///
/// ```
/// use defect_fit::config::FitConfig;
/// use defect_fit::dataset::Dataset;
/// use defect_fit::fit::{binomial_fit, FitTestResult};
///
/// let d = Dataset::from_pairs(&[100, 100, 100], &[5, 5, 5]).unwrap();
/// let report = binomial_fit(d.records(), 0.05, &FitConfig::default());
/// match report.outcome {
///     FitTestResult::Computed { chi2_stat, degrees_of_freedom, .. } => {
///         assert_eq!(chi2_stat, 0.0);
///         assert_eq!(degrees_of_freedom, 1);
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn binomial_fit(batches: &[BatchRecord], avg_defect_rate: f64, config: &FitConfig) -> FitReport {
    let inconclusive = |reason| {
        FitReport::new(
            FitMethod::Binomial,
            config.alpha,
            FitTestResult::Inconclusive { reason },
        )
    };

    let k = batches.len();
    if k == 0 {
        return inconclusive(InconclusiveReason::NoBatches);
    }

    let expected = expected_defects(batches, avg_defect_rate);
    let low: Vec<usize> = expected
        .iter()
        .enumerate()
        .filter(|&(_, &e)| e < config.min_expected)
        .map(|(i, _)| i + 1)
        .collect();

    let mut warnings = Vec::new();
    if !low.is_empty() {
        tracing::warn!(
            batches = low.len(),
            threshold = config.min_expected,
            "expected defect frequency below threshold; chi-squared may be unreliable"
        );
        warnings.push(FitWarning::LowExpectedFrequency {
            batches: low,
            threshold: config.min_expected,
        });
    }

    let mut report = if !(avg_defect_rate > 0.0) {
        inconclusive(InconclusiveReason::NoDefects)
    } else if k < 3 {
        inconclusive(InconclusiveReason::TooFewBatches { batches: k })
    } else {
        let observed: Vec<f64> = batches.iter().map(|b| b.defect_count as f64).collect();
        match testing::chi_squared_test(&observed, &expected, 1) {
            Some(r) => FitReport::new(
                FitMethod::Binomial,
                config.alpha,
                FitTestResult::Computed {
                    chi2_stat: r.statistic,
                    degrees_of_freedom: r.df as usize,
                    p_value: r.p_value,
                },
            ),
            None => inconclusive(InconclusiveReason::TooFewBatches { batches: k }),
        }
    };

    tracing::debug!(batches = k, outcome = ?report.outcome, "binomial fit");
    report.warnings = warnings;
    report
}
