//! Quantile-binned chi-squared test of defect rates against a fitted normal.
//!
//! Works on per-batch rates rᵢ = defectsᵢ / sizeᵢ rather than raw counts.
//!
//! # Algorithm
//!
//! 1. n < `small_sample_threshold`: Shapiro-Wilk on the rates instead of χ².
//! 2. Edges at the 0, 1/b, …, 1 quantiles of r (duplicates removed).
//! 3. Eⱼ = n · (Φ((uⱼ − μ)/σ) − Φ((lⱼ − μ)/σ)) with the sample mean and
//!    sample standard deviation of the rates.
//! 4. Bins with Eⱼ < `min_expected` are dropped, not merged into neighbours.
//! 5. Fewer than 3 bins left: inconclusive, rates too uniform to test.
//! 6. χ² over the surviving bins, df = m − 3 (μ, σ, and the total).
//!
//! Dropping low-expectation bins discards their mass instead of pooling it.
//! The surviving bins' expected total can then differ from their observed
//! total.

use u_numflow::stats;

use crate::config::{FitConfig, FitMethod};
use crate::dataset::BatchRecord;
use crate::distribution::{bin_counts, normal_cdf, quantile_edges};
use crate::testing;

use super::result::{FitBin, FitReport, FitTestResult, FitWarning, InconclusiveReason};

/// Runs the normal-approximation test.
///
/// Never computes χ² below `small_sample_threshold` batches.
///
/// # Examples
///
/// ```
/// use defect_fit::config::FitConfig;
/// use defect_fit::dataset::Dataset;
/// use defect_fit::fit::{normal_approximation_fit, FitTestResult};
///
/// // 30 identical rates: nothing to bin
/// let d = Dataset::from_pairs(&[200; 30], &[4; 30]).unwrap();
/// let r = normal_approximation_fit(d.records(), &FitConfig::default());
/// assert!(matches!(r.outcome, FitTestResult::Inconclusive { .. }));
/// ```
pub fn normal_approximation_fit(batches: &[BatchRecord], config: &FitConfig) -> FitReport {
    let report = |outcome| FitReport::new(FitMethod::NormalApproximation, config.alpha, outcome);
    let inconclusive = |reason| report(FitTestResult::Inconclusive { reason });

    let rates: Vec<f64> = batches.iter().map(BatchRecord::defect_rate).collect();
    let n = rates.len();
    if n == 0 {
        return inconclusive(InconclusiveReason::NoBatches);
    }

    if n < config.small_sample_threshold {
        tracing::debug!(
            batches = n,
            threshold = config.small_sample_threshold,
            "small sample; using Shapiro-Wilk"
        );
        return match testing::shapiro_wilk_test(&rates) {
            Some(sw) => report(FitTestResult::Normality {
                w: sw.w,
                p_value: sw.p_value,
            }),
            None => inconclusive(InconclusiveReason::NormalityUndefined { samples: n }),
        };
    }

    let min_rate = rates.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_rate = rates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let homogeneous = InconclusiveReason::HomogeneousRates { min_rate, max_rate };

    let mu = stats::mean(&rates).unwrap_or(min_rate);
    let sigma = stats::std_dev(&rates).unwrap_or(0.0);
    if sigma < 1e-300 {
        return inconclusive(homogeneous);
    }

    let Some(edges) = quantile_edges(&rates, config.bins) else {
        return inconclusive(homogeneous);
    };
    let observed = bin_counts(&rates, &edges);

    let nf = n as f64;
    let bins: Vec<FitBin> = edges
        .windows(2)
        .zip(&observed)
        .map(|(w, &obs)| {
            let expected = nf * (normal_cdf(w[1], mu, sigma) - normal_cdf(w[0], mu, sigma));
            FitBin {
                lower: w[0],
                upper: w[1],
                observed: obs,
                expected,
                kept: expected >= config.min_expected,
            }
        })
        .collect();

    let (obs_kept, exp_kept): (Vec<f64>, Vec<f64>) = bins
        .iter()
        .filter(|b| b.kept)
        .map(|b| (b.observed as f64, b.expected))
        .unzip();
    let remaining = obs_kept.len();
    let dropped = bins.len() - remaining;

    let mut warnings = Vec::new();
    if dropped > 0 {
        tracing::warn!(dropped, remaining, "dropped bins with low expected frequency");
        warnings.push(FitWarning::DroppedBins { dropped, remaining });
    }

    let outcome = if remaining < 3 {
        FitTestResult::Inconclusive {
            reason: homogeneous,
        }
    } else {
        match testing::chi_squared_test(&obs_kept, &exp_kept, 2) {
            Some(r) => FitTestResult::Computed {
                chi2_stat: r.statistic,
                degrees_of_freedom: r.df as usize,
                p_value: r.p_value,
            },
            None => FitTestResult::Inconclusive {
                reason: InconclusiveReason::NoDegreesOfFreedom,
            },
        }
    };

    tracing::debug!(batches = n, mu, sigma, bins = bins.len(), remaining, outcome = ?outcome, "normal approximation fit");

    let mut out = report(outcome);
    out.warnings = warnings;
    out.bins = bins;
    out
}
