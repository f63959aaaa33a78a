//! Numeric series for charts.
//!
//! Renderers receive data, never images:
//!
//! - [`ComparisonSeries`] — observed vs expected defects per batch
//! - [`DistributionSeries`] — density histogram of defect rates with an
//!   optional fitted normal curve
//!
//! The overlay range `[max(0, μ − kσ), min(cap, μ + kσ)]` is a display
//! heuristic only.

use serde::Serialize;
use u_numflow::stats;

use crate::aggregate::AggregateStats;
use crate::config::{OverlaySigma, PlotConfig};
use crate::dataset::Dataset;
use crate::distribution::{histogram, linspace, normal_pdf, Histogram};
use crate::fit::expected_defects;

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// One bar of the observed-vs-expected chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonPoint {
    /// 1-based batch number.
    pub index: usize,
    pub observed: u64,
    pub expected: f64,
    /// `observed > expected`; used for emphasis only.
    pub above_expectation: bool,
}

/// Observed defects against `size × avg_defect_rate` for every batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSeries {
    pub points: Vec<ComparisonPoint>,
}

/// Builds the comparison series.
///
/// # Examples
///
/// ```
/// use defect_fit::aggregate::aggregate;
/// use defect_fit::dataset::Dataset;
/// use defect_fit::plot::comparison_series;
///
/// let d = Dataset::from_pairs(&[100, 100], &[2, 8]).unwrap();
/// let s = comparison_series(&d, &aggregate(&d));
/// assert!(!s.points[0].above_expectation);
/// assert!(s.points[1].above_expectation);
/// ```
pub fn comparison_series(dataset: &Dataset, summary: &AggregateStats) -> ComparisonSeries {
    let expected = expected_defects(dataset.records(), summary.avg_defect_rate);
    let points = dataset
        .records()
        .iter()
        .zip(expected)
        .enumerate()
        .map(|(i, (record, expected))| ComparisonPoint {
            index: i + 1,
            observed: record.defect_count,
            expected,
            above_expectation: record.defect_count as f64 > expected,
        })
        .collect();

    ComparisonSeries { points }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Population standard deviation (divisor n) of observed rates.
///
/// This is the spread of the rates actually drawn, not an estimate for a
/// wider population. The normal-approximation test uses the n − 1 form.
///
/// `None` for fewer than 2 rates.
pub fn empirical_sigma(rates: &[f64]) -> Option<f64> {
    let n = rates.len() as f64;
    stats::std_dev(rates).map(|sd| sd * ((n - 1.0) / n).sqrt())
}

/// Binomial standard error of a proportion, `√(p(1−p)/n̄)`.
///
/// `None` unless `0 ≤ rate ≤ 1` and `mean_batch_size > 0`.
pub fn binomial_sigma(rate: f64, mean_batch_size: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&rate) || !(mean_batch_size > 0.0) {
        return None;
    }
    Some((rate * (1.0 - rate) / mean_batch_size).sqrt())
}

/// Fitted normal curve over the rate histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalOverlay {
    /// Estimator that produced `sigma`.
    pub sigma_kind: OverlaySigma,
    pub mu: f64,
    pub sigma: f64,
    /// Evenly spaced rates across the clamped range.
    pub x: Vec<f64>,
    /// N(mu, sigma²) density at each `x`.
    pub density: Vec<f64>,
}

/// Rate histogram plus optional overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSeries {
    /// `None` for an empty dataset.
    pub histogram: Option<Histogram>,
    /// `None` below `min_overlay_samples` batches, for zero spread, or when
    /// the clamped range is empty.
    pub overlay: Option<NormalOverlay>,
}

/// Builds the rate distribution series.
pub fn distribution_series(
    dataset: &Dataset,
    summary: &AggregateStats,
    config: &PlotConfig,
) -> DistributionSeries {
    let rates = dataset.defect_rates();
    DistributionSeries {
        histogram: histogram(&rates, config.histogram_bins),
        overlay: normal_overlay(&rates, summary, config),
    }
}

fn normal_overlay(rates: &[f64], summary: &AggregateStats, config: &PlotConfig) -> Option<NormalOverlay> {
    if rates.len() < config.min_overlay_samples.max(1) {
        return None;
    }

    let (mu, sigma) = match config.overlay_sigma {
        OverlaySigma::Empirical => (stats::mean(rates)?, empirical_sigma(rates)?),
        OverlaySigma::Binomial => (
            summary.avg_defect_rate,
            binomial_sigma(summary.avg_defect_rate, summary.mean_batch_size()?)?,
        ),
    };
    if !(sigma > 1e-300) {
        return None;
    }

    let k = config.overlay_k;
    let lo = (mu - k * sigma).max(0.0);
    let hi = (mu + k * sigma).min(config.overlay_cap);
    if !(hi > lo) {
        tracing::debug!(mu, sigma, cap = config.overlay_cap, "overlay range empty after clamping");
        return None;
    }

    let x = linspace(lo, hi, config.curve_points);
    let density = x.iter().map(|&xi| normal_pdf(xi, mu, sigma)).collect();

    Some(NormalOverlay {
        sigma_kind: config.overlay_sigma,
        mu,
        sigma,
        x,
        density,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::config::HistogramBinning;

    fn dataset() -> Dataset {
        Dataset::from_pairs(
            &[1000, 1000, 1000, 1000, 1000, 1000],
            &[10, 12, 8, 15, 11, 9],
        )
        .expect("valid")
    }

    #[test]
    fn comparison_flags() {
        let d = Dataset::from_pairs(&[100, 200, 100], &[5, 5, 10]).expect("valid");
        let s = comparison_series(&d, &aggregate(&d));
        // p̂ = 20/400 = 0.05
        let expected: Vec<f64> = s.points.iter().map(|p| p.expected).collect();
        assert_eq!(expected, vec![5.0, 10.0, 5.0]);
        let flags: Vec<bool> = s.points.iter().map(|p| p.above_expectation).collect();
        assert_eq!(flags, vec![false, false, true]);
        assert_eq!(s.points[2].index, 3);
    }

    #[test]
    fn sigma_estimators_differ() {
        let rates = [0.01, 0.012, 0.008, 0.015, 0.011, 0.009];
        let emp = empirical_sigma(&rates).expect("n >= 2");
        let mean = rates.iter().sum::<f64>() / 6.0;
        let population = (rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 6.0).sqrt();
        assert!((emp - population).abs() < 1e-15, "sigma = {emp}");
        assert!(emp < stats::std_dev(&rates).expect("n >= 2"));
        let bin = binomial_sigma(0.0108333, 1000.0).expect("valid");
        assert!((bin - (0.0108333_f64 * (1.0 - 0.0108333) / 1000.0).sqrt()).abs() < 1e-15);
        assert!(emp > 0.0 && bin > 0.0);
        assert!((emp - bin).abs() > 1e-6);
        assert!(binomial_sigma(1.5, 10.0).is_none());
        assert!(binomial_sigma(0.1, 0.0).is_none());
        assert!(empirical_sigma(&[0.1]).is_none());
    }

    #[test]
    fn empirical_overlay_clamped() {
        let d = dataset();
        let cfg = PlotConfig::default();
        let series = distribution_series(&d, &aggregate(&d), &cfg);
        let o = series.overlay.expect("six batches");
        assert_eq!(o.x.len(), 500);
        assert!(o.x[0] >= 0.0);
        assert!(*o.x.last().unwrap() <= 0.03);
        assert_eq!(o.sigma_kind, OverlaySigma::Empirical);
        let peak = o.density.iter().cloned().fold(0.0, f64::max);
        assert!((peak - normal_pdf(o.mu, o.mu, o.sigma)).abs() / peak < 1e-2);
    }

    #[test]
    fn binomial_overlay_centred_on_pooled_rate() {
        let d = dataset();
        let s = aggregate(&d);
        let cfg = PlotConfig {
            overlay_sigma: OverlaySigma::Binomial,
            overlay_k: 3.0,
            overlay_cap: 1.0,
            curve_points: 100,
            ..PlotConfig::default()
        };
        let o = distribution_series(&d, &s, &cfg).overlay.expect("overlay");
        assert_eq!(o.mu, s.avg_defect_rate);
        let expected_sigma = (s.avg_defect_rate * (1.0 - s.avg_defect_rate) / 1000.0).sqrt();
        assert!((o.sigma - expected_sigma).abs() < 1e-15);
        assert_eq!(o.x.len(), 100);
    }

    #[test]
    fn overlay_needs_five_batches() {
        let d = Dataset::from_pairs(&[100, 100, 100, 100], &[1, 2, 3, 4]).expect("valid");
        let series = distribution_series(&d, &aggregate(&d), &PlotConfig::default());
        assert!(series.histogram.is_some());
        assert!(series.overlay.is_none());
    }

    #[test]
    fn overlay_skipped_for_zero_spread() {
        let d = Dataset::from_pairs(&[100; 8], &[2; 8]).expect("valid");
        let series = distribution_series(&d, &aggregate(&d), &PlotConfig::default());
        assert!(series.overlay.is_none());
    }

    #[test]
    fn overlay_skipped_when_above_cap() {
        // rates around 50% lie entirely above the 3% cap
        let d = Dataset::from_pairs(&[100; 6], &[48, 50, 52, 49, 51, 50]).expect("valid");
        let series = distribution_series(&d, &aggregate(&d), &PlotConfig::default());
        assert!(series.overlay.is_none());
    }

    #[test]
    fn fixed_histogram_bins() {
        let d = dataset();
        let cfg = PlotConfig {
            histogram_bins: HistogramBinning::Fixed(15),
            ..PlotConfig::default()
        };
        let h = distribution_series(&d, &aggregate(&d), &cfg)
            .histogram
            .expect("histogram");
        assert_eq!(h.n_bins(), 15);
    }

    #[test]
    fn empty_dataset_has_no_series() {
        let d = Dataset::default();
        let s = aggregate(&d);
        assert!(comparison_series(&d, &s).points.is_empty());
        let series = distribution_series(&d, &s, &PlotConfig::default());
        assert!(series.histogram.is_none());
        assert!(series.overlay.is_none());
    }
}
