//! Binning and normal-distribution helpers shared by the fit tests and the
//! plot series.

use serde::Serialize;
use u_numflow::{special, stats};

use crate::config::{BinRule, HistogramBinning};

// ---------------------------------------------------------------------------
// Quantile bins
// ---------------------------------------------------------------------------

/// Quantile bin edges at `0, 1/bins, …, 1` of `data`, with repeated edges
/// removed.
///
/// Ties and low-cardinality data collapse neighbouring quantiles onto the
/// same value; those duplicates are dropped, so fewer than `bins + 1`
/// edges may come back. Quantiles use R-7 linear interpolation.
///
/// # Returns
///
/// `None` if `data` is empty, `bins == 0`, or any value is non-finite.
///
/// # Examples
///
/// ```
/// use defect_fit::distribution::quantile_edges;
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(quantile_edges(&data, 4).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
///
/// let tied = [1.0, 1.0, 1.0, 1.0, 5.0];
/// assert_eq!(quantile_edges(&tied, 4).unwrap(), vec![1.0, 5.0]);
/// ```
pub fn quantile_edges(data: &[f64], bins: usize) -> Option<Vec<f64>> {
    if data.is_empty() || bins == 0 || data.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut edges = (0..=bins)
        .map(|i| stats::quantile(data, i as f64 / bins as f64))
        .collect::<Option<Vec<f64>>>()?;
    // interpolation rounding can leave a later edge a hair below an earlier one
    edges.dedup_by(|later, kept| *later <= *kept);
    Some(edges)
}

/// Counts of `data` per bin defined by ascending `edges`.
///
/// Bins are half-open `[eᵢ, eᵢ₊₁)` except the last, which includes its
/// upper edge. Values outside `[e₀, eₖ]` are not counted.
pub fn bin_counts(data: &[f64], edges: &[f64]) -> Vec<usize> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let n_bins = edges.len() - 1;
    let (first, last) = (edges[0], edges[n_bins]);

    let mut counts = vec![0_usize; n_bins];
    for &x in data {
        if !(x >= first && x <= last) {
            continue;
        }
        // index of the first edge strictly greater than x
        let upper = edges.partition_point(|&e| e <= x);
        let bin = upper.saturating_sub(1).min(n_bins - 1);
        counts[bin] += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// Display histogram
// ---------------------------------------------------------------------------

/// Equal-width histogram normalized to a density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// Bin edges (length = bins + 1).
    pub edges: Vec<f64>,
    /// Raw counts per bin.
    pub counts: Vec<usize>,
    /// `count / (n × width)`; integrates to 1.
    pub densities: Vec<f64>,
}

impl Histogram {
    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }
}

/// Builds a density histogram of `data`.
///
/// Data with zero range is centred in a single unit-width window
/// `[x − 0.5, x + 0.5]`.
///
/// # Returns
///
/// `None` if `data` is empty or contains non-finite values.
///
/// # Examples
///
/// ```
/// use defect_fit::config::HistogramBinning;
/// use defect_fit::distribution::histogram;
///
/// let data = [0.01, 0.02, 0.02, 0.03, 0.05];
/// let h = histogram(&data, HistogramBinning::Fixed(4)).unwrap();
/// assert_eq!(h.n_bins(), 4);
/// assert_eq!(h.counts.iter().sum::<usize>(), 5);
/// ```
pub fn histogram(data: &[f64], binning: HistogramBinning) -> Option<Histogram> {
    let n = data.len();
    if n == 0 || data.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut lo = data.iter().cloned().reduce(f64::min)?;
    let mut hi = data.iter().cloned().reduce(f64::max)?;
    if hi - lo < 1e-300 {
        lo -= 0.5;
        hi += 0.5;
    }
    let range = hi - lo;

    let n_bins = match binning {
        HistogramBinning::Fixed(k) => k,
        HistogramBinning::Rule(rule) => rule_bin_count(data, rule, range),
    }
    .max(1);

    let width = range / n_bins as f64;
    let edges: Vec<f64> = (0..=n_bins)
        .map(|i| if i == n_bins { hi } else { lo + i as f64 * width })
        .collect();
    let counts = bin_counts(data, &edges);
    let densities = counts
        .iter()
        .map(|&c| c as f64 / (n as f64 * width))
        .collect();

    Some(Histogram {
        edges,
        counts,
        densities,
    })
}

/// Upper bound on a rule-derived bin count, unless Sturges asks for more.
///
/// A tiny interquartile range next to an outlier makes Freedman-Diaconis
/// ask for billions of bins.
pub const MAX_RULE_BINS: usize = 1000;

fn sturges(nf: f64) -> usize {
    nf.log2().ceil() as usize + 1
}

// Bin count implied by `rule`, at most max(Sturges, min(n, MAX_RULE_BINS)).
fn rule_bin_count(data: &[f64], rule: BinRule, range: f64) -> usize {
    let nf = data.len() as f64;
    let cap = sturges(nf).max(data.len().min(MAX_RULE_BINS));
    unbounded_rule_bin_count(data, rule, range).min(cap)
}

// Width-based rules fall back to Sturges when their spread estimate is zero.
fn unbounded_rule_bin_count(data: &[f64], rule: BinRule, range: f64) -> usize {
    let nf = data.len() as f64;
    let from_width = |h: f64| (h > 1e-300).then(|| (range / h).ceil() as usize);

    let scott = || {
        stats::std_dev(data).and_then(|sd| from_width(3.49 * sd * nf.powf(-1.0 / 3.0)))
    };
    let freedman_diaconis = || {
        let q1 = stats::quantile(data, 0.25)?;
        let q3 = stats::quantile(data, 0.75)?;
        from_width(2.0 * (q3 - q1) * nf.powf(-1.0 / 3.0))
    };

    match rule {
        BinRule::Sturges => sturges(nf),
        BinRule::Scott => scott().unwrap_or_else(|| sturges(nf)),
        BinRule::FreedmanDiaconis => freedman_diaconis().unwrap_or_else(|| sturges(nf)),
        BinRule::Auto => freedman_diaconis().map_or(sturges(nf), |fd| fd.max(sturges(nf))),
    }
}

// ---------------------------------------------------------------------------
// Normal distribution
// ---------------------------------------------------------------------------

/// Normal density N(μ, σ²) at `x`. Zero when `sigma ≤ 0`.
pub fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if !(sigma > 0.0) {
        return 0.0;
    }
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
}

/// Normal CDF Φ((x − μ)/σ). Degenerates to a step at μ when `sigma ≤ 0`.
pub fn normal_cdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if !(sigma > 0.0) {
        return if x < mu { 0.0 } else { 1.0 };
    }
    special::standard_normal_cdf((x - mu) / sigma)
}

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + i as f64 * step })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Quantile bins
    // -----------------------------------------------------------------------

    #[test]
    fn edges_interpolate() {
        let data = [0.0, 10.0];
        let e = quantile_edges(&data, 4).expect("edges");
        assert_eq!(e, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn edges_collapse_for_constant_data() {
        let e = quantile_edges(&[0.02; 40], 10).expect("edges");
        assert_eq!(e, vec![0.02]);
        assert!(bin_counts(&[0.02; 40], &e).is_empty());
    }

    #[test]
    fn edges_edge_cases() {
        assert!(quantile_edges(&[], 10).is_none());
        assert!(quantile_edges(&[1.0], 0).is_none());
        assert!(quantile_edges(&[1.0, f64::NAN], 2).is_none());
    }

    #[test]
    fn counts_last_bin_closed() {
        let edges = [0.0, 1.0, 2.0, 3.0];
        let data = [0.0, 0.5, 1.0, 2.0, 2.5, 3.0, 3.5, -0.1];
        assert_eq!(bin_counts(&data, &edges), vec![2, 1, 3]);
    }

    // -----------------------------------------------------------------------
    // Histogram
    // -----------------------------------------------------------------------

    #[test]
    fn density_integrates_to_one() {
        let data: Vec<f64> = (0..50).map(|i| 0.01 + (i % 7) as f64 * 0.002).collect();
        let h = histogram(&data, HistogramBinning::Rule(BinRule::Auto)).expect("hist");
        let area: f64 = h
            .densities
            .iter()
            .zip(h.edges.windows(2))
            .map(|(d, w)| d * (w[1] - w[0]))
            .sum();
        assert!((area - 1.0).abs() < 1e-9, "area = {area}");
        assert_eq!(h.edges.len(), h.n_bins() + 1);
    }

    #[test]
    fn constant_data_gets_unit_window() {
        let h = histogram(&[0.05; 6], HistogramBinning::Fixed(15)).expect("hist");
        assert!((h.edges[0] - (-0.45)).abs() < 1e-12);
        assert!((h.edges[15] - 0.55).abs() < 1e-12);
        assert_eq!(h.counts.iter().sum::<usize>(), 6);
    }

    #[test]
    fn sturges_count() {
        let data: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let h = histogram(&data, HistogramBinning::Rule(BinRule::Sturges)).expect("hist");
        assert_eq!(h.n_bins(), 5);
    }

    #[test]
    fn auto_never_fewer_than_sturges() {
        let data: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin()).collect();
        let auto = histogram(&data, HistogramBinning::Rule(BinRule::Auto)).expect("hist");
        let st = histogram(&data, HistogramBinning::Rule(BinRule::Sturges)).expect("hist");
        assert!(auto.n_bins() >= st.n_bins());
    }

    #[test]
    fn outlier_with_tiny_iqr_is_capped() {
        // 50 zeros, 50 rates of 1e-9 and one 1.0: FD alone asks for ~2.3e9 bins
        let mut data = vec![0.0; 50];
        data.extend(std::iter::repeat(1e-9).take(50));
        data.push(1.0);
        let auto = histogram(&data, HistogramBinning::Rule(BinRule::Auto)).expect("hist");
        assert_eq!(auto.n_bins(), 101);
        assert_eq!(auto.counts.iter().sum::<usize>(), 101);
        let fd = histogram(&data, HistogramBinning::Rule(BinRule::FreedmanDiaconis))
            .expect("hist");
        assert_eq!(fd.n_bins(), 101);
    }

    #[test]
    fn rule_cap_bounded_by_max() {
        let data: Vec<f64> = (0..5000).map(|i| if i == 0 { 1.0 } else { (i % 2) as f64 * 1e-9 }).collect();
        let h = histogram(&data, HistogramBinning::Rule(BinRule::Auto)).expect("hist");
        assert_eq!(h.n_bins(), MAX_RULE_BINS);
    }

    #[test]
    fn histogram_edge_cases() {
        assert!(histogram(&[], HistogramBinning::Fixed(3)).is_none());
        assert!(histogram(&[f64::NAN], HistogramBinning::Fixed(3)).is_none());
    }

    // -----------------------------------------------------------------------
    // Normal distribution
    // -----------------------------------------------------------------------

    #[test]
    fn pdf_peak() {
        let peak = normal_pdf(0.0, 0.0, 1.0);
        assert!((peak - 0.398_942_280_401_432_7).abs() < 1e-12);
        assert_eq!(normal_pdf(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn cdf_symmetry() {
        assert!((normal_cdf(5.0, 5.0, 2.0) - 0.5).abs() < 1e-9);
        let lo = normal_cdf(3.0, 5.0, 2.0);
        let hi = normal_cdf(7.0, 5.0, 2.0);
        assert!((lo + hi - 1.0).abs() < 1e-9);
        assert_eq!(normal_cdf(4.0, 5.0, 0.0), 0.0);
    }

    #[test]
    fn linspace_endpoints() {
        let x = linspace(0.0, 0.03, 4);
        assert_eq!(x.len(), 4);
        assert_eq!(x[0], 0.0);
        assert_eq!(x[3], 0.03);
        assert!((x[1] - 0.01).abs() < 1e-15);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn quantile_edges_strictly_increase(
            data in proptest::collection::vec(0.0_f64..0.2, 1..=80),
            bins in 1_usize..20,
        ) {
            let e = quantile_edges(&data, bins).unwrap();
            prop_assert!(!e.is_empty() && e.len() <= bins + 1);
            for w in e.windows(2) {
                prop_assert!(w[0] < w[1], "edges not increasing: {:?}", e);
            }
        }

        #[test]
        fn histogram_counts_every_point(
            data in proptest::collection::vec(0.0_f64..1.0, 1..=100),
            k in 1_usize..30,
        ) {
            let h = histogram(&data, HistogramBinning::Fixed(k)).unwrap();
            prop_assert_eq!(h.counts.iter().sum::<usize>(), data.len());
        }
    }
}
