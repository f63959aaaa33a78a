//! Analysis configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [fit]
//! method = "normal_approximation"
//! alpha = 0.05
//! bins = 10
//!
//! [plot]
//! histogram_bins = 15        # or "auto", "sturges", "scott", "freedman_diaconis"
//! overlay_sigma = "binomial"
//! overlay_cap = 1.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Largest fixed histogram bin count accepted.
pub const MAX_HISTOGRAM_BINS: usize = 100_000;

/// Configuration load or consistency failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// The TOML did not parse into a configuration.
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is outside its allowed range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Goodness-of-fit strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    /// Per-batch chi-squared against `size × p̂`.
    #[default]
    Binomial,
    /// Quantile-binned chi-squared of defect rates against a fitted normal,
    /// with a Shapiro-Wilk fallback for small samples.
    NormalApproximation,
}

/// Unknown fit method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fit method '{0}'; expected 'binomial' or 'normal_approximation'")]
pub struct ParseFitMethodError(pub String);

impl std::str::FromStr for FitMethod {
    type Err = ParseFitMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binomial" => Ok(FitMethod::Binomial),
            "normal_approximation" | "normal" => Ok(FitMethod::NormalApproximation),
            _ => Err(ParseFitMethodError(s.to_string())),
        }
    }
}

/// Named rule for choosing a histogram bin count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinRule {
    /// Larger bin count of Sturges and Freedman-Diaconis.
    Auto,
    /// k = ⌈log₂(n)⌉ + 1.
    Sturges,
    /// h = 3.49·σ·n^(-1/3).
    Scott,
    /// h = 2·IQR·n^(-1/3).
    FreedmanDiaconis,
}

/// Histogram binning for the rate distribution plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistogramBinning {
    /// Fixed number of equal-width bins.
    Fixed(usize),
    /// Bin count from a rule.
    Rule(BinRule),
}

impl Default for HistogramBinning {
    fn default() -> Self {
        HistogramBinning::Rule(BinRule::Auto)
    }
}

/// Spread estimate used for the normal overlay curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlaySigma {
    /// Population standard deviation of the observed rates, centred on their
    /// mean.
    #[default]
    Empirical,
    /// `√(p(1−p)/n̄)` from the pooled rate, centred on the pooled rate.
    Binomial,
}

/// Hypothesis test parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    /// Which test to run.
    #[serde(default)]
    pub method: FitMethod,

    /// Significance level.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Smallest expected frequency considered reliable.
    #[serde(default = "default_min_expected")]
    pub min_expected: f64,

    /// Quantile bins for the normal-approximation test.
    #[serde(default = "default_bins")]
    pub bins: usize,

    /// Below this many batches the normal-approximation test falls back
    /// to Shapiro-Wilk.
    #[serde(default = "default_small_sample_threshold")]
    pub small_sample_threshold: usize,
}

fn default_alpha() -> f64 { 0.05 }
fn default_min_expected() -> f64 { 5.0 }
fn default_bins() -> usize { 10 }
fn default_small_sample_threshold() -> usize { 30 }

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            method: FitMethod::default(),
            alpha: default_alpha(),
            min_expected: default_min_expected(),
            bins: default_bins(),
            small_sample_threshold: default_small_sample_threshold(),
        }
    }
}

/// Plot series parameters. These only shape display ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Histogram bin selection.
    #[serde(default)]
    pub histogram_bins: HistogramBinning,

    /// Fewest batches for which the normal overlay is drawn.
    #[serde(default = "default_min_overlay_samples")]
    pub min_overlay_samples: usize,

    /// Spread estimate for the overlay.
    #[serde(default)]
    pub overlay_sigma: OverlaySigma,

    /// Half-width of the overlay range in sigmas.
    #[serde(default = "default_overlay_k")]
    pub overlay_k: f64,

    /// Upper clamp of the overlay range.
    #[serde(default = "default_overlay_cap")]
    pub overlay_cap: f64,

    /// Points sampled along the overlay curve.
    #[serde(default = "default_curve_points")]
    pub curve_points: usize,
}

fn default_min_overlay_samples() -> usize { 5 }
fn default_overlay_k() -> f64 { 4.0 }
fn default_overlay_cap() -> f64 { 0.03 }
fn default_curve_points() -> usize { 500 }

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            histogram_bins: HistogramBinning::default(),
            min_overlay_samples: default_min_overlay_samples(),
            overlay_sigma: OverlaySigma::default(),
            overlay_k: default_overlay_k(),
            overlay_cap: default_overlay_cap(),
            curve_points: default_curve_points(),
        }
    }
}

/// Complete analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub fit: FitConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

impl AnalysisConfig {
    /// Parses and checks a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(contents)?;
        config.check()?;
        Ok(config)
    }

    /// Loads and checks a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Applies `DEFECT_FIT_ALPHA`, `DEFECT_FIT_METHOD` and `DEFECT_FIT_BINS`,
    /// then re-runs [`check`](Self::check).
    ///
    /// Unparseable values are ignored. If the overridden configuration is
    /// invalid, `self` is left unchanged and the error is returned.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let mut candidate = self.clone();

        if let Ok(alpha) = std::env::var("DEFECT_FIT_ALPHA") {
            if let Ok(val) = alpha.parse() {
                candidate.fit.alpha = val;
            }
        }

        if let Ok(method) = std::env::var("DEFECT_FIT_METHOD") {
            match method.parse() {
                Ok(val) => candidate.fit.method = val,
                Err(e) => tracing::warn!("ignoring DEFECT_FIT_METHOD: {e}"),
            }
        }

        if let Ok(bins) = std::env::var("DEFECT_FIT_BINS") {
            if let Ok(val) = bins.parse() {
                candidate.fit.bins = val;
            }
        }

        candidate.check()?;
        *self = candidate;
        Ok(())
    }

    /// Rejects values no analysis can run with.
    pub fn check(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });

        if !(self.fit.alpha > 0.0 && self.fit.alpha < 1.0) {
            return invalid("fit.alpha", "must lie in (0, 1)");
        }
        if !(self.fit.min_expected > 0.0) {
            return invalid("fit.min_expected", "must be positive");
        }
        if self.fit.bins == 0 {
            return invalid("fit.bins", "must be at least 1");
        }
        if let HistogramBinning::Fixed(k) = self.plot.histogram_bins {
            if k == 0 {
                return invalid("plot.histogram_bins", "must be at least 1");
            }
            if k > MAX_HISTOGRAM_BINS {
                return invalid("plot.histogram_bins", "must be at most 100000");
            }
        }
        if !(self.plot.overlay_k > 0.0) {
            return invalid("plot.overlay_k", "must be positive");
        }
        if !(self.plot.overlay_cap > 0.0) {
            return invalid("plot.overlay_cap", "must be positive");
        }
        if self.plot.curve_points < 2 {
            return invalid("plot.curve_points", "must be at least 2");
        }
        Ok(())
    }
}
