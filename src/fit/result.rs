//! Fit outcomes, warnings, and verdicts shared by both tests.

use std::fmt;

use serde::Serialize;

use crate::config::FitMethod;

/// Outcome of a goodness-of-fit run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitTestResult {
    /// Chi-squared statistic was computed.
    Computed {
        /// Pearson statistic Σ (O − E)² / E.
        chi2_stat: f64,
        /// Categories minus one, minus the estimated parameters.
        degrees_of_freedom: usize,
        /// Upper-tail probability of `chi2_stat`.
        p_value: f64,
    },
    /// Small-sample fallback: Shapiro-Wilk on the defect rates.
    Normality {
        /// Shapiro-Wilk W statistic.
        w: f64,
        p_value: f64,
    },
    /// The test does not apply to this data.
    Inconclusive {
        /// What made the test inapplicable.
        reason: InconclusiveReason,
    },
}

impl FitTestResult {
    /// p-value of whichever test ran.
    pub fn p_value(&self) -> Option<f64> {
        match *self {
            FitTestResult::Computed { p_value, .. } | FitTestResult::Normality { p_value, .. } => {
                Some(p_value)
            }
            FitTestResult::Inconclusive { .. } => None,
        }
    }

    /// Decision at significance level `alpha`.
    pub fn verdict(&self, alpha: f64) -> Option<Verdict> {
        match *self {
            FitTestResult::Computed { p_value, .. } => Some(if p_value < alpha {
                Verdict::Rejected
            } else {
                Verdict::NotRejected
            }),
            FitTestResult::Normality { p_value, .. } => Some(if p_value < alpha {
                Verdict::NotNormal
            } else {
                Verdict::LooksNormal
            }),
            FitTestResult::Inconclusive { .. } => None,
        }
    }

    /// `true` when no statistic was produced.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, FitTestResult::Inconclusive { .. })
    }
}

/// Why a test did not produce a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InconclusiveReason {
    /// Empty dataset.
    NoBatches,
    /// Pooled rate is zero, so every expected count is zero.
    NoDefects,
    /// Binomial test needs at least 3 batches for df ≥ 1.
    TooFewBatches { batches: usize },
    /// Rates vary too little for 3 usable bins. This indicates a stable
    /// process rather than a failure.
    HomogeneousRates { min_rate: f64, max_rate: f64 },
    /// Exactly 3 bins survived, leaving no degrees of freedom.
    NoDegreesOfFreedom,
    /// Shapiro-Wilk cannot be computed (fewer than 3 rates or all equal).
    NormalityUndefined { samples: usize },
}

impl fmt::Display for InconclusiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InconclusiveReason::NoBatches => f.write_str("No batches to test."),
            InconclusiveReason::NoDefects => {
                f.write_str("No defects observed; the binomial test is not applicable.")
            }
            InconclusiveReason::TooFewBatches { batches } => write!(
                f,
                "At least 3 batches are needed for the chi-squared test ({batches} given)."
            ),
            InconclusiveReason::HomogeneousRates { min_rate, max_rate } => write!(
                f,
                "Defect rates are too uniform to test ({:.2}% to {:.2}%): the process looks stable.",
                min_rate * 100.0,
                max_rate * 100.0
            ),
            InconclusiveReason::NoDegreesOfFreedom => {
                f.write_str("Too few usable bins remain to leave any degrees of freedom.")
            }
            InconclusiveReason::NormalityUndefined { samples } => write!(
                f,
                "Normality test needs at least 3 distinct defect rates ({samples} batches given)."
            ),
        }
    }
}

/// Decision derived from a p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// p < alpha: the model does not hold.
    Rejected,
    /// p ≥ alpha: no evidence against the model.
    NotRejected,
    /// Shapiro-Wilk p ≥ alpha.
    LooksNormal,
    /// Shapiro-Wilk p < alpha.
    NotNormal,
}

/// Non-blocking condition that makes a result less reliable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum FitWarning {
    /// Batches (1-based) whose expected defect count is below the threshold.
    LowExpectedFrequency {
        batches: Vec<usize>,
        threshold: f64,
    },
    /// Bins discarded for low expected frequency.
    DroppedBins { dropped: usize, remaining: usize },
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitWarning::LowExpectedFrequency { batches, threshold } => write!(
                f,
                "Expected frequency below {threshold} in {} batch(es); results may be unreliable.",
                batches.len()
            ),
            FitWarning::DroppedBins { dropped, remaining } => write!(
                f,
                "{dropped} bin(s) with low expected frequency dropped; {remaining} remain."
            ),
        }
    }
}

/// One quantile bin of the normal-approximation test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitBin {
    /// Lower edge (inclusive).
    pub lower: f64,
    /// Upper edge; inclusive only for the last bin.
    pub upper: f64,
    /// Rates falling in the bin.
    pub observed: usize,
    /// `n × (Φ(upper) − Φ(lower))` under the fitted normal.
    pub expected: f64,
    /// Whether the bin entered the statistic.
    pub kept: bool,
}

/// Everything a fit run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    /// Test that produced this report.
    pub method: FitMethod,
    pub outcome: FitTestResult,
    /// Significance level the verdict is taken at.
    pub alpha: f64,
    /// Conditions that weaken the result without blocking it.
    pub warnings: Vec<FitWarning>,
    /// Quantile bins; empty for the binomial test.
    pub bins: Vec<FitBin>,
}

impl FitReport {
    pub(crate) fn new(method: FitMethod, alpha: f64, outcome: FitTestResult) -> Self {
        Self {
            method,
            outcome,
            alpha,
            warnings: Vec::new(),
            bins: Vec::new(),
        }
    }

    /// Verdict at the report's `alpha`; `None` when inconclusive.
    pub fn verdict(&self) -> Option<Verdict> {
        self.outcome.verdict(self.alpha)
    }

    /// Human-readable conclusion.
    pub fn verdict_text(&self) -> String {
        let (subject, model) = match self.method {
            FitMethod::Binomial => ("defect counts", "binomial model"),
            FitMethod::NormalApproximation => ("the data", "normal model of defect rates"),
        };
        match (self.outcome, self.verdict()) {
            (FitTestResult::Inconclusive { reason }, _) => reason.to_string(),
            (FitTestResult::Normality { p_value, .. }, Some(Verdict::LooksNormal)) => {
                format!("Defect rates look normal (Shapiro-Wilk p = {p_value:.4}).")
            }
            (FitTestResult::Normality { p_value, .. }, _) => {
                format!("Defect rates do not look normal (Shapiro-Wilk p = {p_value:.4}).")
            }
            (_, Some(Verdict::Rejected)) => format!(
                "Hypothesis rejected (p < {}): {subject} do not follow the {model}.",
                self.alpha
            ),
            _ => format!("Hypothesis not rejected: {subject} are consistent with the {model}."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computed(p_value: f64) -> FitTestResult {
        FitTestResult::Computed {
            chi2_stat: 1.0,
            degrees_of_freedom: 2,
            p_value,
        }
    }

    #[test]
    fn verdict_threshold() {
        assert_eq!(computed(0.049).verdict(0.05), Some(Verdict::Rejected));
        assert_eq!(computed(0.05).verdict(0.05), Some(Verdict::NotRejected));
        let sw = FitTestResult::Normality {
            w: 0.97,
            p_value: 0.2,
        };
        assert_eq!(sw.verdict(0.05), Some(Verdict::LooksNormal));
        let inc = FitTestResult::Inconclusive {
            reason: InconclusiveReason::NoBatches,
        };
        assert_eq!(inc.verdict(0.05), None);
        assert!(inc.p_value().is_none());
    }

    #[test]
    fn verdict_texts() {
        let r = FitReport::new(FitMethod::Binomial, 0.05, computed(0.01));
        assert_eq!(
            r.verdict_text(),
            "Hypothesis rejected (p < 0.05): defect counts do not follow the binomial model."
        );
        let r = FitReport::new(FitMethod::Binomial, 0.05, computed(0.5));
        assert_eq!(
            r.verdict_text(),
            "Hypothesis not rejected: defect counts are consistent with the binomial model."
        );
        let r = FitReport::new(FitMethod::NormalApproximation, 0.05, computed(0.01));
        assert_eq!(
            r.verdict_text(),
            "Hypothesis rejected (p < 0.05): the data do not follow the normal model of defect rates."
        );
        let r = FitReport::new(FitMethod::NormalApproximation, 0.05, computed(0.5));
        assert_eq!(
            r.verdict_text(),
            "Hypothesis not rejected: the data are consistent with the normal model of defect rates."
        );
        let r = FitReport::new(
            FitMethod::NormalApproximation,
            0.05,
            FitTestResult::Inconclusive {
                reason: InconclusiveReason::HomogeneousRates {
                    min_rate: 0.02,
                    max_rate: 0.02,
                },
            },
        );
        assert!(r.verdict_text().contains("2.00% to 2.00%"));
    }

    #[test]
    fn serializes_tagged() {
        let json = serde_json::to_value(computed(0.3)).expect("serialize");
        assert_eq!(json["kind"], "computed");
        assert_eq!(json["degrees_of_freedom"], 2);
        let json = serde_json::to_value(FitTestResult::Inconclusive {
            reason: InconclusiveReason::TooFewBatches { batches: 2 },
        })
        .expect("serialize");
        assert_eq!(json["reason"]["reason"], "too_few_batches");
    }
}
