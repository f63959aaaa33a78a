//! Export report: batch table, summary, and test verdict.

use serde::Serialize;

use crate::aggregate::AggregateStats;
use crate::dataset::Dataset;
use crate::fit::{FitReport, FitTestResult};

/// One line of the batch table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportRow {
    /// 1-based batch number.
    pub batch: usize,
    pub batch_size: u64,
    pub defect_count: u64,
    /// `defect_count / batch_size × 100`.
    pub defect_pct: f64,
}

/// Everything an exporter needs to render a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    /// One row per batch, in input order.
    pub rows: Vec<ReportRow>,
    pub summary: AggregateStats,
    pub fit: FitReport,
    /// [`FitReport::verdict_text`] at build time.
    pub verdict_text: String,
}

impl ExportReport {
    /// Assembles the report.
    ///
    /// # Examples
    ///
    /// ```
    /// use defect_fit::aggregate::aggregate;
    /// use defect_fit::config::FitConfig;
    /// use defect_fit::dataset::Dataset;
    /// use defect_fit::fit::run_fit;
    /// use defect_fit::report::ExportReport;
    ///
    /// let d = Dataset::from_pairs(&[100, 100, 100], &[5, 5, 5]).unwrap();
    /// let s = aggregate(&d);
    /// let fit = run_fit(&d, &s, &FitConfig::default());
    /// let report = ExportReport::build(&d, &s, &fit);
    /// assert_eq!(report.rows[0].defect_pct, 5.0);
    /// assert!(report.verdict_text.starts_with("Hypothesis not rejected"));
    /// ```
    pub fn build(dataset: &Dataset, stats: &AggregateStats, fit: &FitReport) -> Self {
        let rows = dataset
            .records()
            .iter()
            .enumerate()
            .map(|(i, r)| ReportRow {
                batch: i + 1,
                batch_size: r.size,
                defect_count: r.defect_count,
                defect_pct: r.defect_rate() * 100.0,
            })
            .collect();

        Self {
            rows,
            summary: *stats,
            fit: fit.clone(),
            verdict_text: fit.verdict_text(),
        }
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text summary block: totals, test figures, and conclusion.
    pub fn summary_text(&self) -> String {
        let s = &self.summary;
        let mut out = format!(
            "Total batches: {}\nTotal parts: {}\nTotal defects: {}\nAverage defect rate: {:.2}%\n",
            s.total_batches,
            s.total_parts,
            s.total_defects,
            s.avg_defect_pct()
        );
        match self.fit.outcome {
            FitTestResult::Computed {
                chi2_stat,
                degrees_of_freedom,
                p_value,
            } => out.push_str(&format!(
                "Chi-squared statistic: {chi2_stat:.3}\nDegrees of freedom: {degrees_of_freedom}\np-value: {p_value:.4}\n"
            )),
            FitTestResult::Normality { w, p_value } => out.push_str(&format!(
                "Shapiro-Wilk W: {w:.4}\np-value: {p_value:.4}\n"
            )),
            FitTestResult::Inconclusive { .. } => {}
        }
        for warning in &self.fit.warnings {
            out.push_str(&format!("Warning: {warning}\n"));
        }
        out.push_str(&format!("Conclusion: {}\n", self.verdict_text));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::config::FitConfig;
    use crate::fit::run_fit;

    fn report(sizes: &[i64], defects: &[i64]) -> ExportReport {
        let d = Dataset::from_pairs(sizes, defects).expect("valid");
        let s = aggregate(&d);
        let fit = run_fit(&d, &s, &FitConfig::default());
        ExportReport::build(&d, &s, &fit)
    }

    #[test]
    fn rows_carry_percentages() {
        let r = report(&[200, 50, 400], &[3, 1, 0]);
        assert_eq!(r.rows.len(), 3);
        assert_eq!(r.rows[1].batch, 2);
        assert!((r.rows[0].defect_pct - 1.5).abs() < 1e-12);
        assert!((r.rows[1].defect_pct - 2.0).abs() < 1e-12);
        assert_eq!(r.rows[2].defect_pct, 0.0);
    }

    #[test]
    fn summary_text_contains_figures() {
        let r = report(&[100, 100, 100, 100], &[10, 5, 0, 15]);
        let text = r.summary_text();
        assert!(text.contains("Total parts: 400"));
        assert!(text.contains("Average defect rate: 7.50%"));
        assert!(text.contains("Chi-squared statistic: 10.000"));
        assert!(text.contains("Degrees of freedom: 2"));
        assert!(text.contains("Conclusion: Hypothesis rejected"));
    }

    #[test]
    fn json_has_verdict() {
        let r = report(&[100, 100, 100], &[5, 5, 5]);
        let json: serde_json::Value =
            serde_json::from_str(&r.to_json().expect("serialize")).expect("parse");
        assert_eq!(json["summary"]["total_defects"], 15);
        assert_eq!(json["fit"]["method"], "binomial");
        assert_eq!(json["fit"]["outcome"]["kind"], "computed");
        assert_eq!(json["rows"][0]["batch_size"], 100);
    }

    #[test]
    fn inconclusive_report_uses_reason() {
        let r = report(&[100, 100], &[1, 2]);
        assert!(r.verdict_text.contains("At least 3 batches"));
        assert!(r.summary_text().contains("Warning: Expected frequency below 5"));
    }
}
