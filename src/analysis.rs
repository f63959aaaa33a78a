//! End-to-end analysis of one dataset.
//!
//! validate → aggregate → fit → plot series. Every call recomputes from
//! scratch; nothing is cached between calls and the caller owns the data.
//!
//! # Examples
//!
//! ```
//! use defect_fit::analysis::analyze;
//! use defect_fit::config::AnalysisConfig;
//! use defect_fit::dataset::BatchRow;
//! use defect_fit::fit::Verdict;
//!
//! let rows = [
//!     BatchRow::new(100, 5),
//!     BatchRow::new(100, 5),
//!     BatchRow::new(100, 5),
//! ];
//! let analysis = analyze(&rows, &AnalysisConfig::default()).unwrap();
//! assert_eq!(analysis.stats.total_defects, 15);
//! assert_eq!(analysis.fit.verdict(), Some(Verdict::NotRejected));
//! ```

use serde::Serialize;

use crate::aggregate::{aggregate, AggregateStats};
use crate::config::AnalysisConfig;
use crate::dataset::{BatchRow, Dataset};
use crate::fit::{run_fit, FitReport};
use crate::plot::{comparison_series, distribution_series, ComparisonSeries, DistributionSeries};
use crate::report::ExportReport;
use crate::validation::ValidationErrors;

/// Immutable results of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub dataset: Dataset,
    pub stats: AggregateStats,
    pub fit: FitReport,
    pub comparison: ComparisonSeries,
    pub distribution: DistributionSeries,
}

impl Analysis {
    /// Runs every stage on an already validated dataset.
    pub fn of(dataset: Dataset, config: &AnalysisConfig) -> Self {
        let stats = aggregate(&dataset);
        tracing::debug!(
            batches = stats.total_batches,
            parts = stats.total_parts,
            defects = stats.total_defects,
            rate = stats.avg_defect_rate,
            method = ?config.fit.method,
            "analyzing dataset"
        );

        let fit = run_fit(&dataset, &stats, &config.fit);
        let comparison = comparison_series(&dataset, &stats);
        let distribution = distribution_series(&dataset, &stats, &config.plot);

        Self {
            dataset,
            stats,
            fit,
            comparison,
            distribution,
        }
    }

    /// Report for export.
    pub fn report(&self) -> ExportReport {
        ExportReport::build(&self.dataset, &self.stats, &self.fit)
    }
}

/// Validates `rows` and analyzes them. Nothing runs if any row is invalid.
pub fn analyze(rows: &[BatchRow], config: &AnalysisConfig) -> Result<Analysis, ValidationErrors> {
    let dataset = Dataset::from_rows(rows)?;
    Ok(Analysis::of(dataset, config))
}
