//! Aggregate defect statistics.
//!
//! # Examples
//!
//! ```
//! use defect_fit::aggregate::aggregate;
//! use defect_fit::dataset::Dataset;
//!
//! let d = Dataset::from_pairs(&[100, 100, 100], &[5, 5, 5]).unwrap();
//! let s = aggregate(&d);
//! assert_eq!(s.total_parts, 300);
//! assert!((s.avg_defect_rate - 0.05).abs() < 1e-15);
//! ```

use serde::Serialize;

use crate::dataset::Dataset;

/// Totals and overall defect rate of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AggregateStats {
    /// Number of batches.
    pub total_batches: usize,
    /// Σ size.
    pub total_parts: u128,
    /// Σ defect_count.
    pub total_defects: u128,
    /// `total_defects / total_parts`, or exactly 0 when there are no parts.
    pub avg_defect_rate: f64,
}

impl AggregateStats {
    /// Mean batch size, or `None` for an empty dataset.
    pub fn mean_batch_size(&self) -> Option<f64> {
        (self.total_batches > 0).then(|| self.total_parts as f64 / self.total_batches as f64)
    }

    /// Overall defect rate in percent.
    pub fn avg_defect_pct(&self) -> f64 {
        self.avg_defect_rate * 100.0
    }
}

/// Computes [`AggregateStats`]. Defined for every dataset, including empty.
pub fn aggregate(dataset: &Dataset) -> AggregateStats {
    let total_parts = dataset.total_parts();
    let total_defects = dataset.total_defects();
    let avg_defect_rate = if total_parts > 0 {
        total_defects as f64 / total_parts as f64
    } else {
        0.0
    };

    AggregateStats {
        total_batches: dataset.len(),
        total_parts,
        total_defects,
        avg_defect_rate,
    }
}
