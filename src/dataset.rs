//! Batch records and the dataset they form.
//!
//! A [`BatchRow`] is a row as it was entered or imported: cells may be
//! missing, negative, or otherwise inconsistent. A [`Dataset`] holds only
//! [`BatchRecord`]s that passed [`validate`](crate::validation::validate),
//! so every downstream computation can rely on `1 ≤ size` and
//! `defect_count ≤ size`.
//!
//! # Examples
//!
//! ```
//! use defect_fit::dataset::{BatchRow, Dataset};
//!
//! let rows = [BatchRow::new(100, 5), BatchRow::new(120, 7)];
//! let dataset = Dataset::from_rows(&rows).unwrap();
//! assert_eq!(dataset.len(), 2);
//! assert_eq!(dataset.batch_sizes(), vec![100, 120]);
//! ```

use serde::{Deserialize, Serialize};

use crate::validation::{validate, ValidationErrors};

/// An unvalidated batch row.
///
/// `None` marks an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchRow {
    /// Parts produced in the batch.
    pub size: Option<i64>,
    /// Defective parts in the batch.
    pub defect_count: Option<i64>,
}

impl BatchRow {
    /// A row with both cells filled.
    pub fn new(size: i64, defect_count: i64) -> Self {
        Self {
            size: Some(size),
            defect_count: Some(defect_count),
        }
    }
}

/// One production batch. Invariant: `1 ≤ size`, `defect_count ≤ size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Parts produced.
    pub size: u64,
    /// Defective parts.
    pub defect_count: u64,
}

impl BatchRecord {
    /// Defect rate `defect_count / size`.
    pub fn defect_rate(&self) -> f64 {
        self.defect_count as f64 / self.size as f64
    }
}

/// Validated, ordered batches.
///
/// Entry order is kept for display; statistics do not depend on it. A
/// dataset is never edited in place: a new one replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Dataset {
    records: Vec<BatchRecord>,
}

impl Dataset {
    /// Validates `rows` and converts them into a dataset.
    ///
    /// Either every row is accepted or the whole set is rejected with all
    /// violations listed.
    pub fn from_rows(rows: &[BatchRow]) -> Result<Self, ValidationErrors> {
        validate(rows)?;

        let records = rows
            .iter()
            .filter_map(|row| match (row.size, row.defect_count) {
                (Some(size), Some(defect_count)) => Some(BatchRecord {
                    size: size as u64,
                    defect_count: defect_count as u64,
                }),
                _ => None,
            })
            .collect();

        Ok(Self { records })
    }

    /// Builds a dataset from parallel size/defect columns.
    ///
    /// Columns of unequal length are treated as a ragged table: the
    /// missing cells are empty and fail validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use defect_fit::dataset::Dataset;
    ///
    /// let dataset = Dataset::from_pairs(&[100, 100, 100], &[5, 5, 5]).unwrap();
    /// assert_eq!(dataset.total_defects(), 15);
    /// assert!(Dataset::from_pairs(&[100, 100], &[5]).is_err());
    /// ```
    pub fn from_pairs(sizes: &[i64], defect_counts: &[i64]) -> Result<Self, ValidationErrors> {
        let n = sizes.len().max(defect_counts.len());
        let rows: Vec<BatchRow> = (0..n)
            .map(|i| BatchRow {
                size: sizes.get(i).copied(),
                defect_count: defect_counts.get(i).copied(),
            })
            .collect();
        Self::from_rows(&rows)
    }

    /// Records in entry order.
    pub fn records(&self) -> &[BatchRecord] {
        &self.records
    }

    /// Number of batches.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no batches.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Batch sizes in entry order.
    pub fn batch_sizes(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.size).collect()
    }

    /// Defect counts in entry order.
    pub fn defect_counts(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.defect_count).collect()
    }

    /// Per-batch defect rates in entry order.
    pub fn defect_rates(&self) -> Vec<f64> {
        self.records.iter().map(BatchRecord::defect_rate).collect()
    }

    /// Sum of batch sizes.
    ///
    /// Accumulated in `u128`, so no validated dataset can overflow it.
    pub fn total_parts(&self) -> u128 {
        self.records.iter().map(|r| u128::from(r.size)).sum()
    }

    /// Sum of defect counts.
    pub fn total_defects(&self) -> u128 {
        self.records.iter().map(|r| u128::from(r.defect_count)).sum()
    }

    /// Converts back to untyped rows, e.g. to seed an editor.
    pub fn to_rows(&self) -> Vec<BatchRow> {
        self.records
            .iter()
            .map(|r| BatchRow::new(r.size as i64, r.defect_count as i64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn from_rows_keeps_order() {
        let rows = [
            BatchRow::new(200, 3),
            BatchRow::new(100, 9),
            BatchRow::new(150, 0),
        ];
        let d = Dataset::from_rows(&rows).expect("valid rows");
        assert_eq!(d.batch_sizes(), vec![200, 100, 150]);
        assert_eq!(d.defect_counts(), vec![3, 9, 0]);
        assert_eq!(d.to_rows(), rows.to_vec());
    }

    #[test]
    fn from_rows_rejects_wholesale() {
        let rows = [BatchRow::new(100, 5), BatchRow::new(0, 1)];
        let err = Dataset::from_rows(&rows).unwrap_err();
        assert!(err.contains(ValidationErrorKind::NonPositiveSize));
    }

    #[test]
    fn ragged_columns_are_empty_cells() {
        let err = Dataset::from_pairs(&[100, 100, 100], &[5]).unwrap_err();
        let empty = err.rows_for(ValidationErrorKind::EmptyValue);
        assert_eq!(empty, &[2, 3]);
    }

    #[test]
    fn rates_and_totals() {
        let d = Dataset::from_pairs(&[100, 50], &[5, 10]).expect("valid");
        assert_eq!(d.total_parts(), 150);
        assert_eq!(d.total_defects(), 15);
        let rates = d.defect_rates();
        assert!((rates[0] - 0.05).abs() < 1e-15);
        assert!((rates[1] - 0.2).abs() < 1e-15);
    }

    #[test]
    fn empty_dataset() {
        let d = Dataset::from_rows(&[]).expect("empty is valid");
        assert!(d.is_empty());
        assert_eq!(d.total_parts(), 0);
    }
}
