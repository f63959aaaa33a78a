//! Input validation for batch rows.
//!
//! Four independent checks run over the whole table. Each check that
//! fires contributes one [`ValidationError`] listing every offending row
//! (1-based, as shown to the user), so one call surfaces every problem.
//!
//! | Check | Kind |
//! |-------|------|
//! | a cell is empty | [`ValidationErrorKind::EmptyValue`] |
//! | `size ≤ 0` | [`ValidationErrorKind::NonPositiveSize`] |
//! | `defect_count < 0` | [`ValidationErrorKind::NegativeDefects`] |
//! | `defect_count > size` | [`ValidationErrorKind::DefectsExceedSize`] |
//!
//! A comparison involving an empty cell does not fire: such a row is
//! reported under `EmptyValue` only for that cell.
//!
//! # Examples
//!
//! ```
//! use defect_fit::dataset::BatchRow;
//! use defect_fit::validation::{validate, ValidationErrorKind};
//!
//! let rows = [BatchRow::new(100, 5), BatchRow::new(0, -1)];
//! let err = validate(&rows).unwrap_err();
//! assert_eq!(err.rows_for(ValidationErrorKind::NonPositiveSize), &[2]);
//! assert_eq!(err.rows_for(ValidationErrorKind::NegativeDefects), &[2]);
//! ```

use std::fmt;

use serde::Serialize;

use crate::dataset::BatchRow;

/// Class of validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// A size or defect cell is empty.
    EmptyValue,
    /// Batch size is zero or negative.
    NonPositiveSize,
    /// Defect count is negative.
    NegativeDefects,
    /// More defects than parts in the batch.
    DefectsExceedSize,
}

impl ValidationErrorKind {
    /// Evaluation order of the checks.
    pub const ALL: [ValidationErrorKind; 4] = [
        ValidationErrorKind::EmptyValue,
        ValidationErrorKind::NonPositiveSize,
        ValidationErrorKind::NegativeDefects,
        ValidationErrorKind::DefectsExceedSize,
    ];

    fn describe(self) -> &'static str {
        match self {
            ValidationErrorKind::EmptyValue => "empty values",
            ValidationErrorKind::NonPositiveSize => "non-positive batch size",
            ValidationErrorKind::NegativeDefects => "negative defect count",
            ValidationErrorKind::DefectsExceedSize => "more defects than parts",
        }
    }

    fn fires(self, row: &BatchRow) -> bool {
        match self {
            ValidationErrorKind::EmptyValue => row.size.is_none() || row.defect_count.is_none(),
            ValidationErrorKind::NonPositiveSize => row.size.is_some_and(|s| s <= 0),
            ValidationErrorKind::NegativeDefects => row.defect_count.is_some_and(|d| d < 0),
            ValidationErrorKind::DefectsExceedSize => match (row.size, row.defect_count) {
                (Some(s), Some(d)) => d > s,
                _ => false,
            },
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One failed check with all rows (1-based) that failed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} in rows: {}", join_rows(.rows))]
pub struct ValidationError {
    /// Which check fired.
    pub kind: ValidationErrorKind,
    /// Offending rows, ascending, 1-based.
    pub rows: Vec<usize>,
}

fn join_rows(rows: &[usize]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every check that fired for a rejected table. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}", render(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn render(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// The individual failures in check order.
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Whether a check of this kind fired.
    pub fn contains(&self, kind: ValidationErrorKind) -> bool {
        self.0.iter().any(|e| e.kind == kind)
    }

    /// Rows that failed `kind`, or an empty slice.
    pub fn rows_for(&self, kind: ValidationErrorKind) -> &[usize] {
        self.0
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.rows.as_slice())
            .unwrap_or(&[])
    }
}

/// Checks a table of rows. Does not short-circuit between checks.
///
/// Returns `Ok(())` only when no check fires. An empty table is valid.
pub fn validate(rows: &[BatchRow]) -> Result<(), ValidationErrors> {
    let errors: Vec<ValidationError> = ValidationErrorKind::ALL
        .iter()
        .filter_map(|&kind| {
            let offending: Vec<usize> = rows
                .iter()
                .enumerate()
                .filter(|(_, row)| kind.fires(row))
                .map(|(i, _)| i + 1)
                .collect();
            (!offending.is_empty()).then_some(ValidationError {
                kind,
                rows: offending,
            })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(classes = errors.len(), "dataset rejected");
        Err(ValidationErrors(errors))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_row() -> impl Strategy<Value = BatchRow> {
        (
            proptest::option::weighted(0.9, -5_i64..50),
            proptest::option::weighted(0.9, -5_i64..50),
        )
            .prop_map(|(size, defect_count)| BatchRow { size, defect_count })
    }

    proptest! {
        #[test]
        fn reports_every_violating_row(rows in proptest::collection::vec(arb_row(), 0..40)) {
            match validate(&rows) {
                Ok(()) => {
                    for r in &rows {
                        let (s, d) = (r.size.unwrap(), r.defect_count.unwrap());
                        prop_assert!(s >= 1 && d >= 0 && d <= s);
                    }
                }
                Err(err) => {
                    for kind in ValidationErrorKind::ALL {
                        let expected: Vec<usize> = rows
                            .iter()
                            .enumerate()
                            .filter(|(_, r)| kind.fires(r))
                            .map(|(i, _)| i + 1)
                            .collect();
                        prop_assert_eq!(err.rows_for(kind), expected.as_slice());
                    }
                }
            }
        }
    }
}
