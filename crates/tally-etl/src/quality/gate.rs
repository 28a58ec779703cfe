//! Hard validation gates.
//!
//! Every function here is a pure predicate over a frame: it either passes or
//! fails with a typed error carrying the offending column and values. Nothing
//! is mutated and nothing is recovered locally; a gate failure aborts the run.

use crate::error::{EtlError, Result};
use polars::prelude::*;

/// How many offending values a gate error message carries at most.
const ERROR_SAMPLE_LIMIT: usize = 10;

/// Fail with a schema error listing every missing column, not just the first.
pub fn require_columns(df: &DataFrame, names: &[&str], label: &str) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<String> = names
        .iter()
        .filter(|&&name| !present.iter().any(|have| have == name))
        .map(|&name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EtlError::Schema {
            label: label.to_string(),
            missing,
        })
    }
}

/// Fail if the dataset has zero rows.
pub fn assert_non_empty(df: &DataFrame, label: &str) -> Result<()> {
    if df.height() == 0 {
        return Err(EtlError::EmptyDataset {
            label: label.to_string(),
        });
    }
    Ok(())
}

/// Fail if any value of `key` appears more than once.
///
/// The error reports the number of distinct duplicated values and a bounded
/// sample of them. Null keys count as a value like any other.
pub fn assert_unique_key(df: &DataFrame, key: &str) -> Result<()> {
    let series = df.column(key)?.as_materialized_series();
    let counts = series.value_counts(true, false, "count".into(), false)?;

    let count_col = counts.column("count")?.as_materialized_series();
    let count_ca = count_col.cast(&DataType::UInt32)?;
    let count_ca = count_ca.u32()?;
    let value_col = counts.column(key)?.as_materialized_series();

    let mut duplicates: Vec<String> = Vec::new();
    for (idx, opt_count) in count_ca.into_iter().enumerate() {
        // value_counts is sorted descending, so the first non-duplicate ends it
        match opt_count {
            Some(c) if c >= 2 => {
                duplicates.push(format!("{}", value_col.get(idx)?));
            }
            _ => break,
        }
    }

    if duplicates.is_empty() {
        return Ok(());
    }

    let count = duplicates.len();
    duplicates.truncate(ERROR_SAMPLE_LIMIT);
    Err(EtlError::DuplicateKey {
        column: key.to_string(),
        count,
        sample: duplicates,
    })
}

/// Fail if any non-null value in `column` is strictly below `lower`.
///
/// Nulls are exempt: range checks apply only to present values.
pub fn assert_in_range(df: &DataFrame, column: &str, lower: f64) -> Result<()> {
    let series = df.column(column)?.as_materialized_series();
    let float = series.cast(&DataType::Float64)?;
    let ca = float.f64()?;

    let violations = ca
        .into_iter()
        .filter(|v| v.map(|val| val < lower).unwrap_or(false))
        .count();

    if violations > 0 {
        return Err(EtlError::RangeViolation {
            column: column.to_string(),
            lower,
            violations,
        });
    }
    Ok(())
}
