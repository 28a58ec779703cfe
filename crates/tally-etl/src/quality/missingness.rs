//! Per-column null statistics and missing-value flags.

use crate::error::Result;
use polars::prelude::*;

/// Compute a per-column missingness report: `column`, `null_count`, `null_rate`.
///
/// The report is a derived, read-only artifact; nothing downstream consumes it.
pub fn missingness_report(df: &DataFrame) -> Result<DataFrame> {
    let total = df.height();
    let mut columns: Vec<String> = Vec::with_capacity(df.width());
    let mut null_counts: Vec<u32> = Vec::with_capacity(df.width());
    let mut null_rates: Vec<f64> = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let nulls = col.null_count();
        columns.push(col.name().to_string());
        null_counts.push(nulls as u32);
        null_rates.push(if total == 0 {
            0.0
        } else {
            nulls as f64 / total as f64
        });
    }

    Ok(df![
        "column" => columns,
        "null_count" => null_counts,
        "null_rate" => null_rates,
    ]?)
}

/// Add a boolean `{col}_missing` column for each named column, true where the
/// cell is null in the *input* frame.
///
/// Flags must be computed before any later imputation: the point is to record
/// original absence, so the flag stays truthful even if the value is filled
/// downstream.
pub fn add_missing_flags(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let mut out = df.clone();
    for col in columns {
        let mask = df.column(col)?.as_materialized_series().is_null();
        let mut flag = mask.into_series();
        flag.rename(format!("{col}_missing").into());
        out.with_column(flag)?;
    }
    Ok(out)
}
