//! Winsorization and IQR-based outlier flagging for numeric columns.

use crate::error::Result;
use polars::prelude::*;
use tracing::debug;

/// Value at a fractional rank of an already-sorted series.
fn value_at_percentile(sorted: &Series, pct: f64) -> Result<f64> {
    let n = sorted.len();
    let idx = ((n as f64 * pct) as usize).min(n - 1);
    Ok(sorted.get(idx)?.try_extract::<f64>()?)
}

/// Clamp every non-null value into the `[lower_pct, upper_pct]` percentile
/// range of the column. Nulls remain null.
///
/// The percentile is taken by sorted index over non-null values, which makes
/// the operation idempotent: clamping never moves the bound values themselves.
pub fn winsorize(series: &Series, lower_pct: f64, upper_pct: f64) -> Result<Series> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return Ok(series.cast(&DataType::Float64)?);
    }

    let float = non_null.cast(&DataType::Float64)?;
    let sorted = float.sort(SortOptions::default())?;
    let lower = value_at_percentile(&sorted, lower_pct)?;
    let upper = value_at_percentile(&sorted, upper_pct)?;

    let full = series.cast(&DataType::Float64)?;
    let clamped = full
        .f64()?
        .apply(|v| v.map(|val| val.clamp(lower, upper)));

    debug!(
        "Winsorized '{}' into [{}, {}]",
        series.name(),
        lower,
        upper
    );
    Ok(clamped.into_series())
}

/// Add a boolean `{column}_is_outlier` flag using the IQR rule.
///
/// A value is an outlier when it lies outside `[Q1 - k*IQR, Q3 + k*IQR]`,
/// with quartiles taken over non-null values. Null values are never flagged:
/// the flag is false, not null.
pub fn add_outlier_flag(df: &DataFrame, column: &str, k: f64) -> Result<DataFrame> {
    let series = df.column(column)?.as_materialized_series();
    let flag_name = format!("{column}_is_outlier");

    let non_null = series.drop_nulls();
    if non_null.len() < 4 {
        // too few points for meaningful quartiles; nothing gets flagged
        let flags = vec![false; series.len()];
        let mut out = df.clone();
        out.with_column(Series::new(flag_name.into(), flags))?;
        return Ok(out);
    }

    let float = non_null.cast(&DataType::Float64)?;
    let sorted = float.sort(SortOptions::default())?;
    let q1 = value_at_percentile(&sorted, 0.25)?;
    let q3 = value_at_percentile(&sorted, 0.75)?;
    let iqr = q3 - q1;

    let lower_bound = q1 - k * iqr;
    let upper_bound = q3 + k * iqr;

    let full = series.cast(&DataType::Float64)?;
    let ca = full.f64()?;
    let mut flags: Vec<bool> = Vec::with_capacity(ca.len());
    for opt_val in ca.into_iter() {
        match opt_val {
            Some(val) => flags.push(val < lower_bound || val > upper_bound),
            None => flags.push(false),
        }
    }

    let flagged = flags.iter().filter(|f| **f).count();
    if flagged > 0 {
        debug!(
            "Flagged {} outlier(s) in '{}' outside [{}, {}]",
            flagged, column, lower_bound, upper_bound
        );
    }

    let mut out = df.clone();
    out.with_column(Series::new(flag_name.into(), flags))?;
    Ok(out)
}
