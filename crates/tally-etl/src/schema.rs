//! Canonical schema declaration and enforcement.
//!
//! The schema is declared explicitly (column name → semantic type) instead of
//! relying on whatever the CSV reader happened to infer. Enforcement is
//! best-effort per cell: a value that cannot be coerced becomes null and the
//! run continues; the damage surfaces through the missingness report and the
//! downstream range/emptiness assertions, not through a per-cell panic.

use crate::error::Result;
use crate::utils::{is_numeric_dtype, parse_numeric_string};
use once_cell::sync::Lazy;
use polars::prelude::*;
use tracing::debug;

/// Semantic type of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    /// String key column (`order_id`, `user_id`).
    Identifier,
    /// Nullable 64-bit float.
    Float,
    /// Nullable 64-bit integer.
    Integer,
    /// Free text, including not-yet-parsed timestamps.
    Text,
}

/// Canonical schema for the orders record set.
///
/// `created_at` stays text here; parsing it is the temporal parser's job.
pub static CANONICAL_ORDERS_SCHEMA: Lazy<Vec<(&'static str, SemanticType)>> = Lazy::new(|| {
    vec![
        ("order_id", SemanticType::Identifier),
        ("user_id", SemanticType::Identifier),
        ("amount", SemanticType::Float),
        ("quantity", SemanticType::Integer),
        ("created_at", SemanticType::Text),
        ("status", SemanticType::Text),
    ]
});

/// Canonical schema for the users record set.
pub static CANONICAL_USERS_SCHEMA: Lazy<Vec<(&'static str, SemanticType)>> = Lazy::new(|| {
    vec![
        ("user_id", SemanticType::Identifier),
        ("country", SemanticType::Text),
        ("signup_date", SemanticType::Text),
    ]
});

/// Coerce every known orders column to its canonical semantic type.
///
/// Returns a new frame; the input is untouched.
pub fn enforce_orders_schema(df: &DataFrame) -> Result<DataFrame> {
    apply_schema(df, &CANONICAL_ORDERS_SCHEMA)
}

/// Coerce every known users column to its canonical semantic type.
pub fn enforce_users_schema(df: &DataFrame) -> Result<DataFrame> {
    apply_schema(df, &CANONICAL_USERS_SCHEMA)
}

/// Apply a declared schema to a frame. Columns not named by the schema are
/// passed through unchanged; schema columns absent from the frame are skipped
/// (presence is the quality gate's concern, not the coercer's).
pub fn apply_schema(df: &DataFrame, schema: &[(&str, SemanticType)]) -> Result<DataFrame> {
    let mut out = df.clone();
    for (name, semantic) in schema {
        let Ok(col) = df.column(name) else {
            continue;
        };
        let series = col.as_materialized_series();
        let coerced = match semantic {
            SemanticType::Identifier => to_identifier(series)?,
            SemanticType::Float => to_float(series)?,
            SemanticType::Integer => to_integer(series)?,
            SemanticType::Text => to_text(series)?,
        };
        if coerced.dtype() != series.dtype() {
            debug!(
                "Coerced column '{}' from {} to {}",
                name,
                series.dtype(),
                coerced.dtype()
            );
        }
        out.replace(name, coerced)?;
    }
    Ok(out)
}

/// Stringify a key column. Integral numbers print without a fractional part
/// so an ID read as `7.0` joins against one read as `"7"`.
fn to_identifier(series: &Series) -> Result<Series> {
    if series.dtype() == &DataType::String {
        return Ok(series.clone());
    }
    if is_numeric_dtype(series.dtype()) {
        let float = series.cast(&DataType::Float64)?;
        let ca = float.f64()?;
        let mut values: Vec<Option<String>> = Vec::with_capacity(ca.len());
        for opt_val in ca.into_iter() {
            values.push(opt_val.map(|v| {
                if v.fract() == 0.0 {
                    format!("{}", v as i64)
                } else {
                    format!("{}", v)
                }
            }));
        }
        return Ok(Series::new(series.name().clone(), values));
    }
    Ok(series.cast(&DataType::String)?)
}

/// Coerce to nullable Float64. String cells parse best-effort to null.
fn to_float(series: &Series) -> Result<Series> {
    if is_numeric_dtype(series.dtype()) {
        return Ok(series.cast(&DataType::Float64)?);
    }
    if series.dtype() == &DataType::String {
        let ca = series.str()?;
        let mut values: Vec<Option<f64>> = Vec::with_capacity(ca.len());
        for opt_val in ca.into_iter() {
            values.push(opt_val.and_then(parse_numeric_string));
        }
        return Ok(Series::new(series.name().clone(), values));
    }
    // Anything else (e.g. Boolean) has no sensible numeric reading.
    Ok(Series::full_null(
        series.name().clone(),
        series.len(),
        &DataType::Float64,
    ))
}

/// Coerce to nullable Int64. Fractional values truncate toward zero.
fn to_integer(series: &Series) -> Result<Series> {
    if is_numeric_dtype(series.dtype()) {
        let float = series.cast(&DataType::Float64)?;
        let ca = float.f64()?;
        let mut values: Vec<Option<i64>> = Vec::with_capacity(ca.len());
        for opt_val in ca.into_iter() {
            values.push(opt_val.map(|v| v as i64));
        }
        return Ok(Series::new(series.name().clone(), values));
    }
    if series.dtype() == &DataType::String {
        let ca = series.str()?;
        let mut values: Vec<Option<i64>> = Vec::with_capacity(ca.len());
        for opt_val in ca.into_iter() {
            values.push(opt_val.and_then(parse_numeric_string).map(|v| v as i64));
        }
        return Ok(Series::new(series.name().clone(), values));
    }
    Ok(Series::full_null(
        series.name().clone(),
        series.len(),
        &DataType::Int64,
    ))
}

fn to_text(series: &Series) -> Result<Series> {
    if series.dtype() == &DataType::String {
        return Ok(series.clone());
    }
    Ok(series.cast(&DataType::String)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enforce_orders_schema_from_strings() {
        let df = df![
            "order_id" => ["o1", "o2"],
            "user_id" => ["u1", "u2"],
            "amount" => ["100.5", "not-a-number"],
            "quantity" => ["2", "x"],
            "created_at" => ["2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"],
            "status" => ["paid", "refund"],
        ]
        .unwrap();

        let out = enforce_orders_schema(&df).unwrap();

        assert_eq!(out.column("amount").unwrap().dtype(), &DataType::Float64);
        assert_eq!(out.column("quantity").unwrap().dtype(), &DataType::Int64);
        assert_eq!(out.column("order_id").unwrap().dtype(), &DataType::String);

        // best-effort: unparseable cells become null, the run continues
        assert_eq!(out.column("amount").unwrap().null_count(), 1);
        assert_eq!(out.column("quantity").unwrap().null_count(), 1);

        // the input frame is untouched
        assert_eq!(df.column("amount").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_numeric_identifier_is_stringified() {
        let df = df![
            "user_id" => [7i64, 12],
            "country" => ["US", "DE"],
            "signup_date" => ["2023-01-01", "2023-02-01"],
        ]
        .unwrap();

        let out = enforce_users_schema(&df).unwrap();
        let ids = out.column("user_id").unwrap();
        assert_eq!(ids.dtype(), &DataType::String);
        let first = ids.as_materialized_series().str().unwrap().get(0);
        assert_eq!(first, Some("7"));
    }

    #[test]
    fn test_numeric_columns_cast_natively() {
        let df = df![
            "order_id" => ["o1"],
            "user_id" => ["u1"],
            "amount" => [100i64],
            "quantity" => [3i64],
            "created_at" => ["2024-01-01"],
            "status" => ["paid"],
        ]
        .unwrap();

        let out = enforce_orders_schema(&df).unwrap();
        assert_eq!(out.column("amount").unwrap().dtype(), &DataType::Float64);
        let amount = out.column("amount").unwrap().as_materialized_series().f64().unwrap().get(0);
        assert_eq!(amount, Some(100.0));
    }

    #[test]
    fn test_missing_schema_columns_are_skipped() {
        let df = df!["order_id" => ["o1"]].unwrap();
        let out = enforce_orders_schema(&df).unwrap();
        assert_eq!(out.width(), 1);
    }

    #[test]
    fn test_formatted_numbers_parse() {
        let df = df![
            "order_id" => ["o1"],
            "user_id" => ["u1"],
            "amount" => ["$1,234.50"],
            "quantity" => ["1"],
            "created_at" => ["2024-01-01"],
            "status" => ["paid"],
        ]
        .unwrap();

        let out = enforce_orders_schema(&df).unwrap();
        let amount = out.column("amount").unwrap().as_materialized_series().f64().unwrap().get(0);
        assert_eq!(amount, Some(1234.5));
    }
}
