//! Timestamp parsing and calendar-part derivation.
//!
//! Parsing follows the same best-effort policy as schema enforcement: an
//! unparseable cell becomes null instead of aborting the run. Callers that
//! need strictness must assert zero nulls afterwards.

use crate::error::Result;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use polars::prelude::*;
use tracing::debug;

/// Accepted naive timestamp layouts, tried in order after RFC 3339.
/// Date-only values fall through to a separate `%Y-%m-%d` parse.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse every value of `column` as a timestamp, replacing the column with a
/// millisecond-precision datetime.
///
/// With `to_utc`, offset-carrying values are normalized to UTC and naive
/// values are assumed UTC, so comparisons and bucketing are well-defined.
/// Without it, the wall-clock reading is kept as written.
pub fn parse_datetime(df: &DataFrame, column: &str, to_utc: bool) -> Result<DataFrame> {
    let series = df.column(column)?.as_materialized_series();
    if matches!(series.dtype(), DataType::Datetime(_, _)) {
        return Ok(df.clone());
    }

    let text = series.cast(&DataType::String)?;
    let ca = text.str()?;

    let mut millis: Vec<Option<i64>> = Vec::with_capacity(ca.len());
    let mut unparseable = 0usize;
    for opt_val in ca.into_iter() {
        match opt_val {
            Some(raw) => {
                let parsed = parse_instant_millis(raw.trim(), to_utc);
                if parsed.is_none() && !raw.trim().is_empty() {
                    unparseable += 1;
                }
                millis.push(parsed);
            }
            None => millis.push(None),
        }
    }

    if unparseable > 0 {
        debug!(
            "Column '{}': {} value(s) did not parse as timestamps and became null",
            column, unparseable
        );
    }

    let parsed = Series::new(column.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let mut out = df.clone();
    out.replace(column, parsed)?;
    Ok(out)
}

/// Parse a single timestamp string to epoch milliseconds.
fn parse_instant_millis(raw: &str, to_utc: bool) -> Option<i64> {
    if raw.is_empty() {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        let millis = if to_utc {
            with_offset.with_timezone(&Utc).timestamp_millis()
        } else {
            with_offset.naive_local().and_utc().timestamp_millis()
        };
        return Some(millis);
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Derive `year`, `month`, `day`, `hour` and `dow` (Monday = 0) from a
/// datetime column. Rows with a null timestamp get null parts.
pub fn add_time_parts(df: &DataFrame, ts_column: &str) -> Result<DataFrame> {
    let series = df.column(ts_column)?.as_materialized_series();
    let ints = series.cast(&DataType::Int64)?;
    let ca = ints.i64()?;

    let len = ca.len();
    let mut years: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut months: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut days: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut hours: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut dows: Vec<Option<i32>> = Vec::with_capacity(len);

    for opt_millis in ca.into_iter() {
        match opt_millis.and_then(DateTime::<Utc>::from_timestamp_millis) {
            Some(instant) => {
                years.push(Some(instant.year()));
                months.push(Some(instant.month() as i32));
                days.push(Some(instant.day() as i32));
                hours.push(Some(instant.hour() as i32));
                dows.push(Some(instant.weekday().num_days_from_monday() as i32));
            }
            None => {
                years.push(None);
                months.push(None);
                days.push(None);
                hours.push(None);
                dows.push(None);
            }
        }
    }

    let mut out = df.clone();
    out.with_column(Series::new("year".into(), years))?;
    out.with_column(Series::new("month".into(), months))?;
    out.with_column(Series::new("day".into(), days))?;
    out.with_column(Series::new("hour".into(), hours))?;
    out.with_column(Series::new("dow".into(), dows))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(values: &[Option<&str>]) -> DataFrame {
        let series = Series::new("created_at".into(), values);
        DataFrame::new(vec![series.into_column()]).unwrap()
    }

    // ==================== parse_datetime tests ====================

    #[test]
    fn test_parse_rfc3339_utc() {
        let df = frame(&[Some("2024-01-01T00:00:00Z")]);
        let out = parse_datetime(&df, "created_at", true).unwrap();
        assert!(matches!(
            out.column("created_at").unwrap().dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, _)
        ));
        let millis = out
            .column("created_at")
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Int64)
            .unwrap();
        assert_eq!(millis.i64().unwrap().get(0), Some(1_704_067_200_000));
    }

    #[test]
    fn test_parse_offset_normalized_to_utc() {
        let df = frame(&[Some("2024-01-01T02:00:00+02:00")]);
        let out = parse_datetime(&df, "created_at", true).unwrap();
        let millis = out
            .column("created_at")
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Int64)
            .unwrap();
        // 02:00 at +02:00 is midnight UTC
        assert_eq!(millis.i64().unwrap().get(0), Some(1_704_067_200_000));
    }

    #[test]
    fn test_parse_naive_and_date_only() {
        let df = frame(&[Some("2024-01-01 06:30:00"), Some("2024-01-01")]);
        let out = parse_datetime(&df, "created_at", true).unwrap();
        let millis = out
            .column("created_at")
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Int64)
            .unwrap();
        let ca = millis.i64().unwrap();
        assert_eq!(ca.get(0), Some(1_704_067_200_000 + 6 * 3_600_000 + 30 * 60_000));
        assert_eq!(ca.get(1), Some(1_704_067_200_000));
    }

    #[test]
    fn test_unparseable_becomes_null() {
        let df = frame(&[Some("not-a-date"), Some("2024-01-01T00:00:00Z"), None]);
        let out = parse_datetime(&df, "created_at", true).unwrap();
        let col = out.column("created_at").unwrap();
        assert_eq!(col.null_count(), 2);
    }

    // ==================== add_time_parts tests ====================

    #[test]
    fn test_add_time_parts() {
        let df = frame(&[Some("2024-03-15T13:45:00Z")]);
        let parsed = parse_datetime(&df, "created_at", true).unwrap();
        let out = add_time_parts(&parsed, "created_at").unwrap();

        let get = |name: &str| {
            out.column(name)
                .unwrap()
                .as_materialized_series()
                .i32()
                .unwrap()
                .get(0)
        };
        assert_eq!(get("year"), Some(2024));
        assert_eq!(get("month"), Some(3));
        assert_eq!(get("day"), Some(15));
        assert_eq!(get("hour"), Some(13));
        // 2024-03-15 is a Friday, Monday = 0
        assert_eq!(get("dow"), Some(4));
    }

    #[test]
    fn test_time_parts_propagate_nulls() {
        let df = frame(&[Some("garbage"), Some("2024-01-01T00:00:00Z")]);
        let parsed = parse_datetime(&df, "created_at", true).unwrap();
        let out = add_time_parts(&parsed, "created_at").unwrap();

        let years = out.column("year").unwrap().as_materialized_series();
        let years = years.i32().unwrap();
        assert_eq!(years.get(0), None);
        assert_eq!(years.get(1), Some(2024));
    }
}
