//! Free-text canonicalization and vocabulary remapping.

use crate::error::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashMap;

static INNER_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Canonical status vocabulary for the orders record set.
pub static STATUS_MAPPING: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("paid", "paid"),
        ("refund", "refund"),
        ("refunded", "refund"),
    ])
});

/// Trim, lowercase and collapse internal whitespace for every non-null value.
///
/// Nulls pass through unchanged.
pub fn normalize_text(series: &Series) -> Result<Series> {
    let text = series.cast(&DataType::String)?;
    let ca = text.str()?;

    let mut values: Vec<Option<String>> = Vec::with_capacity(ca.len());
    for opt_val in ca.into_iter() {
        values.push(opt_val.map(|val| {
            let lowered = val.trim().to_lowercase();
            INNER_WHITESPACE.replace_all(&lowered, " ").into_owned()
        }));
    }

    Ok(Series::new(series.name().clone(), values))
}

/// Replace each value with `mapping[value]` where present.
///
/// Unmapped values pass through unchanged: new vocabulary shows up in the
/// output instead of crashing the run.
pub fn apply_mapping(series: &Series, mapping: &HashMap<&str, &str>) -> Result<Series> {
    let text = series.cast(&DataType::String)?;
    let ca = text.str()?;

    let mut values: Vec<Option<String>> = Vec::with_capacity(ca.len());
    for opt_val in ca.into_iter() {
        values.push(opt_val.map(|val| match mapping.get(val) {
            Some(mapped) => (*mapped).to_string(),
            None => val.to_string(),
        }));
    }

    Ok(Series::new(series.name().clone(), values))
}
