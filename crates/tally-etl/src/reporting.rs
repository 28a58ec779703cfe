//! Run metadata and derived report artifacts.

use crate::config::EtlConfig;
use crate::error::Result;
use crate::io::write_csv;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Summary record of a completed pipeline run.
///
/// Created once at the end of a successful run, never mutated afterwards.
/// Every config value is stringified for portability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub rows_in_orders_raw: usize,
    pub rows_in_users: usize,
    pub rows_out_analytics: usize,
    /// Count of analytics rows whose timestamp failed to parse.
    pub missing_created_at: Option<usize>,
    /// Fraction of analytics rows that found a user (1 - null rate of country).
    pub country_match_rate: Option<f64>,
    pub config: BTreeMap<String, String>,
}

impl RunMetadata {
    /// Derive run metadata from the raw inputs and the final analytics frame.
    pub fn collect(
        orders_raw: &DataFrame,
        users: &DataFrame,
        analytics: &DataFrame,
        config: &EtlConfig,
    ) -> Self {
        let missing_created_at = analytics
            .column("created_at")
            .ok()
            .map(|col| col.null_count());

        let country_match_rate = analytics.column("country").ok().map(|col| {
            if analytics.height() == 0 {
                1.0
            } else {
                1.0 - col.null_count() as f64 / analytics.height() as f64
            }
        });

        Self {
            rows_in_orders_raw: orders_raw.height(),
            rows_in_users: users.height(),
            rows_out_analytics: analytics.height(),
            missing_created_at,
            country_match_rate,
            config: config.stringified(),
        }
    }

    /// Write the metadata document as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Wrote run metadata to {}", path.display());
        Ok(())
    }
}

/// Aggregate the analytics table into a revenue-by-country summary:
/// order count and summed revenue per country, sorted by revenue descending.
/// Orders with no matched user form their own (null-country) group.
pub fn revenue_by_country(analytics: &DataFrame) -> Result<DataFrame> {
    let summary = analytics
        .clone()
        .lazy()
        .group_by([col("country")])
        .agg([
            col("order_id").count().alias("n"),
            col("amount").sum().alias("revenue"),
        ])
        .sort(
            ["revenue"],
            SortMultipleOptions::default().with_order_descending(true),
        )
        .collect()?;
    Ok(summary)
}

/// Compute the revenue summary and persist it as a CSV report.
pub fn write_revenue_report(analytics: &DataFrame, path: &Path) -> Result<DataFrame> {
    let summary = revenue_by_country(analytics)?;
    write_csv(&summary, path)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EtlConfig, Paths};
    use pretty_assertions::assert_eq;

    fn analytics() -> DataFrame {
        df![
            "order_id" => ["o1", "o2", "o3", "o4"],
            "amount" => [Some(10.0), Some(200.0), Some(5.0), None],
            "country" => [Some("US"), Some("DE"), Some("US"), None],
            "created_at" => [Some("x"), Some("x"), Some("x"), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_collect_run_metadata() {
        let orders = df!["order_id" => ["o1", "o2", "o3", "o4"]].unwrap();
        let users = df!["user_id" => ["u1", "u2"]].unwrap();
        let config = EtlConfig::from_paths(&Paths::from_root("/tmp/t"));

        let meta = RunMetadata::collect(&orders, &users, &analytics(), &config);

        assert_eq!(meta.rows_in_orders_raw, 4);
        assert_eq!(meta.rows_in_users, 2);
        assert_eq!(meta.rows_out_analytics, 4);
        assert_eq!(meta.missing_created_at, Some(1));
        assert_eq!(meta.country_match_rate, Some(0.75));
        assert_eq!(meta.config.len(), 9);
    }

    #[test]
    fn test_metadata_without_country_column() {
        let no_country = df!["order_id" => ["o1"], "created_at" => ["x"]].unwrap();
        let orders = df!["order_id" => ["o1"]].unwrap();
        let users = df!["user_id" => ["u1"]].unwrap();
        let config = EtlConfig::from_paths(&Paths::from_root("/tmp/t"));

        let meta = RunMetadata::collect(&orders, &users, &no_country, &config);
        assert_eq!(meta.country_match_rate, None);
    }

    #[test]
    fn test_metadata_json_round_trip() {
        let config = EtlConfig::from_paths(&Paths::from_root("/tmp/t"));
        let orders = df!["order_id" => ["o1"]].unwrap();
        let users = df!["user_id" => ["u1"]].unwrap();
        let meta = RunMetadata::collect(&orders, &users, &analytics(), &config);

        let json = serde_json::to_string_pretty(&meta).unwrap();
        let back: RunMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rows_out_analytics, meta.rows_out_analytics);
    }

    #[test]
    fn test_revenue_by_country_sorted_descending() {
        let summary = revenue_by_country(&analytics()).unwrap();

        // US (15), DE (200), null (0) -> DE first
        assert_eq!(summary.height(), 3);
        let countries = summary.column("country").unwrap().as_materialized_series();
        let countries = countries.str().unwrap();
        assert_eq!(countries.get(0), Some("DE"));
        assert_eq!(countries.get(1), Some("US"));
        assert_eq!(countries.get(2), None);

        let revenue = summary.column("revenue").unwrap().as_materialized_series();
        let revenue = revenue.f64().unwrap();
        assert_eq!(revenue.get(0), Some(200.0));
        assert_eq!(revenue.get(1), Some(15.0));
    }
}
