//! The batch ETL runner.
//!
//! Each stage is a pure frame-in/frame-out step; the runner owns the order,
//! the fail-fast behavior, and the rule that nothing is persisted until every
//! earlier stage has succeeded.

use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use crate::io::{read_orders_csv, read_users_csv, write_parquet};
use crate::join::{safe_left_join, JoinCardinality};
use crate::pipeline::stages::EtlStage;
use crate::quality::{
    add_missing_flags, assert_in_range, assert_non_empty, assert_unique_key, missingness_report,
    require_columns,
};
use crate::reporting::{write_revenue_report, RunMetadata};
use crate::schema::{enforce_orders_schema, enforce_users_schema};
use crate::transform::{
    add_outlier_flag, add_time_parts, apply_mapping, normalize_text, parse_datetime, winsorize,
    STATUS_MAPPING,
};
use polars::prelude::*;
use tracing::info;

/// Columns every orders input must carry.
pub const REQUIRED_ORDERS_COLUMNS: [&str; 6] = [
    "order_id",
    "user_id",
    "amount",
    "quantity",
    "created_at",
    "status",
];

/// Columns every users input must carry.
pub const REQUIRED_USERS_COLUMNS: [&str; 3] = ["user_id", "country", "signup_date"];

/// Winsorization percentile bounds for the amount column.
const WINSOR_LOWER_PCT: f64 = 0.01;
const WINSOR_UPPER_PCT: f64 = 0.99;

/// IQR multiplier for the outlier flag.
const OUTLIER_IQR_K: f64 = 1.5;

/// Result of a successful end-to-end run.
#[derive(Debug)]
pub struct RunOutcome {
    pub analytics: DataFrame,
    pub metadata: RunMetadata,
}

/// The batch pipeline: composes gates, transforms, the safe join and the
/// enrichment steps into the orders -> clean -> joined -> analytics flow.
pub struct EtlPipeline {
    config: EtlConfig,
}

impl EtlPipeline {
    pub fn new(config: EtlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Read the raw orders and users inputs.
    pub fn load_inputs(&self) -> Result<(DataFrame, DataFrame)> {
        let orders = read_orders_csv(&self.config.raw_orders)?;
        let users = read_users_csv(&self.config.raw_users)?;
        Ok((orders, users))
    }

    /// Run every quality gate on the raw inputs.
    pub fn validate(orders_raw: &DataFrame, users: &DataFrame) -> Result<()> {
        require_columns(orders_raw, &REQUIRED_ORDERS_COLUMNS, "orders")?;
        require_columns(users, &REQUIRED_USERS_COLUMNS, "users")?;
        assert_non_empty(orders_raw, "orders")?;
        assert_non_empty(users, "users")?;
        assert_unique_key(orders_raw, "order_id")?;
        assert_unique_key(users, "user_id")?;
        Ok(())
    }

    /// Clean the raw orders: canonical schema, status vocabulary, missing
    /// flags, timestamp parsing, calendar parts, range checks.
    ///
    /// Returns the cleaned frame and the missingness report computed over the
    /// schema-enforced input (flags are derived from the same view, so the
    /// report and the flags agree on what was absent).
    pub fn transform_orders(orders_raw: &DataFrame) -> Result<(DataFrame, DataFrame)> {
        let enforced = enforce_orders_schema(orders_raw)?;

        let status = enforced.column("status")?.as_materialized_series();
        let normalized = normalize_text(status)?;
        let mut status_clean = apply_mapping(&normalized, &STATUS_MAPPING)?;
        status_clean.rename("status_clean".into());

        let mut with_status = enforced.clone();
        with_status.with_column(status_clean)?;

        let flagged = add_missing_flags(&with_status, &["amount", "quantity"])?;
        let report = missingness_report(&enforced)?;

        let parsed = parse_datetime(&flagged, "created_at", true)?;
        let cleaned = add_time_parts(&parsed, "created_at")?;

        assert_in_range(&cleaned, "amount", 0.0)?;
        assert_in_range(&cleaned, "quantity", 0.0)?;

        Ok((cleaned, report))
    }

    /// Enforce the canonical users schema.
    pub fn prepare_users(users_raw: &DataFrame) -> Result<DataFrame> {
        enforce_users_schema(users_raw)
    }

    /// Join cleaned orders with users, enforcing the many-to-one expectation
    /// and the row-count postcondition.
    pub fn join_users(orders: &DataFrame, users: &DataFrame) -> Result<DataFrame> {
        let joined = safe_left_join(orders, users, "user_id", JoinCardinality::ManyToOne, "_user")?;
        if joined.height() != orders.height() {
            return Err(EtlError::JoinExplosion {
                before: orders.height(),
                after: joined.height(),
            });
        }
        Ok(joined)
    }

    /// Derive the analytic columns: winsorized amount and outlier flag.
    pub fn enrich(joined: &DataFrame) -> Result<DataFrame> {
        let amount = joined.column("amount")?.as_materialized_series();
        let mut winsor = winsorize(amount, WINSOR_LOWER_PCT, WINSOR_UPPER_PCT)?;
        winsor.rename("amount_winsor".into());

        let mut out = joined.clone();
        out.with_column(winsor)?;
        add_outlier_flag(&out, "amount", OUTLIER_IQR_K)
    }

    /// Run the full pipeline.
    ///
    /// Persistence is the final observable side effect: a failure in any
    /// earlier stage leaves no artifact behind.
    pub fn run(&self) -> Result<RunOutcome> {
        info!("[{}] Reading raw inputs", EtlStage::Loaded.display_name());
        let (orders_raw, users_raw) = self.load_inputs()?;
        info!(
            "Loaded orders={} rows, users={} rows",
            orders_raw.height(),
            users_raw.height()
        );

        info!("[{}] Running quality gates", EtlStage::Validated.display_name());
        Self::validate(&orders_raw, &users_raw)?;

        info!("[{}] Cleaning orders", EtlStage::Transformed.display_name());
        let users = Self::prepare_users(&users_raw)?;
        let (orders_clean, missingness) = Self::transform_orders(&orders_raw)?;

        info!("[{}] Joining orders with users", EtlStage::Joined.display_name());
        let joined = Self::join_users(&orders_clean, &users)?;

        info!("[{}] Deriving analytic columns", EtlStage::Enriched.display_name());
        let analytics = Self::enrich(&joined)?;

        info!("[{}] Writing artifacts", EtlStage::Persisted.display_name());
        write_parquet(&users, &self.config.out_users)?;
        write_parquet(&orders_clean, &self.config.out_orders_clean)?;
        write_parquet(&analytics, &self.config.out_analytics)?;
        write_parquet(&missingness, &self.config.missingness_report)?;
        write_revenue_report(&analytics, &self.config.revenue_by_country)?;

        let metadata = RunMetadata::collect(&orders_raw, &users, &analytics, &self.config);
        metadata.write(&self.config.run_meta)?;

        info!(
            "Run complete: {} analytics rows, country match rate {:?}",
            metadata.rows_out_analytics, metadata.country_match_rate
        );
        Ok(RunOutcome { analytics, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn orders_raw() -> DataFrame {
        df![
            "order_id" => ["o1", "o2", "o3"],
            "user_id" => ["u1", "u2", "u1"],
            "amount" => [Some(100.0), None, Some(40.0)],
            "quantity" => [Some(1i64), Some(2), None],
            "created_at" => [Some("2024-01-01T00:00:00Z"), Some("2024-02-05T10:30:00Z"), None],
            "status" => [" Paid ", "REFUNDED", "shipped"],
        ]
        .unwrap()
    }

    fn users_raw() -> DataFrame {
        df![
            "user_id" => ["u1", "u2"],
            "country" => [Some("US"), None],
            "signup_date" => ["2023-01-01", "2023-06-01"],
        ]
        .unwrap()
    }

    #[test]
    fn test_validate_passes_on_good_inputs() {
        assert!(EtlPipeline::validate(&orders_raw(), &users_raw()).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_order_ids() {
        let dup = df![
            "order_id" => ["o1", "o1"],
            "user_id" => ["u1", "u2"],
            "amount" => [1.0, 2.0],
            "quantity" => [1i64, 1],
            "created_at" => ["2024-01-01", "2024-01-02"],
            "status" => ["paid", "paid"],
        ]
        .unwrap();

        let err = EtlPipeline::validate(&dup, &users_raw()).unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_KEY");
    }

    #[test]
    fn test_transform_orders_derives_all_columns() {
        let (cleaned, report) = EtlPipeline::transform_orders(&orders_raw()).unwrap();

        for col in [
            "status_clean",
            "amount_missing",
            "quantity_missing",
            "year",
            "month",
            "day",
            "hour",
            "dow",
        ] {
            assert!(cleaned.column(col).is_ok(), "missing derived column {col}");
        }

        let status = cleaned.column("status_clean").unwrap().as_materialized_series();
        let status = status.str().unwrap();
        assert_eq!(status.get(0), Some("paid"));
        assert_eq!(status.get(1), Some("refund"));
        // unmapped vocabulary passes through
        assert_eq!(status.get(2), Some("shipped"));

        // report covers the schema-enforced input columns
        assert_eq!(report.height(), orders_raw().width());
    }

    #[test]
    fn test_transform_rejects_negative_amounts() {
        let mut bad = orders_raw();
        bad.replace(
            "amount",
            Series::new("amount".into(), &[Some(-5.0), Some(1.0), Some(2.0)]),
        )
        .unwrap();

        let err = EtlPipeline::transform_orders(&bad).unwrap_err();
        assert_eq!(err.error_code(), "RANGE_VIOLATION");
    }

    #[test]
    fn test_join_users_row_count_law() {
        let (cleaned, _) = EtlPipeline::transform_orders(&orders_raw()).unwrap();
        let users = EtlPipeline::prepare_users(&users_raw()).unwrap();

        let joined = EtlPipeline::join_users(&cleaned, &users).unwrap();
        assert_eq!(joined.height(), cleaned.height());
        assert!(joined.column("country").is_ok());
    }

    #[test]
    fn test_join_users_rejects_duplicate_user_keys() {
        let (cleaned, _) = EtlPipeline::transform_orders(&orders_raw()).unwrap();
        let dup_users = df![
            "user_id" => ["u1", "u1"],
            "country" => [Some("US"), Some("US")],
            "signup_date" => ["2023-01-01", "2023-01-01"],
        ]
        .unwrap();

        let err = EtlPipeline::join_users(&cleaned, &dup_users).unwrap_err();
        assert_eq!(err.error_code(), "CARDINALITY_VIOLATION");
    }

    #[test]
    fn test_enrich_adds_winsor_and_flag() {
        let (cleaned, _) = EtlPipeline::transform_orders(&orders_raw()).unwrap();
        let users = EtlPipeline::prepare_users(&users_raw()).unwrap();
        let joined = EtlPipeline::join_users(&cleaned, &users).unwrap();

        let analytics = EtlPipeline::enrich(&joined).unwrap();
        assert!(analytics.column("amount_winsor").is_ok());
        assert!(analytics.column("amount_is_outlier").is_ok());
        assert_eq!(analytics.height(), joined.height());

        // null amount keeps a null winsor value but a false outlier flag
        let winsor = analytics.column("amount_winsor").unwrap();
        assert_eq!(winsor.null_count(), 1);
        let flags = analytics.column("amount_is_outlier").unwrap();
        assert_eq!(flags.null_count(), 0);
    }
}
