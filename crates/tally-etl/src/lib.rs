//! Batch ETL Pipeline Library
//!
//! A batch ETL pipeline for order analytics built with Rust and Polars.
//!
//! # Overview
//!
//! This library ingests raw order and user records, validates and cleans
//! them, joins them safely, derives analytic columns and persists columnar
//! artifacts plus run metadata:
//!
//! - **Quality Gates**: required columns, non-empty datasets, unique keys,
//!   numeric range assertions; all fail fast with typed errors
//! - **Schema Enforcement**: an explicit canonical schema applied with
//!   best-effort per-cell coercion (bad cells become null, never a crash)
//! - **Text Normalization**: status vocabulary canonicalization with
//!   pass-through for unmapped values
//! - **Missingness Analysis**: per-column null statistics and missing flags
//! - **Temporal Parsing**: multi-format timestamp parsing to UTC plus
//!   calendar parts
//! - **Outlier Handling**: percentile winsorization and IQR flagging
//! - **Safe Joins**: left joins with declared cardinality expectations that
//!   refuse to silently multiply rows
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tally_etl::{EtlConfig, EtlPipeline, Paths};
//!
//! let paths = Paths::from_root("/srv/tally");
//! let pipeline = EtlPipeline::new(EtlConfig::from_paths(&paths));
//!
//! let outcome = pipeline.run()?;
//! println!("{} analytics rows", outcome.metadata.rows_out_analytics);
//! ```
//!
//! # Error Handling
//!
//! Validation failures ([`EtlError::DuplicateKey`],
//! [`EtlError::CardinalityViolation`], ...) abort the run before any artifact
//! is written; a failed run leaves no partial outputs. Best-effort coercions
//! (schema enforcement, timestamp parsing) instead turn bad cells into nulls,
//! and the damage is surfaced through the missingness report and the explicit
//! range/emptiness assertions downstream.

pub mod config;
pub mod error;
pub mod io;
pub mod join;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod schema;
pub mod transform;
pub mod utils;

// Re-exports for convenient access
pub use config::{EtlConfig, Paths};
pub use error::{EtlError, Result as EtlResult};
pub use join::{safe_left_join, JoinCardinality};
pub use pipeline::{EtlPipeline, EtlStage, RunOutcome};
pub use quality::{
    add_missing_flags, assert_in_range, assert_non_empty, assert_unique_key, missingness_report,
    require_columns,
};
pub use reporting::{revenue_by_country, RunMetadata};
pub use schema::{enforce_orders_schema, enforce_users_schema, SemanticType};
pub use transform::{
    add_outlier_flag, add_time_parts, apply_mapping, normalize_text, parse_datetime, winsorize,
};
