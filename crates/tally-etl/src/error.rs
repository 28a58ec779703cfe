//! Custom error types for the ETL pipeline.
//!
//! This module provides the error taxonomy using `thiserror`. Validation
//! failures carry the offending column and a bounded sample of offending
//! values so a failed run is diagnosable from the message alone.
//!
//! Errors are serializable so they can be embedded in run reports.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the ETL pipeline.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Required columns are missing from a dataset.
    #[error("Dataset '{label}' is missing required columns: {missing:?}")]
    Schema { label: String, missing: Vec<String> },

    /// A dataset that must contain rows is empty.
    #[error("Dataset '{label}' is empty")]
    EmptyDataset { label: String },

    /// A key column contains duplicate values.
    #[error(
        "Key column '{column}' has {count} duplicate value(s), sample: {sample:?}"
    )]
    DuplicateKey {
        column: String,
        count: usize,
        sample: Vec<String>,
    },

    /// Non-null values fall below the declared lower bound.
    #[error("Column '{column}' has {violations} value(s) below {lower}")]
    RangeViolation {
        column: String,
        lower: f64,
        violations: usize,
    },

    /// The right side of a many-to-one join has duplicate keys.
    #[error(
        "Join column '{column}' is not unique on the right side ({duplicate_count} duplicated key(s))"
    )]
    CardinalityViolation {
        column: String,
        duplicate_count: usize,
    },

    /// A left join changed the row count.
    #[error("Left join changed the row count: {before} rows in, {after} rows out")]
    JoinExplosion { before: usize, after: usize },

    /// Strict parse failure, for contexts where best-effort-to-null does not apply.
    #[error("Failed to parse column '{column}': {reason}")]
    Parse { column: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EtlError {
    /// Get a stable error code for log filtering and report embedding.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::EmptyDataset { .. } => "EMPTY_DATASET",
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::RangeViolation { .. } => "RANGE_VIOLATION",
            Self::CardinalityViolation { .. } => "CARDINALITY_VIOLATION",
            Self::JoinExplosion { .. } => "JOIN_EXPLOSION",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Check whether this error came from a data-quality gate rather than
    /// from the environment (IO, serialization, engine).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Schema { .. }
                | Self::EmptyDataset { .. }
                | Self::DuplicateKey { .. }
                | Self::RangeViolation { .. }
                | Self::CardinalityViolation { .. }
                | Self::JoinExplosion { .. }
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for EtlError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EtlError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;
