//! Pipeline stage state machine.

use serde::{Deserialize, Serialize};

/// Stages of a pipeline run, in order.
///
/// Transitions are one-way and fail fast: a validation or cardinality failure
/// in an earlier stage aborts the run before any artifact is written, so a
/// failed run leaves no partial outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtlStage {
    /// Raw inputs are in memory.
    Loaded,
    /// Quality gates have passed on the raw inputs.
    Validated,
    /// Schema, text, missingness and temporal transforms are applied.
    Transformed,
    /// Orders are joined with users, row count verified.
    Joined,
    /// Winsorized amount and outlier flags are derived.
    Enriched,
    /// All artifacts and run metadata are written.
    Persisted,
}

impl EtlStage {
    /// Human-readable name for logging.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loaded => "Loaded",
            Self::Validated => "Validated",
            Self::Transformed => "Transformed",
            Self::Joined => "Joined",
            Self::Enriched => "Enriched",
            Self::Persisted => "Persisted",
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Loaded => Some(Self::Validated),
            Self::Validated => Some(Self::Transformed),
            Self::Transformed => Some(Self::Joined),
            Self::Joined => Some(Self::Enriched),
            Self::Enriched => Some(Self::Persisted),
            Self::Persisted => None,
        }
    }
}
