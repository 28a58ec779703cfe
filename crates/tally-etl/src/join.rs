//! Relational join with declared cardinality expectations.
//!
//! The cardinality check is owned here, before the join runs, instead of being
//! delegated to engine join options: a violation must fail with the duplicate
//! count in hand, and it must fail before any work is done on the left side.

use crate::error::{EtlError, Result};
use polars::prelude::*;
use tracing::debug;

/// Declared expectation for the right side of a left join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinCardinality {
    /// The right key must be unique: no left row can match more than once.
    ManyToOne,
    /// No uniqueness requirement; row multiplication is the caller's problem.
    ManyToMany,
}

/// Left outer join preserving every row of `left`, matching on equality of
/// `on`. Colliding non-key column names from `right` get `suffix` appended.
///
/// With [`JoinCardinality::ManyToOne`], `on` is asserted unique in `right`
/// first; a violation fails with the number of duplicated keys and nothing is
/// joined. The row-count postcondition (result length == left length) is the
/// caller's to enforce, so the caller controls what aborting means.
pub fn safe_left_join(
    left: &DataFrame,
    right: &DataFrame,
    on: &str,
    cardinality: JoinCardinality,
    suffix: &str,
) -> Result<DataFrame> {
    if cardinality == JoinCardinality::ManyToOne {
        let key = right.column(on)?.as_materialized_series();
        let unique = key.n_unique()?;
        if unique < key.len() {
            return Err(EtlError::CardinalityViolation {
                column: on.to_string(),
                duplicate_count: key.len() - unique,
            });
        }
    }

    let mut args = JoinArgs::new(JoinType::Left);
    args.suffix = Some(suffix.into());
    // keep left row order deterministic so downstream row-aligned checks hold
    args.maintain_order = MaintainOrderJoin::Left;

    let joined = left
        .clone()
        .lazy()
        .join(right.clone().lazy(), [col(on)], [col(on)], args)
        .collect()?;

    debug!(
        "Left join on '{}': {} x {} -> {} rows",
        on,
        left.height(),
        right.height(),
        joined.height()
    );
    Ok(joined)
}
