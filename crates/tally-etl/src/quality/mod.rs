//! Data-quality checks: hard gates and missingness analysis.

mod gate;
mod missingness;

pub use gate::{assert_in_range, assert_non_empty, assert_unique_key, require_columns};
pub use missingness::{add_missing_flags, missingness_report};
