//! Column-level transforms: text canonicalization, timestamp parsing,
//! outlier handling.

mod outliers;
mod temporal;
mod text;

pub use outliers::{add_outlier_flag, winsorize};
pub use temporal::{add_time_parts, parse_datetime};
pub use text::{apply_mapping, normalize_text, STATUS_MAPPING};
