//! Filesystem layout and resolved run configuration.
//!
//! The pipeline never computes paths on its own: everything it reads or
//! writes is resolved here once, up front, and passed in as opaque values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data root directory.
pub const DATA_ROOT_ENV: &str = "TALLY_DATA_ROOT";

/// Resolved directory layout under a single data root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub root: PathBuf,
    pub raw: PathBuf,
    pub cache: PathBuf,
    pub processed: PathBuf,
    pub external: PathBuf,
    pub reports: PathBuf,
}

impl Paths {
    /// Derive the standard layout from a root directory.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data = root.join("data");
        Self {
            raw: data.join("raw"),
            cache: data.join("cache"),
            processed: data.join("processed"),
            external: data.join("external"),
            reports: data.join("reports"),
            root,
        }
    }

    /// Resolve the data root: explicit override, then `TALLY_DATA_ROOT`,
    /// then the current directory.
    pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(env_root) = std::env::var(DATA_ROOT_ENV)
            && !env_root.trim().is_empty()
        {
            return PathBuf::from(env_root);
        }
        PathBuf::from(".")
    }
}

/// Every file location a pipeline run touches, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub raw_orders: PathBuf,
    pub raw_users: PathBuf,
    pub out_orders: PathBuf,
    pub out_orders_clean: PathBuf,
    pub out_users: PathBuf,
    pub out_analytics: PathBuf,
    pub missingness_report: PathBuf,
    pub revenue_by_country: PathBuf,
    pub run_meta: PathBuf,
}

impl EtlConfig {
    /// Build the run configuration from a resolved directory layout.
    pub fn from_paths(paths: &Paths) -> Self {
        Self {
            raw_orders: paths.raw.join("orders.csv"),
            raw_users: paths.raw.join("users.csv"),
            out_orders: paths.processed.join("orders.parquet"),
            out_orders_clean: paths.processed.join("orders_clean.parquet"),
            out_users: paths.processed.join("users.parquet"),
            out_analytics: paths.processed.join("analytics_table.parquet"),
            missingness_report: paths.reports.join("missingness_report.parquet"),
            revenue_by_country: paths.reports.join("revenue_by_country.csv"),
            run_meta: paths.processed.join("run_meta.json"),
        }
    }

    /// Stringify every configured path for portable embedding in run metadata.
    pub fn stringified(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("raw_orders".to_string(), self.raw_orders.display().to_string());
        map.insert("raw_users".to_string(), self.raw_users.display().to_string());
        map.insert("out_orders".to_string(), self.out_orders.display().to_string());
        map.insert(
            "out_orders_clean".to_string(),
            self.out_orders_clean.display().to_string(),
        );
        map.insert("out_users".to_string(), self.out_users.display().to_string());
        map.insert(
            "out_analytics".to_string(),
            self.out_analytics.display().to_string(),
        );
        map.insert(
            "missingness_report".to_string(),
            self.missingness_report.display().to_string(),
        );
        map.insert(
            "revenue_by_country".to_string(),
            self.revenue_by_country.display().to_string(),
        );
        map.insert("run_meta".to_string(), self.run_meta.display().to_string());
        map
    }
}
