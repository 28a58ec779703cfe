//! CSV and Parquet adapters.
//!
//! The core treats these as narrow boundary contracts: a reader produces a
//! frame with whatever the source file carries (schema enforcement happens
//! later, explicitly), a writer persists deterministically and idempotently,
//! creating parent directories as needed.

use crate::error::Result;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Read a CSV file with a header row. Inference is bounded and advisory:
/// the canonical schema is imposed downstream.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    info!("Read {} rows from {}", df.height(), path.display());
    Ok(df)
}

/// Read the raw orders CSV.
pub fn read_orders_csv(path: &Path) -> Result<DataFrame> {
    read_csv(path)
}

/// Read the raw users CSV.
pub fn read_users_csv(path: &Path) -> Result<DataFrame> {
    read_csv(path)
}

/// Read a Parquet artifact.
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}

/// Write a frame as Parquet, overwriting any previous artifact.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    ParquetWriter::new(file).finish(&mut df.clone())?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Write a frame as CSV with a header row, overwriting any previous artifact.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    CsvWriter::new(file).finish(&mut df.clone())?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
