#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular input and output for the backbone pipeline.
//!
//! Inputs are CSV files whose required columns are checked up front; a
//! missing column aborts the run with [`TableError::MissingColumns`].
//! Individual malformed rows are logged and skipped. Outputs are CSV tables
//! plus one `GeoJSON` `FeatureCollection` per constructed census year.
//! Death-linkage tables are also read back so reruns can merge by year.

pub mod input;
pub mod layer;
pub mod output;

use std::path::Path;

pub use input::{
    list_death_files, read_death_districts, read_linkage_summary, read_official_centroids,
    read_parishes, read_prior_imputations, read_source_records, read_unlinked_districts,
};
pub use layer::{layer_path, write_layer};

/// Errors from reading or writing pipeline tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An input table lacks required columns.
    #[error("{table} table is missing required column(s): {}", columns.join(", "))]
    MissingColumns {
        /// Which input table.
        table: String,
        /// Every required column that was absent.
        columns: Vec<String>,
    },
}

/// Checks that `headers` contains every column in `required`.
///
/// # Errors
///
/// Returns [`TableError::MissingColumns`] listing all absent columns.
pub fn require_columns(
    table: &str,
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<(), TableError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .map(|col| (*col).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TableError::MissingColumns {
            table: table.to_string(),
            columns: missing,
        })
    }
}

/// Creates the parent directory of `path` if it has one.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent(path: &Path) -> Result<(), TableError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_missing_column() {
        let headers = csv::StringRecord::from(vec!["parish", " district "]);
        let err = require_columns("source", &headers, &["parish", "district", "from_year", "to_year"])
            .unwrap_err();

        match &err {
            TableError::MissingColumns { table, columns } => {
                assert_eq!(table, "source");
                assert_eq!(columns, &["from_year", "to_year"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            "source table is missing required column(s): from_year, to_year"
        );
    }

    #[test]
    fn accepts_complete_headers() {
        let headers = csv::StringRecord::from(vec!["id", "name", "geometry", "extra"]);
        assert!(require_columns("parishes", &headers, &["id", "name", "geometry"]).is_ok());
    }
}
