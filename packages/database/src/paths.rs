#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` star schema.
//!
//! Defaults are relative to the project root's `data/` directory and can be
//! overridden with the `CRIME_OLAP_DB` environment variable.

use std::path::{Path, PathBuf};

/// Environment variable naming the star schema database file.
pub const DB_PATH_ENV: &str = "CRIME_OLAP_DB";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`. Falls back to the
/// current directory if the manifest is not nested as expected.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the default path of the star schema `DuckDB` file.
#[must_use]
pub fn star_db_path() -> PathBuf {
    data_dir().join("star.duckdb")
}

/// Returns the star schema path from `CRIME_OLAP_DB`, or
/// [`star_db_path()`] when it is unset.
#[must_use]
pub fn star_db_path_from_env() -> PathBuf {
    std::env::var_os(DB_PATH_ENV).map_or_else(star_db_path, PathBuf::from)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
