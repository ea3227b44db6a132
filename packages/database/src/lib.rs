#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Star schema persistence for the crime OLAP pipeline.
//!
//! [`StarStore`](store::StarStore) is the storage seam. [`star_db::StarDb`]
//! implements it on `DuckDB`; [`memory::MemoryStar`] keeps everything in
//! process for dry runs. [`loader`] turns cross-tab output into dimension
//! and fact rows on top of either.

pub mod loader;
pub mod memory;
pub mod paths;
pub mod star_db;
pub mod store;

use crime_olap_source::SourceError;

/// Errors that can occur during star schema operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (e.g. creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading the fact source failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A row violated a uniqueness or reference constraint.
    #[error("Constraint violation: {message}")]
    Constraint {
        /// Description of what went wrong.
        message: String,
    },
}
