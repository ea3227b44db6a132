#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Aggregation jobs for the crime OLAP pipeline.
//!
//! Each job is a map/group/reduce pass over an incident export:
//!
//! 1. every line is split into columns and validated against the
//!    [`ColumnLayout`](crime_olap_crime_models::ColumnLayout),
//! 2. a [`Mapper`](engine::Mapper) turns each record into zero or more
//!    key/value pairs,
//! 3. pairs are grouped by key (a full barrier: no key is reduced before
//!    every line has been mapped),
//! 4. a [`Reducer`](engine::Reducer) folds each key's values into output
//!    rows, optionally spread across worker threads by key range.
//!
//! [`jobs`] wires the concrete mappers and reducers together:
//! weekly frequency reports keyed by category or district, and the
//! per-date category by district cross-tabulation that feeds the star
//! schema loader.

pub mod catalog;
pub mod cross_tab;
pub mod engine;
pub mod jobs;
pub mod key_extractor;
pub mod output;
pub mod stats;
pub mod week_bucket;

pub use catalog::{Dimension, DimensionCatalog};
pub use stats::JobStats;

use crime_olap_source::SourceError;

/// Errors that abort a whole job.
///
/// Per-record problems never surface here; they are logged and tallied in
/// [`JobStats`].
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// Reading job input failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Writing job output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A reduce worker thread panicked.
    #[error("Reduce worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the failed worker.
        worker: usize,
    },
}
