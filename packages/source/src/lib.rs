#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Input side of the crime OLAP pipeline.
//!
//! Reads raw incident exports line by line, splits each line into fields
//! with the `csv` crate, and loads the key reports written by the weekly
//! frequency jobs. Nothing here knows about column meanings; that is left
//! to the mappers in `crime_olap_aggregate`.

pub mod columns;
pub mod lines;
pub mod progress;
pub mod reports;

pub use columns::ColumnExtractor;
pub use lines::LineReader;

/// Errors that can occur while reading pipeline input.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file open/read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited-text reader rejected the line (including invalid UTF-8).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A quoted field was opened but never closed.
    #[error("Unterminated quoted field in {line:?}")]
    UnterminatedQuote {
        /// The offending line, lossily decoded.
        line: String,
    },

    /// The line contained no fields.
    #[error("Empty line")]
    EmptyLine,

    /// An input path does not exist.
    #[error("Input not found: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },
}
