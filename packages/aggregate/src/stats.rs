//! Per-job tallies of processed and skipped records.

use std::fmt;

/// Counters collected while a job runs.
///
/// Every skipped line or value increments exactly one of the skip
/// counters, so a job's summary distinguishes successfully aggregated
/// records from each kind of failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Lines read from the input.
    pub lines_read: u64,
    /// Key/value pairs emitted by the mapper.
    pub pairs_emitted: u64,
    /// Lines the column extractor could not split.
    pub malformed_lines: u64,
    /// Lines with fewer columns than the layout requires.
    pub short_records: u64,
    /// Header rows filtered out by the sentinel check.
    pub header_rows: u64,
    /// Date values that failed to parse.
    pub invalid_dates: u64,
    /// Dates whose weekly bucket falls outside the report window.
    pub out_of_range_dates: u64,
    /// Values naming a category missing from the catalog.
    pub unknown_categories: u64,
    /// Values naming a district missing from the catalog.
    pub unknown_districts: u64,
    /// Distinct keys reduced.
    pub keys_reduced: u64,
    /// Output rows produced.
    pub outputs: u64,
}

impl JobStats {
    /// Adds every counter of `other` into `self`.
    pub const fn merge(&mut self, other: &Self) {
        self.lines_read += other.lines_read;
        self.pairs_emitted += other.pairs_emitted;
        self.malformed_lines += other.malformed_lines;
        self.short_records += other.short_records;
        self.header_rows += other.header_rows;
        self.invalid_dates += other.invalid_dates;
        self.out_of_range_dates += other.out_of_range_dates;
        self.unknown_categories += other.unknown_categories;
        self.unknown_districts += other.unknown_districts;
        self.keys_reduced += other.keys_reduced;
        self.outputs += other.outputs;
    }

    /// Total number of lines or values dropped for any reason other than
    /// being a header row.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.malformed_lines
            + self.short_records
            + self.invalid_dates
            + self.out_of_range_dates
            + self.unknown_categories
            + self.unknown_districts
    }
}

impl fmt::Display for JobStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines read, {} pairs emitted, {} keys reduced, {} rows written; \
             skipped {} (malformed {}, short {}, invalid date {}, out of range {}, \
             unknown category {}, unknown district {}), {} header rows",
            self.lines_read,
            self.pairs_emitted,
            self.keys_reduced,
            self.outputs,
            self.skipped(),
            self.malformed_lines,
            self.short_records,
            self.invalid_dates,
            self.out_of_range_dates,
            self.unknown_categories,
            self.unknown_districts,
            self.header_rows,
        )
    }
}
