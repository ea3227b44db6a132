//! Mappers that key each incident by category or district and carry its
//! raw date to the weekly bucket reducer.

use crime_olap_crime_models::{ColumnLayout, IncidentRecord};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::JobStats;
use crate::engine::Mapper;

/// Column a frequency report is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum GroupBy {
    /// One report line per crime category.
    Category,
    /// One report line per police district.
    District,
}

/// A record was too short for the configured key/value columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("record has {found} fields, column {index} requested")]
pub struct IndexError {
    /// Number of fields in the record.
    pub found: usize,
    /// Column that was requested.
    pub index: usize,
}

/// Emits `(record[key_index], record[value_index])` for every data row.
///
/// A row whose value column equals the header sentinel (case-insensitive)
/// is treated as the file's header and filtered out. This only works as
/// long as the sentinel never occurs as genuine data, which holds for date
/// columns.
#[derive(Debug, Clone)]
pub struct KeyExtractor {
    key_index: usize,
    value_index: usize,
    header_sentinel: String,
}

impl KeyExtractor {
    /// Creates an extractor for arbitrary key and value columns.
    #[must_use]
    pub fn new(key_index: usize, value_index: usize, header_sentinel: &str) -> Self {
        Self {
            key_index,
            value_index,
            header_sentinel: header_sentinel.to_string(),
        }
    }

    /// Keys by category, carrying the date.
    #[must_use]
    pub fn category_by_date(layout: &ColumnLayout) -> Self {
        Self::new(layout.category, layout.date, &layout.header_sentinel)
    }

    /// Keys by district, carrying the date.
    #[must_use]
    pub fn district_by_date(layout: &ColumnLayout) -> Self {
        Self::new(layout.district, layout.date, &layout.header_sentinel)
    }

    /// Picks the extractor for `group`.
    #[must_use]
    pub fn for_group(group: GroupBy, layout: &ColumnLayout) -> Self {
        match group {
            GroupBy::Category => Self::category_by_date(layout),
            GroupBy::District => Self::district_by_date(layout),
        }
    }

    /// Extracts the key/value pair from `record`.
    ///
    /// Returns `Ok(None)` for a header row.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the record lacks either column.
    pub fn extract(&self, record: &IncidentRecord) -> Result<Option<(String, String)>, IndexError> {
        let key = column(record, self.key_index)?;
        let value = column(record, self.value_index)?;

        if value.trim().eq_ignore_ascii_case(&self.header_sentinel) {
            return Ok(None);
        }

        Ok(Some((key.to_string(), value.to_string())))
    }
}

fn column(record: &IncidentRecord, index: usize) -> Result<&str, IndexError> {
    record.field(index).ok_or(IndexError {
        found: record.len(),
        index,
    })
}

impl Mapper for KeyExtractor {
    type Key = String;
    type Value = String;

    fn map(
        &self,
        record: &IncidentRecord,
        emit: &mut Vec<(String, String)>,
        stats: &mut JobStats,
    ) {
        match self.extract(record) {
            Ok(Some(pair)) => emit.push(pair),
            Ok(None) => {
                log::debug!("Skipping header row");
                stats.header_rows += 1;
            }
            Err(e) => {
                log::warn!("Data {:?} did not parse into columns: {e}", record.fields());
                stats.short_records += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> IncidentRecord {
        let fields = line.split(',').map(str::to_string).collect();
        IncidentRecord::new(fields, &ColumnLayout::default()).unwrap()
    }

    #[test]
    fn extracts_category_and_district_keys() {
        let layout = ColumnLayout::default();
        let rec = record("150060275,ASSAULT,BATTERY,Monday,01/19/2015,14:00,MISSION");

        assert_eq!(
            KeyExtractor::category_by_date(&layout).extract(&rec).unwrap(),
            Some(("ASSAULT".to_string(), "01/19/2015".to_string()))
        );
        assert_eq!(
            KeyExtractor::for_group(GroupBy::District, &layout)
                .extract(&rec)
                .unwrap(),
            Some(("MISSION".to_string(), "01/19/2015".to_string()))
        );
    }

    #[test]
    fn filters_header_row() {
        let layout = ColumnLayout::default();
        let header = record("IncidntNum,Category,Descript,DayOfWeek,Date,Time,PdDistrict");
        let extractor = KeyExtractor::category_by_date(&layout);
        assert_eq!(extractor.extract(&header).unwrap(), None);

        let mut emitted = Vec::new();
        let mut stats = JobStats::default();
        extractor.map(&header, &mut emitted, &mut stats);
        assert!(emitted.is_empty());
        assert_eq!(stats.header_rows, 1);
    }

    #[test]
    fn reports_index_error_for_out_of_range_column() {
        let rec = record("1,A,x,Mon,01/05/2015,t,NORTH");
        let extractor = KeyExtractor::new(1, 9, "date");
        assert_eq!(
            extractor.extract(&rec),
            Err(IndexError { found: 7, index: 9 })
        );

        let mut emitted = Vec::new();
        let mut stats = JobStats::default();
        extractor.map(&rec, &mut emitted, &mut stats);
        assert!(emitted.is_empty());
        assert_eq!(stats.short_records, 1);
    }

    #[test]
    fn group_by_round_trips_through_strings() {
        assert_eq!(GroupBy::Category.to_string(), "category");
        assert_eq!("district".parse::<GroupBy>().unwrap(), GroupBy::District);
    }
}
