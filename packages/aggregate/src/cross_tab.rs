//! Per-date category by district tabulation.
//!
//! [`DateMapper`] re-keys every incident by its date, carrying the raw
//! category and district names. [`CrossTabulator`] then counts each date's
//! incidents into a dense `categories x districts` matrix and emits the
//! non-zero cells as [`DatedTriple`]s, categories first, then districts.

use chrono::NaiveDate;
use crime_olap_crime_models::{
    ColumnLayout, CountTriple, DatedTriple, IncidentRecord, parse_incident_date,
};

use crate::engine::{Mapper, Reducer};
use crate::{DimensionCatalog, JobStats};

/// Raw names carried from the map side to the cross-tab reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentPair {
    /// District name as it appears in the input.
    pub district: String,
    /// Category name as it appears in the input.
    pub category: String,
}

/// Keys incidents by their parsed date.
#[derive(Debug, Clone)]
pub struct DateMapper {
    layout: ColumnLayout,
}

impl DateMapper {
    #[must_use]
    pub fn new(layout: &ColumnLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }
}

impl Mapper for DateMapper {
    type Key = NaiveDate;
    type Value = IncidentPair;

    fn map(
        &self,
        record: &IncidentRecord,
        emit: &mut Vec<(NaiveDate, IncidentPair)>,
        stats: &mut JobStats,
    ) {
        let (Some(date), Some(category), Some(district)) = (
            record.field(self.layout.date),
            record.field(self.layout.category),
            record.field(self.layout.district),
        ) else {
            log::warn!("Data {:?} did not parse into columns", record.fields());
            stats.short_records += 1;
            return;
        };

        if self.layout.is_header_value(date) {
            stats.header_rows += 1;
            return;
        }

        match parse_incident_date(date) {
            Ok(date) => emit.push((
                date,
                IncidentPair {
                    district: district.to_string(),
                    category: category.to_string(),
                },
            )),
            Err(e) => {
                log::warn!("Data {:?} has an invalid date: {e}", record.fields());
                stats.invalid_dates += 1;
            }
        }
    }
}

/// Counts one date's incidents per (category, district) cell.
#[derive(Debug, Clone, Copy)]
pub struct CrossTabulator<'a> {
    catalog: &'a DimensionCatalog,
}

impl<'a> CrossTabulator<'a> {
    #[must_use]
    pub const fn new(catalog: &'a DimensionCatalog) -> Self {
        Self { catalog }
    }

    /// Builds the sparse triples for one date.
    ///
    /// Pairs naming a category or district outside the catalog are logged
    /// and dropped.
    pub fn tabulate(
        &self,
        date: NaiveDate,
        pairs: &[IncidentPair],
        stats: &mut JobStats,
    ) -> Vec<DatedTriple> {
        let districts = self.catalog.districts.len();
        let mut counts = vec![0u32; self.catalog.categories.len() * districts];

        for pair in pairs {
            let Some(category) = self.catalog.index_of_category(&pair.category) else {
                log::warn!("Unknown category {:?} on {date}", pair.category);
                stats.unknown_categories += 1;
                continue;
            };
            let Some(district) = self.catalog.index_of_district(&pair.district) else {
                log::warn!("Unknown district {:?} on {date}", pair.district);
                stats.unknown_districts += 1;
                continue;
            };
            counts[category * districts + district] += 1;
        }

        counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(cell, &count)| DatedTriple {
                date,
                triple: CountTriple {
                    category_index: cell / districts,
                    district_index: cell % districts,
                    count,
                },
            })
            .collect()
    }
}

impl Reducer<NaiveDate, IncidentPair> for CrossTabulator<'_> {
    type Output = DatedTriple;

    fn reduce(
        &self,
        key: &NaiveDate,
        values: Vec<IncidentPair>,
        out: &mut Vec<DatedTriple>,
        stats: &mut JobStats,
    ) {
        out.extend(self.tabulate(*key, &values, stats));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> DimensionCatalog {
        DimensionCatalog::build(["B", "A"], ["South", "North"])
    }

    fn pair(category: &str, district: &str) -> IncidentPair {
        IncidentPair {
            district: district.to_string(),
            category: category.to_string(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, 5).unwrap()
    }

    #[test]
    fn emits_non_zero_cells_in_category_then_district_order() {
        let catalog = catalog();
        let mut stats = JobStats::default();
        let rows = CrossTabulator::new(&catalog).tabulate(
            date(),
            &[
                pair("B", "North"),
                pair("A", "South"),
                pair("A", "South"),
                pair("A", "South"),
            ],
            &mut stats,
        );

        let lines: Vec<String> = rows.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["2015/01/05\t0,1,3", "2015/01/05\t1,0,1"]);
        assert!(rows.iter().all(|row| row.triple.count > 0));
    }

    #[test]
    fn drops_unknown_names_and_counts_them() {
        let catalog = catalog();
        let mut stats = JobStats::default();
        let rows = CrossTabulator::new(&catalog).tabulate(
            date(),
            &[pair("A", "North"), pair("Z", "North"), pair("A", "East")],
            &mut stats,
        );

        let total: u32 = rows.iter().map(|row| row.triple.count).sum();
        assert_eq!(total, 1);
        assert_eq!(stats.unknown_categories, 1);
        assert_eq!(stats.unknown_districts, 1);
    }

    #[test]
    fn empty_catalog_emits_nothing() {
        let catalog = DimensionCatalog::default();
        let mut stats = JobStats::default();
        let rows = CrossTabulator::new(&catalog).tabulate(date(), &[pair("A", "North")], &mut stats);
        assert!(rows.is_empty());
        assert_eq!(stats.unknown_categories, 1);
    }

    #[test]
    fn date_mapper_skips_header_and_bad_dates() {
        let layout = ColumnLayout::default();
        let mapper = DateMapper::new(&layout);
        let mut emitted = Vec::new();
        let mut stats = JobStats::default();

        for line in [
            "IncidntNum,Category,Descript,DayOfWeek,Date,Time,PdDistrict",
            "1,A,x,Monday,01/05/2015 12:00:00 AM,t,North",
            "2,B,x,Monday,2015-01-05,t,South",
        ] {
            let fields = line.split(',').map(str::to_string).collect();
            let record = IncidentRecord::new(fields, &layout).unwrap();
            mapper.map(&record, &mut emitted, &mut stats);
        }

        assert_eq!(emitted, vec![(date(), pair("A", "North"))]);
        assert_eq!(stats.header_rows, 1);
        assert_eq!(stats.invalid_dates, 1);
    }
}
