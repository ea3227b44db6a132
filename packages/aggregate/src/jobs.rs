//! The concrete pipeline jobs.
//!
//! Each function reads an incident export, runs one map/group/reduce pass,
//! and returns the rows in key order. Writing them out is left to the
//! caller (see [`crate::output::write_lines`]).

use std::path::Path;
use std::sync::Arc;

use crime_olap_crime_models::{ColumnLayout, DatedTriple, FrequencyReport};
use crime_olap_source::LineReader;
use crime_olap_source::progress::ProgressCallback;

use crate::cross_tab::{CrossTabulator, DateMapper};
use crate::engine::{Job, JobOutput};
use crate::key_extractor::{GroupBy, KeyExtractor};
use crate::week_bucket::WeekBucketReducer;
use crate::{AggregateError, DimensionCatalog};

/// Builds the weekly frequency report for every category or district in
/// `input`.
///
/// # Errors
///
/// Returns [`AggregateError`] if `input` cannot be opened or read, or a
/// reduce worker fails.
pub fn run_frequency_job(
    input: &Path,
    group: GroupBy,
    layout: &ColumnLayout,
    workers: usize,
    progress: Arc<dyn ProgressCallback>,
) -> Result<JobOutput<FrequencyReport>, AggregateError> {
    log::info!("Running {group} frequency job over {}", input.display());

    let lines = LineReader::open(input)?;
    let mapper = KeyExtractor::for_group(group, layout);
    let reducer = WeekBucketReducer::from_layout(layout);

    let output = Job::new(layout)
        .with_workers(workers)
        .with_progress(progress.clone())
        .run(lines, &mapper, &reducer)?;

    progress.finish(format!("{group}: {} keys", output.rows.len()));
    log::info!("{group} frequency job: {}", output.stats);

    Ok(output)
}

/// Tabulates `input` by date into sparse category by district counts.
///
/// # Errors
///
/// Returns [`AggregateError`] if `input` cannot be opened or read, or a
/// reduce worker fails.
pub fn run_cross_tab_job(
    input: &Path,
    catalog: &DimensionCatalog,
    layout: &ColumnLayout,
    workers: usize,
    progress: Arc<dyn ProgressCallback>,
) -> Result<JobOutput<DatedTriple>, AggregateError> {
    log::info!("Running cross-tab job over {}", input.display());

    let lines = LineReader::open(input)?;
    let mapper = DateMapper::new(layout);
    let reducer = CrossTabulator::new(catalog);

    let output = Job::new(layout)
        .with_workers(workers)
        .with_progress(progress.clone())
        .run(lines, &mapper, &reducer)?;

    progress.finish(format!("cross-tab: {} triples", output.rows.len()));
    log::info!("Cross-tab job: {}", output.stats);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::write_lines;
    use crime_olap_source::progress::null_progress;

    const INCIDENTS: &str = "\
IncidntNum,Category,Descript,DayOfWeek,Date,Time,PdDistrict
1,A,x,Monday,01/05/2015,10:00,South
2,A,x,Monday,01/05/2015,11:00,South
3,A,x,Monday,01/05/2015,12:00,South
4,B,\"with, comma\",Tuesday,01/06/2015,09:00,North
only,two
5,B,x,Sunday,02/01/2015,08:00,South
";

    fn write_input(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, INCIDENTS).unwrap();
        path
    }

    #[test]
    fn frequency_by_category() {
        let input = write_input("crime_olap_jobs_frequency.csv");
        let layout = ColumnLayout::default();

        let output =
            run_frequency_job(&input, GroupBy::Category, &layout, 2, null_progress()).unwrap();

        let lines: Vec<String> = output.rows.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "A\t0,0,3,0,0,0,0,0,0,0,0,0,0,0,0,0",
                "B\t0,0,1,0,0,0,1,0,0,0,0,0,0,0,0,0",
            ]
        );
        assert_eq!(output.stats.header_rows, 1);
        assert_eq!(output.stats.short_records, 1);

        std::fs::remove_file(&input).ok();
    }

    #[test]
    fn category_report_feeds_catalog_and_cross_tab() {
        let input = write_input("crime_olap_jobs_cross_tab.csv");
        let dir = std::env::temp_dir().join("crime_olap_jobs_reports");
        let layout = ColumnLayout::default();

        let categories =
            run_frequency_job(&input, GroupBy::Category, &layout, 1, null_progress()).unwrap();
        let districts =
            run_frequency_job(&input, GroupBy::District, &layout, 1, null_progress()).unwrap();
        write_lines(&dir.join("category.txt"), &categories.rows).unwrap();
        write_lines(&dir.join("district.txt"), &districts.rows).unwrap();

        let catalog =
            DimensionCatalog::from_reports(&dir.join("category.txt"), &dir.join("district.txt"))
                .unwrap();
        let output = run_cross_tab_job(&input, &catalog, &layout, 3, null_progress()).unwrap();

        let lines: Vec<String> = output.rows.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "2015/01/05\t0,1,3",
                "2015/01/06\t1,0,1",
                "2015/02/01\t1,1,1",
            ]
        );
        assert_eq!(output.stats.unknown_categories, 0);
        assert_eq!(output.stats.unknown_districts, 0);

        std::fs::remove_file(&input).ok();
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_input_is_fatal() {
        let missing = std::env::temp_dir().join("crime_olap_jobs_missing.csv");
        let _ = std::fs::remove_file(&missing);
        assert!(
            run_frequency_job(
                &missing,
                GroupBy::District,
                &ColumnLayout::default(),
                1,
                null_progress()
            )
            .is_err()
        );
    }
}
