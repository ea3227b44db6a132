//! Stage runners behind the CLI subcommands.
//!
//! Jobs and loads are synchronous and CPU or disk bound, so each runs on
//! the blocking pool. The two frequency jobs share only their input and
//! run concurrently.

use std::path::{Path, PathBuf};

use clap::Args;
use crime_olap_aggregate::DimensionCatalog;
use crime_olap_aggregate::jobs::{run_cross_tab_job, run_frequency_job};
use crime_olap_aggregate::key_extractor::GroupBy;
use crime_olap_aggregate::output::write_lines;
use crime_olap_cli_utils::{IndicatifProgress, MultiProgress};
use crime_olap_crime_models::ColumnLayout;
use crime_olap_database::loader::load_star_schema;
use crime_olap_database::memory::MemoryStar;
use crime_olap_database::paths;
use crime_olap_database::star_db::StarDb;
use crime_olap_database_models::{LoadMode, LoadSummary};

/// Where and how `load-star` writes.
#[derive(Args, Debug, Clone)]
pub struct StarTarget {
    /// `DuckDB` file for the star schema (defaults to `$CRIME_OLAP_DB`,
    /// then `data/star.duckdb`)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Keep existing rows and reuse dimension rows by name
    #[arg(long)]
    pub append: bool,

    /// Load into memory only and report what would be written
    #[arg(long)]
    pub dry_run: bool,
}

impl StarTarget {
    const fn mode(&self) -> LoadMode {
        if self.append {
            LoadMode::Append
        } else {
            LoadMode::Clean
        }
    }

    fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(paths::star_db_path_from_env)
    }
}

/// Runs the category and district frequency jobs concurrently and writes
/// both reports.
///
/// # Errors
///
/// Returns an error if the input cannot be read, a report cannot be
/// written, or a job task panics.
pub async fn frequency(
    multi: &MultiProgress,
    input: &Path,
    category_report: &Path,
    district_report: &Path,
    layout: &ColumnLayout,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let spawn = |group: GroupBy| {
        let input = input.to_path_buf();
        let layout = layout.clone();
        let progress = IndicatifProgress::lines_bar(multi, &format!("{group} frequency"));
        tokio::task::spawn_blocking(move || {
            run_frequency_job(&input, group, &layout, workers, progress)
        })
    };

    let (categories, districts) =
        tokio::try_join!(spawn(GroupBy::Category), spawn(GroupBy::District))?;
    let (categories, districts) = (categories?, districts?);

    write_lines(category_report, &categories.rows)?;
    write_lines(district_report, &districts.rows)?;

    println!(
        "category: {} keys -> {}",
        categories.rows.len(),
        category_report.display()
    );
    println!("  {}", categories.stats);
    println!(
        "district: {} keys -> {}",
        districts.rows.len(),
        district_report.display()
    );
    println!("  {}", districts.stats);

    Ok(())
}

/// Loads the catalog from the two reports and writes the dated count
/// triples for `input`.
///
/// # Errors
///
/// Returns an error if a report or the input cannot be read or the output
/// cannot be written.
pub async fn prep_olap(
    multi: &MultiProgress,
    input: &Path,
    category_report: &Path,
    district_report: &Path,
    output: &Path,
    layout: &ColumnLayout,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = DimensionCatalog::from_reports(category_report, district_report)?;

    let input = input.to_path_buf();
    let layout = layout.clone();
    let progress = IndicatifProgress::lines_bar(multi, "cross-tab");
    let result = tokio::task::spawn_blocking(move || {
        run_cross_tab_job(&input, &catalog, &layout, workers, progress)
    })
    .await??;

    write_lines(output, &result.rows)?;

    println!(
        "cross-tab: {} triples -> {}",
        result.rows.len(),
        output.display()
    );
    println!("  {}", result.stats);

    Ok(())
}

/// Loads the fact source into the star schema selected by `target`.
///
/// # Errors
///
/// Returns an error if a report or the fact source cannot be read or the
/// store cannot be opened or reset. Per-row failures are reported in the
/// returned summary instead.
pub async fn load_star(
    multi: &MultiProgress,
    category_report: &Path,
    district_report: &Path,
    fact_source: &Path,
    layout: &ColumnLayout,
    target: &StarTarget,
) -> Result<LoadSummary, Box<dyn std::error::Error>> {
    let catalog = DimensionCatalog::from_reports(category_report, district_report)?;

    let fact_source = fact_source.to_path_buf();
    let rule = layout.week_rule();
    let mode = target.mode();
    let progress = IndicatifProgress::rows_bar(multi, "star schema");

    if target.dry_run {
        log::info!("Dry run: loading into memory");
        let summary = tokio::task::spawn_blocking(move || {
            let mut store = MemoryStar::new();
            load_star_schema(&mut store, &catalog, &fact_source, rule, mode, progress)
        })
        .await??;
        return Ok(summary);
    }

    let db_path = target.db_path();
    log::info!("Loading star schema into {} ({mode})", db_path.display());

    let summary = tokio::task::spawn_blocking(move || {
        let mut store = StarDb::open(&db_path)?;
        load_star_schema(&mut store, &catalog, &fact_source, rule, mode, progress)
    })
    .await??;

    Ok(summary)
}

/// Runs every stage with intermediate files under `work_dir`.
///
/// # Errors
///
/// Returns the first stage error.
pub async fn run_all(
    multi: &MultiProgress,
    input: &Path,
    work_dir: &Path,
    layout: &ColumnLayout,
    workers: usize,
    target: &StarTarget,
) -> Result<LoadSummary, Box<dyn std::error::Error>> {
    let category_report = work_dir.join("category.txt");
    let district_report = work_dir.join("district.txt");
    let cross_tab = work_dir.join("cross_tab.txt");

    frequency(
        multi,
        input,
        &category_report,
        &district_report,
        layout,
        workers,
    )
    .await?;
    prep_olap(
        multi,
        input,
        &category_report,
        &district_report,
        &cross_tab,
        layout,
        workers,
    )
    .await?;
    load_star(
        multi,
        &category_report,
        &district_report,
        &cross_tab,
        layout,
        target,
    )
    .await
}

/// Prints the load summary and fails when any store operation failed.
///
/// # Errors
///
/// Returns an error naming the failure count if `summary.failed > 0`.
pub fn report_load(summary: &LoadSummary) -> Result<(), Box<dyn std::error::Error>> {
    println!("star schema: {summary}");

    if summary.has_failures() {
        return Err(format!("{} star schema operations failed", summary.failed).into());
    }

    Ok(())
}
