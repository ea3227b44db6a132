#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime OLAP pipeline.
//!
//! Each subcommand runs one stage; `pipeline` chains all of them. Logging
//! goes through [`crime_olap_cli_utils::init_logger`] so log lines and
//! progress spinners share the terminal.

mod config;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "crime_olap", about = "Crime incident aggregation and star schema loading")]
struct Cli {
    /// TOML file overriding column positions and calendar settings
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    /// Number of reduce worker threads per job
    #[arg(long, global = true, default_value = "1")]
    workers: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build weekly frequency reports by category and by district
    Frequency {
        /// Raw incident export
        input: PathBuf,
        /// Output path for the category report
        category_report: PathBuf,
        /// Output path for the district report
        district_report: PathBuf,
    },
    /// Tabulate incidents per date into category/district count triples
    PrepOlap {
        /// Raw incident export
        input: PathBuf,
        /// Category report written by `frequency`
        category_report: PathBuf,
        /// District report written by `frequency`
        district_report: PathBuf,
        /// Output path for the dated count triples
        output: PathBuf,
    },
    /// Load dated count triples into the star schema
    LoadStar {
        /// Category report written by `frequency`
        category_report: PathBuf,
        /// District report written by `frequency`
        district_report: PathBuf,
        /// Triples written by `prep-olap`
        fact_source: PathBuf,
        #[command(flatten)]
        target: pipeline::StarTarget,
    },
    /// Run frequency, prep-olap, and load-star end to end
    Pipeline {
        /// Raw incident export
        input: PathBuf,
        /// Directory for intermediate reports and triples
        work_dir: PathBuf,
        #[command(flatten)]
        target: pipeline::StarTarget,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_olap_cli_utils::init_logger();
    let cli = Cli::parse();

    let layout = config::load_layout(cli.layout.as_deref())?;
    let workers = cli.workers;

    match cli.command {
        Commands::Frequency {
            input,
            category_report,
            district_report,
        } => {
            pipeline::frequency(
                &multi,
                &input,
                &category_report,
                &district_report,
                &layout,
                workers,
            )
            .await?;
        }
        Commands::PrepOlap {
            input,
            category_report,
            district_report,
            output,
        } => {
            pipeline::prep_olap(
                &multi,
                &input,
                &category_report,
                &district_report,
                &output,
                &layout,
                workers,
            )
            .await?;
        }
        Commands::LoadStar {
            category_report,
            district_report,
            fact_source,
            target,
        } => {
            let summary = pipeline::load_star(
                &multi,
                &category_report,
                &district_report,
                &fact_source,
                &layout,
                &target,
            )
            .await?;
            pipeline::report_load(&summary)?;
        }
        Commands::Pipeline {
            input,
            work_dir,
            target,
        } => {
            let summary =
                pipeline::run_all(&multi, &input, &work_dir, &layout, workers, &target).await?;
            pipeline::report_load(&summary)?;
        }
    }

    Ok(())
}
