#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Star schema row types and loader summaries.
//!
//! These types mirror the four tables of the OLAP store: the `category`,
//! `district`, and `timeperiod` dimensions and the `fact` table that
//! references them by surrogate key.

use std::fmt;

use crime_olap_crime_models::TimePeriod;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Store-assigned identifier of a dimension or fact row.
pub type SurrogateKey = i64;

/// A row of the `category` dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: SurrogateKey,
    pub name: String,
}

/// A row of the `district` dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictRow {
    pub id: SurrogateKey,
    pub name: String,
}

/// A row of the `timeperiod` dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriodRow {
    pub id: SurrogateKey,
    /// Calendar attributes; `month` is zero-based.
    pub period: TimePeriod,
}

/// A row of the `fact` table: incident count for one category, district,
/// and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRow {
    pub id: SurrogateKey,
    pub district_id: SurrogateKey,
    pub category_id: SurrogateKey,
    pub time_id: SurrogateKey,
    pub crimes: u32,
}

/// A fact row before the store assigns it an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFact {
    pub district_id: SurrogateKey,
    pub category_id: SurrogateKey,
    pub time_id: SurrogateKey,
    pub crimes: u32,
}

/// How the loader treats rows already present in the store.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Drop every table first so surrogate keys restart at 1.
    #[default]
    Clean,
    /// Keep existing rows and reuse dimension rows by natural key.
    Append,
}

/// Outcome of one star schema load.
///
/// `skipped` counts fact-source lines rejected before reaching the store
/// (bad date, malformed triple, index outside the catalog). `failed`
/// counts store operations that returned an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Category rows inserted or resolved.
    pub categories: u64,
    /// District rows inserted or resolved.
    pub districts: u64,
    /// Time period rows inserted or resolved.
    pub time_periods: u64,
    /// Fact rows inserted.
    pub facts: u64,
    /// Input lines rejected before persistence.
    pub skipped: u64,
    /// Store operations that failed.
    pub failed: u64,
}

impl LoadSummary {
    /// Whether any store operation failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} categories, {} districts, {} time periods, {} facts loaded; {} skipped, {} failed",
            self.categories,
            self.districts,
            self.time_periods,
            self.facts,
            self.skipped,
            self.failed
        )
    }
}
