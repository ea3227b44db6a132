#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident record, calendar bucket, and count triple types.
//!
//! This crate holds the plain data shapes shared by every stage of the
//! crime OLAP pipeline: the column layout of raw incident lines, the
//! validated [`IncidentRecord`], the calendar arithmetic that assigns a
//! date to a weekly bucket, and the textual records exchanged between
//! stages ([`FrequencyReport`] and [`DatedTriple`]).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Zero-based position of the crime category column.
pub const CATEGORY_COLUMN_INDEX: usize = 1;

/// Zero-based position of the day-of-week column.
pub const DAY_OF_WEEK_COLUMN_INDEX: usize = 3;

/// Zero-based position of the incident date column.
pub const DATE_COLUMN_INDEX: usize = 4;

/// Zero-based position of the police district column.
pub const DISTRICT_COLUMN_INDEX: usize = 6;

/// Number of weekly buckets in one quarter (`3 months * 5 slots + 1`).
pub const DEFAULT_BUCKET_COUNT: usize = 16;

/// Bucket slots reserved for each month.
pub const BUCKETS_PER_MONTH: usize = 5;

/// Pattern of the date column in raw incident lines.
pub const INPUT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Canonical pattern for dates used as keys between stages.
pub const KEY_DATE_FORMAT: &str = "%Y/%m/%d";

/// Value of the date column in a header row.
pub const DEFAULT_HEADER_SENTINEL: &str = "date";

/// Errors raised while turning raw fields into typed values.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The line has fewer fields than the layout requires.
    #[error("record has {found} fields, at least {required} required")]
    TooFewFields {
        /// Number of fields present.
        found: usize,
        /// Minimum number of fields needed.
        required: usize,
    },

    /// The date column was empty.
    #[error("empty date value")]
    EmptyDate,

    /// The date column did not match the expected pattern.
    #[error("invalid date {value:?}: {source}")]
    InvalidDate {
        /// The raw value.
        value: String,
        /// The underlying parse failure.
        #[source]
        source: chrono::ParseError,
    },

    /// A count triple did not have the `category,district,count` shape.
    #[error("invalid count triple {value:?}: {reason}")]
    InvalidTriple {
        /// The raw value.
        value: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// First day of the week used when numbering weeks within a month.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum WeekStart {
    /// Weeks run Sunday through Saturday (US convention).
    #[default]
    Sunday,
    /// Weeks run Monday through Sunday (ISO convention).
    Monday,
}

impl WeekStart {
    const fn days_from_sunday(self) -> u32 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
        }
    }
}

/// Week-of-month numbering rule.
///
/// The first week of a month is the one containing day 1 if that partial
/// week has at least `minimal_days` days, otherwise days before the first
/// full week fall into week 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRule {
    /// First day of each week.
    pub first_day: WeekStart,
    /// Minimal number of days the first partial week needs to count as week 1.
    pub minimal_days: u32,
}

impl Default for WeekRule {
    fn default() -> Self {
        Self {
            first_day: WeekStart::Sunday,
            minimal_days: 1,
        }
    }
}

impl WeekRule {
    /// Returns the ordinal week of the month containing `date`.
    ///
    /// With the default rule this is 1-based and ranges over `1..=6`.
    #[must_use]
    pub fn week_of_month(&self, date: NaiveDate) -> u32 {
        let first_weekday = date
            .with_day(1)
            .map_or(0, |first| first.weekday().num_days_from_sunday());
        let offset = (first_weekday + 7 - self.first_day.days_from_sunday()) % 7;
        let first_week_len = 7 - offset;
        let base = u32::from(first_week_len >= self.minimal_days.clamp(1, 7));

        (date.day() - 1 + offset) / 7 + base
    }

    /// Returns the weekly bucket index for `date`:
    /// `zero_based_month * 5 + week_of_month`.
    ///
    /// The result is unbounded; callers decide how to treat indices past
    /// their bucket window.
    #[must_use]
    pub fn bucket(&self, date: NaiveDate) -> usize {
        date.month0() as usize * BUCKETS_PER_MONTH + self.week_of_month(date) as usize
    }
}

/// Column positions and calendar settings for raw incident lines.
///
/// Deserializable from a TOML table; every field is optional and falls
/// back to the San Francisco incident export layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    /// Position of the category column.
    pub category: usize,
    /// Position of the day-of-week column.
    pub day_of_week: usize,
    /// Position of the date column.
    pub date: usize,
    /// Position of the district column.
    pub district: usize,
    /// First day of the week for week-of-month numbering.
    pub week_start: WeekStart,
    /// Minimal days in the first week of a month.
    pub minimal_days_in_first_week: u32,
    /// Number of weekly buckets in a frequency report.
    pub bucket_count: usize,
    /// Date column value that marks a header row (compared case-insensitively).
    pub header_sentinel: String,
    /// Field delimiter of incident lines.
    pub delimiter: char,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            category: CATEGORY_COLUMN_INDEX,
            day_of_week: DAY_OF_WEEK_COLUMN_INDEX,
            date: DATE_COLUMN_INDEX,
            district: DISTRICT_COLUMN_INDEX,
            week_start: WeekStart::Sunday,
            minimal_days_in_first_week: 1,
            bucket_count: DEFAULT_BUCKET_COUNT,
            header_sentinel: DEFAULT_HEADER_SENTINEL.to_string(),
            delimiter: ',',
        }
    }
}

impl ColumnLayout {
    /// Largest configured column position.
    #[must_use]
    pub fn max_index(&self) -> usize {
        self.category
            .max(self.day_of_week)
            .max(self.date)
            .max(self.district)
    }

    /// Minimum number of fields a line needs to be usable.
    #[must_use]
    pub fn min_fields(&self) -> usize {
        self.max_index() + 1
    }

    /// Week numbering rule derived from this layout.
    #[must_use]
    pub const fn week_rule(&self) -> WeekRule {
        WeekRule {
            first_day: self.week_start,
            minimal_days: self.minimal_days_in_first_week,
        }
    }

    /// Delimiter as a byte, falling back to `,` for non-ASCII characters.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .unwrap_or(b',')
    }

    /// Whether `value` equals the header sentinel.
    #[must_use]
    pub fn is_header_value(&self, value: &str) -> bool {
        value.trim().eq_ignore_ascii_case(&self.header_sentinel)
    }
}

/// One parsed incident line whose field count covers the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    fields: Vec<String>,
}

impl IncidentRecord {
    /// Wraps `fields` after checking there are enough of them for `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::TooFewFields`] if the field count does not
    /// exceed the layout's largest column position.
    pub fn new(fields: Vec<String>, layout: &ColumnLayout) -> Result<Self, RecordError> {
        let required = layout.min_fields();
        if fields.len() < required {
            return Err(RecordError::TooFewFields {
                found: fields.len(),
                required,
            });
        }
        Ok(Self { fields })
    }

    /// Returns the field at `index`, if present.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields. Always `false` for records built
    /// through [`Self::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All fields in column order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Parses the date column of an incident line.
///
/// Only the first whitespace-separated token is considered, so values with
/// a trailing time (`01/05/2015 12:00:00 AM`) parse to their date.
///
/// # Errors
///
/// Returns [`RecordError::EmptyDate`] for a blank value and
/// [`RecordError::InvalidDate`] when the token is not `MM/DD/YYYY`.
pub fn parse_incident_date(value: &str) -> Result<NaiveDate, RecordError> {
    let token = value
        .split_whitespace()
        .next()
        .ok_or(RecordError::EmptyDate)?;
    NaiveDate::parse_from_str(token, INPUT_DATE_FORMAT).map_err(|source| {
        RecordError::InvalidDate {
            value: value.to_string(),
            source,
        }
    })
}

/// Formats a date as a `YYYY/MM/DD` stage key.
#[must_use]
pub fn format_date_key(date: NaiveDate) -> String {
    date.format(KEY_DATE_FORMAT).to_string()
}

/// Parses a `YYYY/MM/DD` stage key.
///
/// # Errors
///
/// Returns [`RecordError::InvalidDate`] if `value` is not in key format.
pub fn parse_date_key(value: &str) -> Result<NaiveDate, RecordError> {
    NaiveDate::parse_from_str(value.trim(), KEY_DATE_FORMAT).map_err(|source| {
        RecordError::InvalidDate {
            value: value.to_string(),
            source,
        }
    })
}

/// Calendar breakdown of a date stored in the time-period dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePeriod {
    /// Calendar year.
    pub year: i32,
    /// Zero-based month (January = 0).
    pub month: u32,
    /// Week of the month under the configured [`WeekRule`].
    pub week: u32,
    /// Day of the month.
    pub day: u32,
}

impl TimePeriod {
    /// Splits `date` into its dimension attributes.
    #[must_use]
    pub fn from_date(date: NaiveDate, rule: &WeekRule) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
            week: rule.week_of_month(date),
            day: date.day(),
        }
    }
}

/// Sparse cell of a category by district matrix: a strictly positive
/// incident count for one (category, district) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountTriple {
    /// Catalog index of the category.
    pub category_index: usize,
    /// Catalog index of the district.
    pub district_index: usize,
    /// Number of incidents.
    pub count: u32,
}

impl fmt::Display for CountTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{}",
            self.category_index, self.district_index, self.count
        )
    }
}

impl FromStr for CountTriple {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RecordError::InvalidTriple {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(invalid(&format!("expected 3 fields, found {}", parts.len())));
        }

        let category_index = parts[0]
            .parse::<usize>()
            .map_err(|e| invalid(&format!("category index: {e}")))?;
        let district_index = parts[1]
            .parse::<usize>()
            .map_err(|e| invalid(&format!("district index: {e}")))?;
        let count = parts[2]
            .parse::<u32>()
            .map_err(|e| invalid(&format!("count: {e}")))?;

        if count == 0 {
            return Err(invalid("count must be positive"));
        }

        Ok(Self {
            category_index,
            district_index,
            count,
        })
    }
}

/// A [`CountTriple`] together with the date it was tabulated for.
///
/// Serialized as one cross-tab output line: `YYYY/MM/DD\tc,d,n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedTriple {
    /// Date the counts belong to.
    pub date: NaiveDate,
    /// The sparse cell.
    pub triple: CountTriple,
}

impl fmt::Display for DatedTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", format_date_key(self.date), self.triple)
    }
}

impl FromStr for DatedTriple {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date, triple) = s.split_once('\t').ok_or_else(|| RecordError::InvalidTriple {
            value: s.to_string(),
            reason: "missing tab between date and triple".to_string(),
        })?;

        Ok(Self {
            date: parse_date_key(date)?,
            triple: triple.parse()?,
        })
    }
}

/// Weekly histogram of incidents for one category or district.
///
/// Serialized as one report line: `KEY\tb0,b1,...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyReport {
    /// Category or district name.
    pub key: String,
    /// Incident count per bucket, in bucket order.
    pub buckets: Vec<u64>,
}

impl FrequencyReport {
    /// Sum of all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Comma-joined bucket counts.
    #[must_use]
    pub fn bucket_string(&self) -> String {
        self.buckets
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for FrequencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.key, self.bucket_string())
    }
}
