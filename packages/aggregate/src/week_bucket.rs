//! Weekly histogram reducer.
//!
//! Every date grouped under a key lands in bucket
//! `zero_based_month * 5 + week_of_month`. The report window holds a fixed
//! number of buckets (16 by default, one quarter). Dates that map past the
//! window are rejected and counted, never folded into the last bucket.

use crime_olap_crime_models::{ColumnLayout, FrequencyReport, WeekRule, parse_incident_date};

use crate::JobStats;
use crate::engine::Reducer;

/// Folds a key's raw date values into a [`FrequencyReport`].
#[derive(Debug, Clone, Copy)]
pub struct WeekBucketReducer {
    rule: WeekRule,
    bucket_count: usize,
}

impl WeekBucketReducer {
    /// Creates a reducer with an explicit week rule and window size.
    #[must_use]
    pub const fn new(rule: WeekRule, bucket_count: usize) -> Self {
        Self { rule, bucket_count }
    }

    /// Creates a reducer using the layout's calendar settings.
    #[must_use]
    pub fn from_layout(layout: &ColumnLayout) -> Self {
        Self::new(layout.week_rule(), layout.bucket_count)
    }

    /// Builds the histogram for `key`.
    ///
    /// Returns `None` when no value parses as a date inside the window.
    /// Otherwise the report always carries exactly `bucket_count` buckets,
    /// zeros included.
    pub fn summarize(
        &self,
        key: &str,
        values: &[String],
        stats: &mut JobStats,
    ) -> Option<FrequencyReport> {
        let mut dates = Vec::with_capacity(values.len());
        for value in values {
            match parse_incident_date(value) {
                Ok(date) => dates.push(date),
                Err(e) => {
                    log::warn!("Invalid date {value:?} for {key}: {e}");
                    stats.invalid_dates += 1;
                }
            }
        }

        if dates.is_empty() {
            return None;
        }

        dates.sort();

        let mut buckets = vec![0u64; self.bucket_count];
        for date in dates {
            let bucket = self.rule.bucket(date);
            if let Some(slot) = buckets.get_mut(bucket) {
                *slot += 1;
            } else {
                log::warn!(
                    "Date {date} for {key} falls in bucket {bucket}, outside the {}-bucket window",
                    self.bucket_count
                );
                stats.out_of_range_dates += 1;
            }
        }

        if buckets.iter().all(|&count| count == 0) {
            return None;
        }

        Some(FrequencyReport {
            key: key.to_string(),
            buckets,
        })
    }
}

impl Reducer<String, String> for WeekBucketReducer {
    type Output = FrequencyReport;

    fn reduce(
        &self,
        key: &String,
        values: Vec<String>,
        out: &mut Vec<FrequencyReport>,
        stats: &mut JobStats,
    ) {
        out.extend(self.summarize(key, &values, stats));
    }
}
