//! In-process map/group/reduce execution.
//!
//! A [`Job`] reads raw lines, turns each into an [`IncidentRecord`], feeds
//! it to a [`Mapper`], groups the emitted pairs by key in a `BTreeMap`, and
//! hands every key with all of its values to a [`Reducer`]. Grouping is a
//! barrier: reduction starts only after the last line has been mapped.
//!
//! With more than one worker the sorted key space is cut into contiguous
//! ranges, one per scoped thread. Each thread owns its range outright, so
//! there is no shared mutable state during reduction, and concatenating
//! the per-range outputs keeps rows in key order.

use std::collections::BTreeMap;
use std::sync::Arc;

use crime_olap_crime_models::{ColumnLayout, IncidentRecord};
use crime_olap_source::progress::{ProgressCallback, null_progress};
use crime_olap_source::{ColumnExtractor, SourceError};

use crate::{AggregateError, JobStats};

/// Lines between progress updates.
const PROGRESS_BATCH: u64 = 10_000;

/// Map side of a job.
pub trait Mapper: Sync {
    /// Grouping key. Output rows are ordered by this key.
    type Key: Ord + Send;
    /// Value carried to the reducer.
    type Value: Send;

    /// Emits zero or more key/value pairs for one record into `emit`.
    ///
    /// Records that cannot be mapped are logged and tallied in `stats`
    /// rather than failing the job.
    fn map(
        &self,
        record: &IncidentRecord,
        emit: &mut Vec<(Self::Key, Self::Value)>,
        stats: &mut JobStats,
    );
}

/// Reduce side of a job.
pub trait Reducer<K, V>: Sync {
    /// Row type written to the job output.
    type Output: Send;

    /// Folds every value grouped under `key` into zero or more rows.
    fn reduce(&self, key: &K, values: Vec<V>, out: &mut Vec<Self::Output>, stats: &mut JobStats);
}

/// Rows produced by a job, in key order, with its tallies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput<T> {
    /// Reducer output in ascending key order.
    pub rows: Vec<T>,
    /// Counters from both phases.
    pub stats: JobStats,
}

/// Execution settings shared by the map and reduce phases.
pub struct Job<'a> {
    layout: &'a ColumnLayout,
    extractor: ColumnExtractor,
    workers: usize,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a> Job<'a> {
    /// Creates a single-worker job for lines in `layout`.
    #[must_use]
    pub fn new(layout: &'a ColumnLayout) -> Self {
        Self {
            layout,
            extractor: ColumnExtractor::new().with_delimiter(layout.delimiter_byte()),
            workers: 1,
            progress: null_progress(),
        }
    }

    /// Sets the number of reduce workers (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Reports lines read to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Runs `mapper` and `reducer` over `lines`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Source`] if reading a line fails and
    /// [`AggregateError::WorkerPanicked`] if a reduce thread panics.
    /// Malformed lines are skipped and counted, never returned as errors.
    pub fn run<I, M, R>(
        &self,
        lines: I,
        mapper: &M,
        reducer: &R,
    ) -> Result<JobOutput<R::Output>, AggregateError>
    where
        I: IntoIterator<Item = Result<Vec<u8>, SourceError>>,
        M: Mapper,
        R: Reducer<M::Key, M::Value>,
    {
        let (groups, mut stats) = self.map_and_group(lines, mapper)?;
        log::debug!(
            "Map phase done: {} lines, {} keys",
            stats.lines_read,
            groups.len()
        );

        let (rows, reduce_stats) = self.reduce(groups, reducer)?;
        stats.merge(&reduce_stats);

        Ok(JobOutput { rows, stats })
    }

    fn map_and_group<I, M>(
        &self,
        lines: I,
        mapper: &M,
    ) -> Result<(BTreeMap<M::Key, Vec<M::Value>>, JobStats), AggregateError>
    where
        I: IntoIterator<Item = Result<Vec<u8>, SourceError>>,
        M: Mapper,
    {
        let mut groups: BTreeMap<M::Key, Vec<M::Value>> = BTreeMap::new();
        let mut stats = JobStats::default();
        let mut emitted = Vec::new();

        for line in lines {
            let line = line?;
            stats.lines_read += 1;
            if stats.lines_read % PROGRESS_BATCH == 0 {
                self.progress.inc(PROGRESS_BATCH);
            }

            let Some(record) = self.parse_record(&line, &mut stats) else {
                continue;
            };

            mapper.map(&record, &mut emitted, &mut stats);
            stats.pairs_emitted += emitted.len() as u64;

            for (key, value) in emitted.drain(..) {
                groups.entry(key).or_default().push(value);
            }
        }

        self.progress.inc(stats.lines_read % PROGRESS_BATCH);

        Ok((groups, stats))
    }

    fn parse_record(&self, line: &[u8], stats: &mut JobStats) -> Option<IncidentRecord> {
        let fields = match self.extractor.extract_bytes(line) {
            Ok(fields) => fields,
            Err(e) => {
                log::warn!(
                    "Data {:?} did not parse into columns: {e}",
                    String::from_utf8_lossy(line)
                );
                stats.malformed_lines += 1;
                return None;
            }
        };

        match IncidentRecord::new(fields, self.layout) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!(
                    "Data {:?} did not parse into columns: {e}",
                    String::from_utf8_lossy(line)
                );
                stats.short_records += 1;
                None
            }
        }
    }

    fn reduce<K, V, R>(
        &self,
        groups: BTreeMap<K, Vec<V>>,
        reducer: &R,
    ) -> Result<(Vec<R::Output>, JobStats), AggregateError>
    where
        K: Send,
        V: Send,
        R: Reducer<K, V>,
    {
        if self.workers <= 1 || groups.len() < 2 {
            return Ok(reduce_range(reducer, groups));
        }

        let chunk_size = groups.len().div_ceil(self.workers);
        let mut entries = groups.into_iter();
        let mut ranges = Vec::with_capacity(self.workers);
        loop {
            let range: Vec<(K, Vec<V>)> = entries.by_ref().take(chunk_size).collect();
            if range.is_empty() {
                break;
            }
            ranges.push(range);
        }

        log::debug!("Reducing {} key ranges in parallel", ranges.len());

        std::thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .into_iter()
                .map(|range| scope.spawn(move || reduce_range(reducer, range)))
                .collect();

            let mut rows = Vec::new();
            let mut stats = JobStats::default();
            for (worker, handle) in handles.into_iter().enumerate() {
                let (range_rows, range_stats) = handle
                    .join()
                    .map_err(|_| AggregateError::WorkerPanicked { worker })?;
                rows.extend(range_rows);
                stats.merge(&range_stats);
            }

            Ok((rows, stats))
        })
    }
}

fn reduce_range<K, V, R>(
    reducer: &R,
    range: impl IntoIterator<Item = (K, Vec<V>)>,
) -> (Vec<R::Output>, JobStats)
where
    R: Reducer<K, V>,
{
    let mut rows = Vec::new();
    let mut stats = JobStats::default();

    for (key, values) in range {
        stats.keys_reduced += 1;
        reducer.reduce(&key, values, &mut rows, &mut stats);
    }

    stats.outputs = rows.len() as u64;
    (rows, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_olap_source::LineReader;

    /// Emits (district, 1) for every record.
    struct DistrictOnes;

    impl Mapper for DistrictOnes {
        type Key = String;
        type Value = u32;

        fn map(
            &self,
            record: &IncidentRecord,
            emit: &mut Vec<(String, u32)>,
            _stats: &mut JobStats,
        ) {
            if let Some(district) = record.field(6) {
                emit.push((district.to_string(), 1));
            }
        }
    }

    struct Sum;

    impl Reducer<String, u32> for Sum {
        type Output = (String, u32);

        fn reduce(
            &self,
            key: &String,
            values: Vec<u32>,
            out: &mut Vec<(String, u32)>,
            _stats: &mut JobStats,
        ) {
            out.push((key.clone(), values.iter().sum()));
        }
    }

    const INPUT: &str = "\
1,A,x,Mon,01/05/2015,t,SOUTHERN
2,B,x,Mon,01/05/2015,t,MISSION
only,two
3,A,x,Tue,01/06/2015,t,SOUTHERN
4,\"broken,x,Tue,01/06/2015,t,BAYVIEW
5,C,x,Wed,01/07/2015,t,BAYVIEW
";

    fn lines() -> LineReader<&'static [u8]> {
        LineReader::new(INPUT.as_bytes())
    }

    #[test]
    fn groups_by_key_and_skips_bad_lines() {
        let layout = ColumnLayout::default();
        let output = Job::new(&layout)
            .run(lines(), &DistrictOnes, &Sum)
            .unwrap();

        assert_eq!(
            output.rows,
            vec![
                ("BAYVIEW".to_string(), 1),
                ("MISSION".to_string(), 1),
                ("SOUTHERN".to_string(), 2),
            ]
        );
        assert_eq!(output.stats.lines_read, 6);
        assert_eq!(output.stats.short_records, 1);
        assert_eq!(output.stats.malformed_lines, 1);
        assert_eq!(output.stats.pairs_emitted, 4);
        assert_eq!(output.stats.keys_reduced, 3);
        assert_eq!(output.stats.outputs, 3);
    }

    #[test]
    fn parallel_reduce_matches_sequential() {
        let layout = ColumnLayout::default();
        let sequential = Job::new(&layout)
            .run(lines(), &DistrictOnes, &Sum)
            .unwrap();

        for workers in [2, 3, 8] {
            let parallel = Job::new(&layout)
                .with_workers(workers)
                .run(lines(), &DistrictOnes, &Sum)
                .unwrap();
            assert_eq!(parallel, sequential, "workers = {workers}");
        }
    }

    #[test]
    fn splits_on_layout_delimiter() {
        let layout = ColumnLayout {
            delimiter: '\t',
            ..ColumnLayout::default()
        };
        let input = "1\tA\tx\tMon\t01/05/2015\tt\tNORTH, EAST\n";
        let output = Job::new(&layout)
            .run(LineReader::new(input.as_bytes()), &DistrictOnes, &Sum)
            .unwrap();
        assert_eq!(output.rows, vec![("NORTH, EAST".to_string(), 1)]);
    }

    #[test]
    fn empty_input_produces_no_rows() {
        let layout = ColumnLayout::default();
        let output = Job::new(&layout)
            .run(LineReader::new(&b""[..]), &DistrictOnes, &Sum)
            .unwrap();
        assert!(output.rows.is_empty());
        assert_eq!(output.stats, JobStats::default());
    }
}
