//! Loading cross-tab output into the star schema.
//!
//! A load runs in three phases: optional reset, dimension seeding from the
//! [`DimensionCatalog`], then one fact row per dated count triple. The
//! keys the store returns while seeding are kept per catalog index, so a
//! triple's `(category_index, district_index)` resolves to whatever
//! identifiers the store actually assigned.
//!
//! Bad input lines and failed inserts never abort the load. They are
//! logged and tallied in the [`LoadSummary`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use crime_olap_aggregate::{Dimension, DimensionCatalog};
use crime_olap_crime_models::{DatedTriple, TimePeriod, WeekRule};
use crime_olap_database_models::{LoadMode, LoadSummary, NewFact, SurrogateKey};
use crime_olap_source::LineReader;
use crime_olap_source::progress::{ProgressCallback, null_progress};

use crate::DbError;
use crate::store::{NamedDimension, StarStore};

/// Fact lines between progress updates.
const PROGRESS_BATCH: u64 = 1_000;

/// Single-writer loader over one [`StarStore`].
pub struct StarSchemaLoader<'a, S: StarStore> {
    store: &'a mut S,
    catalog: &'a DimensionCatalog,
    rule: WeekRule,
    mode: LoadMode,
    progress: Arc<dyn ProgressCallback>,
    category_keys: Vec<Option<SurrogateKey>>,
    district_keys: Vec<Option<SurrogateKey>>,
    time_keys: HashMap<NaiveDate, SurrogateKey>,
    summary: LoadSummary,
}

impl<'a, S: StarStore> StarSchemaLoader<'a, S> {
    #[must_use]
    pub fn new(
        store: &'a mut S,
        catalog: &'a DimensionCatalog,
        rule: WeekRule,
        mode: LoadMode,
    ) -> Self {
        Self {
            store,
            catalog,
            rule,
            mode,
            progress: null_progress(),
            category_keys: Vec::new(),
            district_keys: Vec::new(),
            time_keys: HashMap::new(),
            summary: LoadSummary::default(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Resets the store (clean mode only) and seeds both named dimensions
    /// in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the reset fails. Failed dimension inserts are
    /// tallied instead.
    pub fn prepare(&mut self) -> Result<(), DbError> {
        if self.mode == LoadMode::Clean {
            self.store.reset()?;
        }

        let catalog = self.catalog;
        self.category_keys = self.seed(NamedDimension::Category, &catalog.categories);
        self.district_keys = self.seed(NamedDimension::District, &catalog.districts);

        log::info!(
            "Seeded {} categories and {} districts ({} mode)",
            self.summary.categories,
            self.summary.districts,
            self.mode
        );

        Ok(())
    }

    fn seed(
        &mut self,
        dimension: NamedDimension,
        names: &Dimension,
    ) -> Vec<Option<SurrogateKey>> {
        let mut keys = Vec::with_capacity(names.len());

        for name in names.names() {
            let key = match self.resolve_named(dimension, name) {
                Ok(key) => {
                    match dimension {
                        NamedDimension::Category => self.summary.categories += 1,
                        NamedDimension::District => self.summary.districts += 1,
                    }
                    Some(key)
                }
                Err(e) => {
                    log::error!("Failed to store {dimension} {name:?}: {e}");
                    self.summary.failed += 1;
                    None
                }
            };
            keys.push(key);
        }

        keys
    }

    fn resolve_named(
        &mut self,
        dimension: NamedDimension,
        name: &str,
    ) -> Result<SurrogateKey, DbError> {
        if self.mode == LoadMode::Append {
            if let Some(key) = self.store.find_named(dimension, name)? {
                return Ok(key);
            }
        }
        self.store.insert_named(dimension, name)
    }

    fn resolve_time_period(&mut self, date: NaiveDate) -> Result<SurrogateKey, DbError> {
        if let Some(&key) = self.time_keys.get(&date) {
            return Ok(key);
        }

        let period = TimePeriod::from_date(date, &self.rule);
        let existing = if self.mode == LoadMode::Append {
            self.store.find_time_period(&period)?
        } else {
            None
        };
        let key = match existing {
            Some(key) => key,
            None => self.store.insert_time_period(&period)?,
        };

        self.time_keys.insert(date, key);
        self.summary.time_periods += 1;
        Ok(key)
    }

    /// Loads one `YYYY/MM/DD\tc,d,n` line.
    ///
    /// Blank lines are ignored.
    pub fn load_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let dated: DatedTriple = match line.parse() {
            Ok(dated) => dated,
            Err(e) => {
                log::warn!("Skipping fact line {line:?}: {e}");
                self.summary.skipped += 1;
                return;
            }
        };

        let triple = dated.triple;
        let (Some(category_key), Some(district_key)) = (
            self.category_keys.get(triple.category_index).copied(),
            self.district_keys.get(triple.district_index).copied(),
        ) else {
            log::warn!(
                "Skipping fact line {line:?}: index outside catalog ({} categories, {} districts)",
                self.category_keys.len(),
                self.district_keys.len()
            );
            self.summary.skipped += 1;
            return;
        };

        let (Some(category_id), Some(district_id)) = (category_key, district_key) else {
            log::error!("Cannot load fact line {line:?}: its dimension row was not stored");
            self.summary.failed += 1;
            return;
        };

        let fact = self.resolve_time_period(dated.date).and_then(|time_id| {
            self.store.insert_fact(&NewFact {
                district_id,
                category_id,
                time_id,
                crimes: triple.count,
            })
        });

        match fact {
            Ok(_) => self.summary.facts += 1,
            Err(e) => {
                log::error!("Failed to store fact line {line:?}: {e}");
                self.summary.failed += 1;
            }
        }
    }

    /// Loads every line of the cross-tab output at `path`.
    ///
    /// The file is read up front so progress can report a total.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Source`] if the file cannot be opened or read.
    pub fn load_file(&mut self, path: &Path) -> Result<(), DbError> {
        let lines = LineReader::open(path)?.collect::<Result<Vec<_>, _>>()?;
        log::info!("Loading {} fact lines from {}", lines.len(), path.display());
        self.progress.set_total(lines.len() as u64);

        let mut read = 0u64;
        for line in &lines {
            self.load_line(&String::from_utf8_lossy(line));

            read += 1;
            if read % PROGRESS_BATCH == 0 {
                self.progress.inc(PROGRESS_BATCH);
            }
        }
        self.progress.inc(read % PROGRESS_BATCH);

        Ok(())
    }

    /// Tallies so far.
    #[must_use]
    pub const fn summary(&self) -> &LoadSummary {
        &self.summary
    }

    /// Ends the load and returns its tallies.
    #[must_use]
    pub fn finish(self) -> LoadSummary {
        self.progress.finish(format!("{} facts loaded", self.summary.facts));
        log::info!("Star schema load: {}", self.summary);
        self.summary
    }
}

/// Runs a full load of `fact_source` into `store`.
///
/// # Errors
///
/// Returns [`DbError`] if the store cannot be reset or the fact source
/// cannot be read.
pub fn load_star_schema<S: StarStore>(
    store: &mut S,
    catalog: &DimensionCatalog,
    fact_source: &Path,
    rule: WeekRule,
    mode: LoadMode,
    progress: Arc<dyn ProgressCallback>,
) -> Result<LoadSummary, DbError> {
    let mut loader = StarSchemaLoader::new(store, catalog, rule, mode).with_progress(progress);
    loader.prepare()?;
    loader.load_file(fact_source)?;
    Ok(loader.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crime_olap_crime_models::WeekStart;

    use crate::memory::MemoryStar;
    use crate::star_db::StarDb;

    fn catalog() -> DimensionCatalog {
        DimensionCatalog::build(["B", "A"], ["South", "North"])
    }

    #[test]
    fn loads_triple_with_returned_keys() {
        let catalog = catalog();
        let mut db = StarDb::open_in_memory().unwrap();

        let mut loader =
            StarSchemaLoader::new(&mut db, &catalog, WeekRule::default(), LoadMode::Clean);
        loader.prepare().unwrap();
        loader.load_line("2015/01/05\t0,1,3");
        let summary = loader.finish();

        assert_eq!(summary.facts, 1);
        assert_eq!(summary.categories, 2);
        assert_eq!(summary.districts, 2);
        assert_eq!(summary.time_periods, 1);

        let categories = db.categories().unwrap();
        let districts = db.districts().unwrap();
        let a = categories.iter().find(|row| row.name == "A").unwrap().id;
        let south = districts.iter().find(|row| row.name == "South").unwrap().id;

        let facts = db.facts().unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].category_id, a);
        assert_eq!(facts[0].district_id, south);
        assert_eq!(facts[0].crimes, 3);

        let periods = db.time_periods().unwrap();
        assert_eq!(periods.len(), 1);
        assert_eq!(facts[0].time_id, periods[0].id);
        assert_eq!(
            periods[0].period,
            TimePeriod {
                year: 2015,
                month: 0,
                week: 2,
                day: 5
            }
        );
    }

    #[test]
    fn first_week_rule_of_four_days_numbers_the_fifth_as_week_one() {
        let catalog = catalog();
        let mut store = MemoryStar::new();
        let rule = WeekRule {
            first_day: WeekStart::Sunday,
            minimal_days: 4,
        };

        let mut loader = StarSchemaLoader::new(&mut store, &catalog, rule, LoadMode::Clean);
        loader.prepare().unwrap();
        loader.load_line("2015/01/05\t0,1,3");
        let summary = loader.finish();

        assert_eq!(summary.facts, 1);
        assert_eq!(
            store.time_periods()[0].period,
            TimePeriod {
                year: 2015,
                month: 0,
                week: 1,
                day: 5
            }
        );

        let fact = &store.facts()[0];
        let a = store.categories().iter().find(|row| row.name == "A").unwrap();
        let south = store.districts().iter().find(|row| row.name == "South").unwrap();
        assert_eq!(fact.category_id, a.id);
        assert_eq!(fact.district_id, south.id);
        assert_eq!(fact.crimes, 3);
    }

    #[test]
    fn repeated_dates_reuse_one_time_period() {
        let catalog = catalog();
        let mut store = MemoryStar::new();

        let mut loader =
            StarSchemaLoader::new(&mut store, &catalog, WeekRule::default(), LoadMode::Clean);
        loader.prepare().unwrap();
        for line in [
            "2015/01/05\t0,0,1",
            "2015/01/05\t0,1,2",
            "2015/01/06\t1,1,4",
            "2015/01/05\t1,0,1",
        ] {
            loader.load_line(line);
        }
        let summary = loader.finish();

        assert_eq!(summary.facts, 4);
        assert_eq!(summary.time_periods, 2);
        assert_eq!(store.time_periods().len(), 2);
        assert_eq!(store.categories().len(), 2);
        assert_eq!(store.districts().len(), 2);
    }

    #[test]
    fn skips_malformed_lines_and_keeps_going() {
        let catalog = catalog();
        let mut store = MemoryStar::new();

        let mut loader =
            StarSchemaLoader::new(&mut store, &catalog, WeekRule::default(), LoadMode::Clean);
        loader.prepare().unwrap();
        for line in [
            "2015/01/05\t0,1",
            "2015/01/05\t0,x,3",
            "2015/01/05\t0,1,0",
            "01/05/2015\t0,1,3",
            "2015/01/05\t2,0,1",
            "",
            "2015/01/05\t1,1,7",
        ] {
            loader.load_line(line);
        }

        assert_eq!(loader.summary().skipped, 5);
        assert_eq!(loader.summary().facts, 1);
        assert_eq!(loader.summary().failed, 0);
    }

    /// Fails every fact insert; everything else goes to the inner store.
    struct FailingFacts(MemoryStar);

    impl StarStore for FailingFacts {
        fn reset(&mut self) -> Result<(), DbError> {
            self.0.reset()
        }

        fn insert_named(
            &mut self,
            dimension: NamedDimension,
            name: &str,
        ) -> Result<SurrogateKey, DbError> {
            self.0.insert_named(dimension, name)
        }

        fn find_named(
            &self,
            dimension: NamedDimension,
            name: &str,
        ) -> Result<Option<SurrogateKey>, DbError> {
            self.0.find_named(dimension, name)
        }

        fn insert_time_period(&mut self, period: &TimePeriod) -> Result<SurrogateKey, DbError> {
            self.0.insert_time_period(period)
        }

        fn find_time_period(
            &self,
            period: &TimePeriod,
        ) -> Result<Option<SurrogateKey>, DbError> {
            self.0.find_time_period(period)
        }

        fn insert_fact(&mut self, _fact: &NewFact) -> Result<SurrogateKey, DbError> {
            Err(DbError::Constraint {
                message: "fact table is read-only".to_string(),
            })
        }
    }

    #[test]
    fn persistence_failures_are_tallied() {
        let catalog = catalog();
        let mut store = FailingFacts(MemoryStar::new());

        let mut loader =
            StarSchemaLoader::new(&mut store, &catalog, WeekRule::default(), LoadMode::Clean);
        loader.prepare().unwrap();
        loader.load_line("2015/01/05\t0,1,3");
        loader.load_line("2015/01/06\t1,0,2");
        let summary = loader.finish();

        assert_eq!(summary.facts, 0);
        assert_eq!(summary.failed, 2);
        assert!(summary.has_failures());
    }

    #[test]
    fn append_mode_reuses_existing_dimension_rows() {
        let catalog = catalog();
        let mut db = StarDb::open_in_memory().unwrap();

        for _ in 0..2 {
            let mut loader =
                StarSchemaLoader::new(&mut db, &catalog, WeekRule::default(), LoadMode::Append);
            loader.prepare().unwrap();
            loader.load_line("2015/01/05\t0,1,3");
            let summary = loader.finish();
            assert_eq!(summary.failed, 0);
        }

        assert_eq!(db.row_count("category").unwrap(), 2);
        assert_eq!(db.row_count("district").unwrap(), 2);
        assert_eq!(db.row_count("timeperiod").unwrap(), 1);
        assert_eq!(db.row_count("fact").unwrap(), 2);
    }

    #[test]
    fn clean_mode_restarts_from_empty_tables() {
        let catalog = catalog();
        let mut db = StarDb::open_in_memory().unwrap();

        for _ in 0..2 {
            let mut loader =
                StarSchemaLoader::new(&mut db, &catalog, WeekRule::default(), LoadMode::Clean);
            loader.prepare().unwrap();
            loader.load_line("2015/01/05\t0,1,3");
            let _ = loader.finish();
        }

        assert_eq!(db.row_count("fact").unwrap(), 1);
        let ids: Vec<SurrogateKey> = db.categories().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn loads_fact_file() {
        let path = std::env::temp_dir().join("crime_olap_loader_facts.txt");
        std::fs::write(&path, "2015/01/05\t0,1,3\n2015/02/01\t1,0,1\nbroken\n").unwrap();

        let catalog = catalog();
        let mut store = MemoryStar::new();
        let summary = load_star_schema(
            &mut store,
            &catalog,
            &path,
            WeekRule::default(),
            LoadMode::Clean,
            null_progress(),
        )
        .unwrap();

        assert_eq!(summary.facts, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.facts().len(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[derive(Default)]
    struct RecordedProgress {
        total: AtomicU64,
        done: AtomicU64,
    }

    impl ProgressCallback for RecordedProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, Ordering::SeqCst);
        }

        fn finish(&self, _msg: String) {}
    }

    #[test]
    fn reports_fact_line_total_before_loading() {
        let path = std::env::temp_dir().join("crime_olap_loader_progress.txt");
        std::fs::write(&path, "2015/01/05\t0,1,3\n2015/01/06\t1,0,1\n2015/01/07\t1,1,2\n")
            .unwrap();

        let catalog = catalog();
        let mut store = MemoryStar::new();
        let progress = Arc::new(RecordedProgress::default());
        let summary = load_star_schema(
            &mut store,
            &catalog,
            &path,
            WeekRule::default(),
            LoadMode::Clean,
            progress.clone(),
        )
        .unwrap();

        assert_eq!(summary.facts, 3);
        assert_eq!(progress.total.load(Ordering::SeqCst), 3);
        assert_eq!(progress.done.load(Ordering::SeqCst), 3);

        std::fs::remove_file(&path).ok();
    }
}
