//! In-process star schema for dry runs.

use std::collections::HashMap;

use crime_olap_crime_models::TimePeriod;
use crime_olap_database_models::{
    CategoryRow, DistrictRow, FactRow, NewFact, SurrogateKey, TimePeriodRow,
};

use crate::DbError;
use crate::store::{NamedDimension, StarStore};

/// Star schema kept in vectors, with 1-based identifiers per table.
///
/// Enforces the same uniqueness and reference checks as the `DuckDB`
/// schema so loader behaviour is identical against either store.
#[derive(Debug, Default)]
pub struct MemoryStar {
    categories: Vec<CategoryRow>,
    districts: Vec<DistrictRow>,
    time_periods: Vec<TimePeriodRow>,
    facts: Vec<FactRow>,
    period_index: HashMap<TimePeriod, SurrogateKey>,
}

impl MemoryStar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn categories(&self) -> &[CategoryRow] {
        &self.categories
    }

    #[must_use]
    pub fn districts(&self) -> &[DistrictRow] {
        &self.districts
    }

    #[must_use]
    pub fn time_periods(&self) -> &[TimePeriodRow] {
        &self.time_periods
    }

    #[must_use]
    pub fn facts(&self) -> &[FactRow] {
        &self.facts
    }
}

fn next_id(len: usize) -> SurrogateKey {
    SurrogateKey::try_from(len).map_or(SurrogateKey::MAX, |n| n + 1)
}

fn missing(table: &str, id: SurrogateKey) -> DbError {
    DbError::Constraint {
        message: format!("no {table} row with id {id}"),
    }
}

impl StarStore for MemoryStar {
    fn reset(&mut self) -> Result<(), DbError> {
        *self = Self::default();
        Ok(())
    }

    fn insert_named(
        &mut self,
        dimension: NamedDimension,
        name: &str,
    ) -> Result<SurrogateKey, DbError> {
        if self.find_named(dimension, name)?.is_some() {
            return Err(DbError::Constraint {
                message: format!("duplicate {dimension} name {name:?}"),
            });
        }

        let name = name.to_string();
        let id = match dimension {
            NamedDimension::Category => {
                let id = next_id(self.categories.len());
                self.categories.push(CategoryRow { id, name });
                id
            }
            NamedDimension::District => {
                let id = next_id(self.districts.len());
                self.districts.push(DistrictRow { id, name });
                id
            }
        };

        Ok(id)
    }

    fn find_named(
        &self,
        dimension: NamedDimension,
        name: &str,
    ) -> Result<Option<SurrogateKey>, DbError> {
        let id = match dimension {
            NamedDimension::Category => self
                .categories
                .iter()
                .find(|row| row.name == name)
                .map(|row| row.id),
            NamedDimension::District => self
                .districts
                .iter()
                .find(|row| row.name == name)
                .map(|row| row.id),
        };
        Ok(id)
    }

    fn insert_time_period(&mut self, period: &TimePeriod) -> Result<SurrogateKey, DbError> {
        if self.period_index.contains_key(period) {
            return Err(DbError::Constraint {
                message: format!("duplicate time period {period:?}"),
            });
        }

        let id = next_id(self.time_periods.len());
        self.time_periods.push(TimePeriodRow {
            id,
            period: *period,
        });
        self.period_index.insert(*period, id);
        Ok(id)
    }

    fn find_time_period(&self, period: &TimePeriod) -> Result<Option<SurrogateKey>, DbError> {
        Ok(self.period_index.get(period).copied())
    }

    fn insert_fact(&mut self, fact: &NewFact) -> Result<SurrogateKey, DbError> {
        if !self.districts.iter().any(|row| row.id == fact.district_id) {
            return Err(missing("district", fact.district_id));
        }
        if !self.categories.iter().any(|row| row.id == fact.category_id) {
            return Err(missing("category", fact.category_id));
        }
        if !self.time_periods.iter().any(|row| row.id == fact.time_id) {
            return Err(missing("timeperiod", fact.time_id));
        }
        if fact.crimes == 0 {
            return Err(DbError::Constraint {
                message: "fact crimes must be positive".to_string(),
            });
        }

        let id = next_id(self.facts.len());
        self.facts.push(FactRow {
            id,
            district_id: fact.district_id,
            category_id: fact.category_id,
            time_id: fact.time_id,
            crimes: fact.crimes,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_database_constraints() {
        let mut store = MemoryStar::new();
        assert_eq!(store.insert_named(NamedDimension::Category, "A").unwrap(), 1);
        assert!(store.insert_named(NamedDimension::Category, "A").is_err());
        assert_eq!(store.insert_named(NamedDimension::District, "A").unwrap(), 1);

        let fact = NewFact {
            district_id: 1,
            category_id: 1,
            time_id: 1,
            crimes: 2,
        };
        assert!(store.insert_fact(&fact).is_err());

        let period = TimePeriod {
            year: 2015,
            month: 0,
            week: 2,
            day: 5,
        };
        store.insert_time_period(&period).unwrap();
        assert_eq!(store.find_time_period(&period).unwrap(), Some(1));
        assert_eq!(store.insert_fact(&fact).unwrap(), 1);

        store.reset().unwrap();
        assert!(store.facts().is_empty());
        assert_eq!(store.find_named(NamedDimension::Category, "A").unwrap(), None);
    }
}
