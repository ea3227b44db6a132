//! Persistence interface of the star schema.

use crime_olap_crime_models::TimePeriod;
use crime_olap_database_models::{NewFact, SurrogateKey};
use strum_macros::Display;

use crate::DbError;

/// Dimension tables identified by a name column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NamedDimension {
    Category,
    District,
}

/// Storage for the `category`, `district`, `timeperiod`, and `fact` tables.
///
/// Every insert returns the identifier the store assigned. Callers keep
/// those keys instead of assuming any relation to insertion order.
pub trait StarStore {
    /// Removes every row from the four tables so identifiers restart.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the tables cannot be recreated.
    fn reset(&mut self) -> Result<(), DbError>;

    /// Inserts a category or district row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    fn insert_named(
        &mut self,
        dimension: NamedDimension,
        name: &str,
    ) -> Result<SurrogateKey, DbError>;

    /// Looks up a category or district row by name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    fn find_named(
        &self,
        dimension: NamedDimension,
        name: &str,
    ) -> Result<Option<SurrogateKey>, DbError>;

    /// Inserts a time period row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    fn insert_time_period(&mut self, period: &TimePeriod) -> Result<SurrogateKey, DbError>;

    /// Looks up a time period row by its calendar attributes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    fn find_time_period(&self, period: &TimePeriod) -> Result<Option<SurrogateKey>, DbError>;

    /// Appends a fact row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    fn insert_fact(&mut self, fact: &NewFact) -> Result<SurrogateKey, DbError>;
}
