//! `DuckDB` storage for the star schema.
//!
//! Each table draws its identifiers from its own sequence, and inserts
//! read the assigned id back with `RETURNING id`. Resetting drops and
//! recreates tables and sequences so identifiers start again at 1.

use std::path::Path;

use crime_olap_crime_models::TimePeriod;
use crime_olap_database_models::{
    CategoryRow, DistrictRow, FactRow, NewFact, SurrogateKey, TimePeriodRow,
};
use duckdb::{Connection, params};

use crate::DbError;
use crate::store::{NamedDimension, StarStore};

/// Star schema backed by a `DuckDB` connection.
pub struct StarDb {
    conn: Connection,
}

impl StarDb {
    /// Opens (or creates) the star schema database at `path` and ensures
    /// the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        log::debug!("Opened star schema at {}", path.display());
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Returns the number of rows in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn row_count(&self, table: &str) -> Result<u64, DbError> {
        let mut stmt = self.conn.prepare(&format!("SELECT COUNT(*) FROM {table}"))?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        #[allow(clippy::cast_sign_loss)]
        Ok(count as u64)
    }

    /// Returns every category row ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn categories(&self) -> Result<Vec<CategoryRow>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM category ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(CategoryRow {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Returns every district row ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn districts(&self) -> Result<Vec<DistrictRow>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM district ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(DistrictRow {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Returns every time period row ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn time_periods(&self) -> Result<Vec<TimePeriodRow>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, year, month, week, day FROM timeperiod ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(TimePeriodRow {
                id: row.get(0)?,
                period: TimePeriod {
                    year: row.get(1)?,
                    month: row.get(2)?,
                    week: row.get(3)?,
                    day: row.get(4)?,
                },
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Returns every fact row ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn facts(&self) -> Result<Vec<FactRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, district_id, category_id, time_id, crimes FROM fact ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FactRow {
                id: row.get(0)?,
                district_id: row.get(1)?,
                category_id: row.get(2)?,
                time_id: row.get(3)?,
                crimes: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE SEQUENCE IF NOT EXISTS category_id_seq START 1;
        CREATE SEQUENCE IF NOT EXISTS district_id_seq START 1;
        CREATE SEQUENCE IF NOT EXISTS timeperiod_id_seq START 1;
        CREATE SEQUENCE IF NOT EXISTS fact_id_seq START 1;

        CREATE TABLE IF NOT EXISTS category (
            id BIGINT PRIMARY KEY DEFAULT nextval('category_id_seq'),
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS district (
            id BIGINT PRIMARY KEY DEFAULT nextval('district_id_seq'),
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS timeperiod (
            id BIGINT PRIMARY KEY DEFAULT nextval('timeperiod_id_seq'),
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            week INTEGER NOT NULL,
            day INTEGER NOT NULL,
            UNIQUE (year, month, week, day)
        );

        CREATE TABLE IF NOT EXISTS fact (
            id BIGINT PRIMARY KEY DEFAULT nextval('fact_id_seq'),
            district_id BIGINT NOT NULL REFERENCES district (id),
            category_id BIGINT NOT NULL REFERENCES category (id),
            time_id BIGINT NOT NULL REFERENCES timeperiod (id),
            crimes INTEGER NOT NULL CHECK (crimes > 0)
        );",
    )?;

    Ok(())
}

fn optional(result: Result<SurrogateKey, duckdb::Error>) -> Result<Option<SurrogateKey>, DbError> {
    match result {
        Ok(id) => Ok(Some(id)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

impl StarStore for StarDb {
    fn reset(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS fact;
            DROP TABLE IF EXISTS timeperiod;
            DROP TABLE IF EXISTS district;
            DROP TABLE IF EXISTS category;
            DROP SEQUENCE IF EXISTS fact_id_seq;
            DROP SEQUENCE IF EXISTS timeperiod_id_seq;
            DROP SEQUENCE IF EXISTS district_id_seq;
            DROP SEQUENCE IF EXISTS category_id_seq;",
        )?;
        create_schema(&self.conn)?;
        log::info!("Reset star schema tables");
        Ok(())
    }

    fn insert_named(
        &mut self,
        dimension: NamedDimension,
        name: &str,
    ) -> Result<SurrogateKey, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO {dimension} (name) VALUES (?) RETURNING id"
        ))?;
        Ok(stmt.query_row([name], |row| row.get(0))?)
    }

    fn find_named(
        &self,
        dimension: NamedDimension,
        name: &str,
    ) -> Result<Option<SurrogateKey>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id FROM {dimension} WHERE name = ?"))?;
        optional(stmt.query_row([name], |row| row.get(0)))
    }

    fn insert_time_period(&mut self, period: &TimePeriod) -> Result<SurrogateKey, DbError> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO timeperiod (year, month, week, day) VALUES (?, ?, ?, ?) RETURNING id",
        )?;
        Ok(stmt.query_row(
            params![period.year, period.month, period.week, period.day],
            |row| row.get(0),
        )?)
    }

    fn find_time_period(&self, period: &TimePeriod) -> Result<Option<SurrogateKey>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM timeperiod WHERE year = ? AND month = ? AND week = ? AND day = ?",
        )?;
        optional(stmt.query_row(
            params![period.year, period.month, period.week, period.day],
            |row| row.get(0),
        ))
    }

    fn insert_fact(&mut self, fact: &NewFact) -> Result<SurrogateKey, DbError> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO fact (district_id, category_id, time_id, crimes)
             VALUES (?, ?, ?, ?) RETURNING id",
        )?;
        Ok(stmt.query_row(
            params![fact.district_id, fact.category_id, fact.time_id, fact.crimes],
            |row| row.get(0),
        )?)
    }
}
