//! Country persistence.
//!
//! [`CountryStore`] is the seam the API layer and the refresh pipeline
//! depend on; [`SqliteCountryStore`] is the production implementation.
//! Case-insensitive uniqueness of `name` is a schema constraint
//! (`COLLATE NOCASE UNIQUE`), and the refresh upsert is a single
//! `INSERT .. ON CONFLICT DO UPDATE` statement, so the lookup-then-write
//! race with concurrent manual writes cannot create duplicate rows.

use crate::error::StoreError;
use crate::models::{Country, CountryData, CountryStats, ListFilter, SortOrder, UpdateCountry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS countries (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    name              TEXT NOT NULL COLLATE NOCASE UNIQUE,
    capital           TEXT,
    region            TEXT,
    population        INTEGER NOT NULL DEFAULT 0,
    currency_code     TEXT,
    exchange_rate     REAL,
    estimated_gdp     REAL,
    flag_url          TEXT,
    last_refreshed_at TEXT NOT NULL
)
"#;

#[async_trait]
pub trait CountryStore: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Country>, StoreError>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Country>, StoreError>;
    async fn insert(&self, data: &CountryData) -> Result<Country, StoreError>;
    /// Apply a partial update to the named record, refreshing its
    /// timestamp. `Ok(None)` when the name does not exist.
    async fn update_fields(
        &self,
        name: &str,
        changes: &UpdateCountry,
        now: DateTime<Utc>,
    ) -> Result<Option<Country>, StoreError>;
    /// `Ok(true)` when a record was deleted.
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;
    /// Insert-or-update keyed on the case-insensitive name, atomically.
    /// An update preserves the stored identity.
    async fn upsert(&self, data: &CountryData) -> Result<(), StoreError>;
    async fn stats(&self) -> Result<CountryStats, StoreError>;
    async fn top_by_gdp(&self, limit: i64) -> Result<Vec<Country>, StoreError>;
}

pub struct SqliteCountryStore {
    pool: SqlitePool,
}

impl SqliteCountryStore {
    /// Open (creating if needed) the database at `url` and ensure the
    /// schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory store, used by tests. Pinned to one connection
    /// so every query sees the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(sqlx::Error::from)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CountryStore for SqliteCountryStore {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Country>, StoreError> {
        let mut sql = String::from("SELECT * FROM countries WHERE 1=1");
        if filter.region.is_some() {
            sql.push_str(" AND LOWER(region) = LOWER(?)");
        }
        if filter.currency.is_some() {
            sql.push_str(" AND LOWER(currency_code) = LOWER(?)");
        }
        match filter.sort {
            Some(SortOrder::GdpDesc) => {
                sql.push_str(" ORDER BY estimated_gdp DESC NULLS LAST");
            }
            Some(SortOrder::GdpAsc) => {
                sql.push_str(" ORDER BY estimated_gdp ASC NULLS LAST");
            }
            None => sql.push_str(" ORDER BY id"),
        }

        let mut query = sqlx::query_as::<_, Country>(&sql);
        if let Some(region) = &filter.region {
            query = query.bind(region);
        }
        if let Some(currency) = &filter.currency {
            query = query.bind(currency);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Country>, StoreError> {
        let country = sqlx::query_as::<_, Country>("SELECT * FROM countries WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(country)
    }

    async fn insert(&self, data: &CountryData) -> Result<Country, StoreError> {
        let country = sqlx::query_as::<_, Country>(
            r#"
            INSERT INTO countries
                (name, capital, region, population, currency_code,
                 exchange_rate, estimated_gdp, flag_url, last_refreshed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.capital)
        .bind(&data.region)
        .bind(data.population)
        .bind(&data.currency_code)
        .bind(data.exchange_rate)
        .bind(data.estimated_gdp)
        .bind(&data.flag_url)
        .bind(data.last_refreshed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(country)
    }

    async fn update_fields(
        &self,
        name: &str,
        changes: &UpdateCountry,
        now: DateTime<Utc>,
    ) -> Result<Option<Country>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query_as::<_, Country>("SELECT * FROM countries WHERE name = ?1")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(existing) = existing else {
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, Country>(
            r#"
            UPDATE countries SET
                name = ?1, capital = ?2, region = ?3, population = ?4,
                currency_code = ?5, exchange_rate = ?6, estimated_gdp = ?7,
                flag_url = ?8, last_refreshed_at = ?9
            WHERE id = ?10
            RETURNING *
            "#,
        )
        .bind(changes.name.as_ref().unwrap_or(&existing.name))
        .bind(changes.capital.as_ref().or(existing.capital.as_ref()))
        .bind(changes.region.as_ref().or(existing.region.as_ref()))
        .bind(changes.population.unwrap_or(existing.population))
        .bind(
            changes
                .currency_code
                .as_ref()
                .or(existing.currency_code.as_ref()),
        )
        .bind(changes.exchange_rate.or(existing.exchange_rate))
        .bind(changes.estimated_gdp.or(existing.estimated_gdp))
        .bind(changes.flag_url.as_ref().or(existing.flag_url.as_ref()))
        .bind(now)
        .bind(existing.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM countries WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert(&self, data: &CountryData) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO countries
                (name, capital, region, population, currency_code,
                 exchange_rate, estimated_gdp, flag_url, last_refreshed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(name) DO UPDATE SET
                name = excluded.name,
                capital = excluded.capital,
                region = excluded.region,
                population = excluded.population,
                currency_code = excluded.currency_code,
                exchange_rate = excluded.exchange_rate,
                estimated_gdp = excluded.estimated_gdp,
                flag_url = excluded.flag_url,
                last_refreshed_at = excluded.last_refreshed_at
            "#,
        )
        .bind(&data.name)
        .bind(&data.capital)
        .bind(&data.region)
        .bind(data.population)
        .bind(&data.currency_code)
        .bind(data.exchange_rate)
        .bind(data.estimated_gdp)
        .bind(&data.flag_url)
        .bind(data.last_refreshed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<CountryStats, StoreError> {
        let (total, last_refreshed_at) =
            sqlx::query_as::<_, (i64, Option<DateTime<Utc>>)>(
                "SELECT COUNT(*), MAX(last_refreshed_at) FROM countries",
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(CountryStats {
            total,
            last_refreshed_at,
        })
    }

    async fn top_by_gdp(&self, limit: i64) -> Result<Vec<Country>, StoreError> {
        let rows = sqlx::query_as::<_, Country>(
            "SELECT * FROM countries ORDER BY estimated_gdp DESC NULLS LAST LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// True when the error is the unique-name constraint firing, i.e. a
/// concurrent writer got there first.
pub fn is_duplicate_name(err: &StoreError) -> bool {
    let StoreError::Database(sqlx::Error::Database(db)) = err else {
        return false;
    };
    db.is_unique_violation()
}
