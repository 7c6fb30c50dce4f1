//! Repository Implementation

use crate::{NewReading, Reading, StorageError};
use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Default number of pooled connections for an on-disk database
pub const DEFAULT_POOL_SIZE: u32 = 5;

/// Layout SQLite's `strftime('%Y-%m-%dT%H:%M:%f')` produces. Fixed width, so
/// lexical order of the column equals chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Space-separated layout written by earlier deployments into the same table
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS sensor_data (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    temperature REAL    NOT NULL,
    humidity    REAL    NOT NULL,
    gas_level   INTEGER NOT NULL,
    timestamp   TEXT    NOT NULL
)";

const CREATE_INDEX: &str = "\
CREATE INDEX IF NOT EXISTS idx_sensor_data_recent
    ON sensor_data (timestamp DESC, id DESC)";

// The timestamp is stamped by SQLite inside the insert, under the same write
// lock that assigns the id.
// Rewrites space-separated timestamps so they sort alongside `T`-separated ones.
const NORMALIZE_TIMESTAMPS: &str = "\
UPDATE sensor_data
SET timestamp = replace(timestamp, ' ', 'T')
WHERE timestamp LIKE '____-__-__ %'";

const INSERT_READING: &str = "\
INSERT INTO sensor_data (temperature, humidity, gas_level, timestamp)
VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%f', 'now'))
RETURNING id, temperature, humidity, gas_level, timestamp";

const SELECT_RECENT: &str = "\
SELECT id, temperature, humidity, gas_level, timestamp
FROM sensor_data
ORDER BY timestamp DESC, id DESC
LIMIT ?1";

/// Append-only store of sensor readings backed by SQLite
#[derive(Debug, Clone)]
pub struct ReadingRepository {
    pool: SqlitePool,
}

impl ReadingRepository {
    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// `url` takes the usual sqlx form, e.g. `sqlite://sensor_data.db`.
    pub async fn open(url: &str) -> Result<Self, StorageError> {
        Self::open_with_pool_size(url, DEFAULT_POOL_SIZE).await
    }

    /// Same as [`open`](Self::open) with an explicit pool size.
    pub async fn open_with_pool_size(url: &str, pool_size: u32) -> Result<Self, StorageError> {
        info!("Opening SQLite repository at {}", url);
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size.max(1))
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Create a private in-memory repository.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self, StorageError> {
        debug!("Creating in-memory repository");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_INDEX).execute(&pool).await?;

        let normalized = sqlx::query(NORMALIZE_TIMESTAMPS)
            .execute(&pool)
            .await?
            .rows_affected();
        if normalized > 0 {
            info!("Normalized {} legacy reading timestamps", normalized);
        }

        Ok(Self { pool })
    }

    /// Persist a reading, returning it with its assigned id and timestamp.
    pub async fn insert(&self, reading: NewReading) -> Result<Reading, StorageError> {
        if !reading.temperature.is_finite() {
            return Err(StorageError::NonFinite {
                field: "temperature",
            });
        }
        if !reading.humidity.is_finite() {
            return Err(StorageError::NonFinite { field: "humidity" });
        }

        let row = sqlx::query(INSERT_READING)
            .bind(reading.temperature)
            .bind(reading.humidity)
            .bind(reading.gas_level)
            .fetch_one(&self.pool)
            .await?;

        let stored = map_reading_row(&row)?;
        debug!("Inserted reading with ID {}", stored.id);
        Ok(stored)
    }

    /// Up to `limit` readings, newest first (ties broken by higher id).
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Reading>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(SELECT_RECENT)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_reading_row).collect()
    }

    /// Total number of stored readings
    pub async fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sensor_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Close every pooled connection. Later calls fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite repository closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn map_reading_row(row: &SqliteRow) -> Result<Reading, StorageError> {
    let raw_timestamp: String = row.try_get("timestamp")?;
    let naive = parse_timestamp(&raw_timestamp)?;

    Ok(Reading {
        id: row.try_get("id")?,
        temperature: row.try_get("temperature")?,
        humidity: row.try_get("humidity")?,
        gas_level: row.try_get("gas_level")?,
        timestamp: Utc.from_utc_datetime(&naive),
    })
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, StorageError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT))
        .map_err(|e| StorageError::InvalidTimestamp(format!("{raw}: {e}")))
}
