//! SQLite-based daily rollup storage.
//!
//! `SqliteRollupStore` owns the connection and does blocking I/O.
//! `RollupStore` is the cloneable async handle the scheduler writes to.

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use heatwatch_engine::{DailySummary, RollupSink};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to create store directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Store task failed: {0}")]
    Task(String),
}

/// SQLite-backed rollup table.
pub struct SqliteRollupStore {
    conn: Connection,
}

impl SqliteRollupStore {
    /// Open (or create) the store at the given path.
    ///
    /// Creates parent directories, the database file and the schema as needed.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_summary (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                date TEXT NOT NULL,
                avg_temp REAL NOT NULL,
                max_temp REAL NOT NULL,
                min_temp REAL NOT NULL,
                dominant_condition TEXT NOT NULL,
                sample_count INTEGER NOT NULL,
                recorded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_summary_city_date ON weather_summary(city, date);
            "#,
        )?;
        Ok(())
    }

    /// Insert one summary row. Returns the row id.
    pub fn append(&self, summary: &DailySummary) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO weather_summary
                (city, date, avg_temp, max_temp, min_temp, dominant_condition, sample_count, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                summary.location,
                summary.day.format(DATE_FORMAT).to_string(),
                summary.average_temperature,
                summary.max_temperature,
                summary.min_temperature,
                summary.dominant_condition,
                summary.sample_count as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Inserted rollup {} for {} on {}", id, summary.location, summary.day);
        Ok(id)
    }

    /// All stored summaries for a location, oldest day first.
    ///
    /// This is the read side for external charting; the engine never calls it.
    pub fn summaries_for(&self, location: &str) -> Result<Vec<DailySummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT city, date, avg_temp, max_temp, min_temp, dominant_condition, sample_count
             FROM weather_summary
             WHERE city = ?1
             ORDER BY date ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![location], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (location, date, avg, max, min, dominant, samples) = row?;
            let day = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map_err(|e| StoreError::Corrupt(format!("bad date {:?}: {}", date, e)))?;
            summaries.push(DailySummary {
                location,
                day,
                average_temperature: avg,
                max_temperature: max,
                min_temperature: min,
                dominant_condition: dominant,
                sample_count: usize::try_from(samples).unwrap_or(0),
            });
        }
        Ok(summaries)
    }

    /// Total stored rows.
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM weather_summary", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// Cloneable async handle over a `SqliteRollupStore`.
///
/// SQLite calls run on the blocking pool.
#[derive(Clone)]
pub struct RollupStore {
    inner: Arc<Mutex<SqliteRollupStore>>,
}

impl RollupStore {
    pub fn new(store: SqliteRollupStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(SqliteRollupStore::new(path)?))
    }

    pub async fn summaries_for(&self, location: &str) -> Result<Vec<DailySummary>, StoreError> {
        let inner = Arc::clone(&self.inner);
        let location = location.to_string();
        tokio::task::spawn_blocking(move || inner.lock().summaries_for(&location))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl RollupSink for RollupStore {
    type Error = StoreError;

    async fn append(&self, summary: &DailySummary) -> Result<(), StoreError> {
        let inner = Arc::clone(&self.inner);
        let summary = summary.clone();
        tokio::task::spawn_blocking(move || inner.lock().append(&summary).map(|_| ()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
