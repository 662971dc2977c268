//! Append-only forecast snapshots.

use chrono::{Local, NaiveDateTime, SubsecRound};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tenki_core::{RusqliteErrorExt, StorageError};
use tenki_forecast::{DailyForecasts, DayEntry, NormalizedDayRecord};

/// Wall-clock time of a fetch, second precision.
pub type FetchedAt = NaiveDateTime;

/// Storage format of `fetched_at`; sorts lexicographically in time order.
pub const FETCHED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse a `fetched_at` value in [`FETCHED_AT_FORMAT`].
pub fn parse_fetched_at(s: &str) -> Result<FetchedAt, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, FETCHED_AT_FORMAT)
}

fn format_fetched_at(fetched_at: &FetchedAt) -> String {
    fetched_at.format(FETCHED_AT_FORMAT).to_string()
}

/// One complete batch written by a single `write_snapshot` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastSnapshot {
    pub area_code: String,
    pub area_name: String,
    pub fetched_at: FetchedAt,
    /// Ordered by date
    pub days: Vec<DayEntry>,
}

/// SQLite store for forecast snapshots and the area catalog.
///
/// Holds only the database path. Every operation opens its own connection
/// and drops it before returning.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SnapshotStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout<P: AsRef<Path>>(
        path: P,
        busy_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::ConnectionFailed(format!("{}: {}", parent.display(), e))
            })?;
        }

        let store = Self { path, busy_timeout };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn connect(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&self.path).map_err(|e| {
            StorageError::ConnectionFailed(format!("{}: {}", self.path.display(), e))
        })?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(RusqliteErrorExt::into_storage_error)?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS areas (
                area_code TEXT PRIMARY KEY,
                area_name TEXT NOT NULL,
                area_name_en TEXT,
                area_type TEXT,
                parent_code TEXT,
                office_name TEXT
            );

            CREATE TABLE IF NOT EXISTS forecasts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                area_code TEXT NOT NULL,
                area_name TEXT,
                forecast_date TEXT NOT NULL,
                weather_code TEXT,
                weather TEXT,
                wind TEXT,
                wave TEXT,
                pop TEXT,
                temp_min TEXT,
                temp_max TEXT,
                reliability TEXT,
                fetched_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_forecasts_area_code ON forecasts(area_code);
            CREATE INDEX IF NOT EXISTS idx_forecasts_date ON forecasts(forecast_date);
            CREATE INDEX IF NOT EXISTS idx_forecasts_fetched ON forecasts(fetched_at);
            "#,
        )
        .map_err(|e| StorageError::ConnectionFailed(format!("Schema setup failed: {}", e)))?;
        Ok(())
    }

    /// Append one snapshot of `records` for an area and return its stamp.
    ///
    /// All rows are committed in one transaction or none are. Stamps for an
    /// area strictly increase: if the clock has not moved past the newest
    /// stored stamp, the newest stamp plus one second is used. Several writes
    /// for one area within a second therefore stamp ahead of the wall clock,
    /// by up to one second per extra write.
    pub fn write_snapshot(
        &self,
        area_code: &str,
        area_name: &str,
        records: &DailyForecasts,
    ) -> Result<FetchedAt, StorageError> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(write_error)?;

        let fetched_at = next_fetched_at(&tx, area_code)?;
        let stamp = format_fetched_at(&fetched_at);

        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO forecasts
                    (area_code, area_name, forecast_date, weather_code, weather, wind, wave, pop, temp_min, temp_max, reliability, fetched_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                    "#,
                )
                .map_err(write_error)?;

            for (date, record) in records {
                stmt.execute(params![
                    area_code,
                    area_name,
                    date,
                    record.weather_code,
                    record.weather,
                    record.wind,
                    record.wave,
                    record.pop,
                    record.temp_min,
                    record.temp_max,
                    record.reliability.map(|r| r.as_str()),
                    stamp,
                ])
                .map_err(write_error)?;
            }
        }

        tx.commit().map_err(write_error)?;

        if records.is_empty() {
            tracing::warn!("Snapshot for {} at {} has no records", area_code, stamp);
        } else {
            tracing::info!(
                "Stored {} forecast days for {} at {}",
                records.len(),
                area_code,
                stamp
            );
        }
        Ok(fetched_at)
    }

    /// Records of the most recent snapshot for an area, ordered by date.
    pub fn latest_snapshot(&self, area_code: &str) -> Result<Vec<DayEntry>, StorageError> {
        let conn = self.connect()?;
        let latest: Option<String> = conn
            .query_row(
                "SELECT MAX(fetched_at) FROM forecasts WHERE area_code = ?1",
                params![area_code],
                |row| row.get(0),
            )
            .map_err(RusqliteErrorExt::into_storage_error)?;

        match latest {
            Some(stamp) => Ok(query_rows(&conn, area_code, &stamp)?
                .into_iter()
                .map(|(_, entry)| entry)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Records of the snapshot stamped exactly `fetched_at`.
    pub fn snapshot_at(
        &self,
        area_code: &str,
        fetched_at: &FetchedAt,
    ) -> Result<Vec<DayEntry>, StorageError> {
        Ok(self
            .load_snapshot(area_code, fetched_at)?
            .map(|snapshot| snapshot.days)
            .unwrap_or_default())
    }

    /// The full snapshot stamped `fetched_at`, including the stored area name.
    pub fn load_snapshot(
        &self,
        area_code: &str,
        fetched_at: &FetchedAt,
    ) -> Result<Option<ForecastSnapshot>, StorageError> {
        let conn = self.connect()?;
        let rows = query_rows(&conn, area_code, &format_fetched_at(fetched_at))?;

        let area_name = match rows.first() {
            Some((name, _)) => name.clone().unwrap_or_default(),
            None => return Ok(None),
        };

        Ok(Some(ForecastSnapshot {
            area_code: area_code.to_string(),
            area_name,
            fetched_at: *fetched_at,
            days: rows.into_iter().map(|(_, entry)| entry).collect(),
        }))
    }

    /// Every stamp recorded for an area, most recent first.
    pub fn fetch_history(&self, area_code: &str) -> Result<Vec<FetchedAt>, StorageError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT fetched_at FROM forecasts WHERE area_code = ?1 ORDER BY fetched_at DESC",
            )
            .map_err(RusqliteErrorExt::into_storage_error)?;

        let stamps = stmt
            .query_map(params![area_code], |row| row.get::<_, String>(0))
            .map_err(RusqliteErrorExt::into_storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(RusqliteErrorExt::into_storage_error)?;

        stamps.iter().map(|s| parse_stored_stamp(s)).collect()
    }

    /// Every stamp across all areas, most recent first.
    pub fn all_fetch_times(&self) -> Result<Vec<FetchedAt>, StorageError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT fetched_at FROM forecasts ORDER BY fetched_at DESC")
            .map_err(RusqliteErrorExt::into_storage_error)?;

        let stamps = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(RusqliteErrorExt::into_storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(RusqliteErrorExt::into_storage_error)?;

        stamps.iter().map(|s| parse_stored_stamp(s)).collect()
    }
}

fn next_fetched_at(conn: &Connection, area_code: &str) -> Result<FetchedAt, StorageError> {
    let now = Local::now().naive_local().trunc_subsecs(0);
    let newest: Option<String> = conn
        .query_row(
            "SELECT MAX(fetched_at) FROM forecasts WHERE area_code = ?1",
            params![area_code],
            |row| row.get(0),
        )
        .map_err(RusqliteErrorExt::into_storage_error)?;

    match newest.as_deref().map(parse_stored_stamp).transpose()? {
        Some(newest) if now <= newest => Ok(newest + chrono::Duration::seconds(1)),
        _ => Ok(now),
    }
}

fn parse_stored_stamp(stamp: &str) -> Result<FetchedAt, StorageError> {
    parse_fetched_at(stamp)
        .map_err(|e| StorageError::Corruption(format!("Bad fetched_at {:?}: {}", stamp, e)))
}

/// Rows of one snapshot as `(area_name, entry)`, ordered by date.
fn query_rows(
    conn: &Connection,
    area_code: &str,
    stamp: &str,
) -> Result<Vec<(Option<String>, DayEntry)>, StorageError> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT area_name, forecast_date, weather_code, weather, wind, wave, pop, temp_min, temp_max, reliability
            FROM forecasts
            WHERE area_code = ?1 AND fetched_at = ?2
            ORDER BY forecast_date ASC
            "#,
        )
        .map_err(RusqliteErrorExt::into_storage_error)?;

    let rows = stmt
        .query_map(params![area_code, stamp], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row_to_entry(row)?))
        })
        .map_err(RusqliteErrorExt::into_storage_error)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(RusqliteErrorExt::into_storage_error)
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<DayEntry> {
    let reliability: Option<String> = row.get(9)?;

    Ok(DayEntry {
        date: row.get(1)?,
        record: NormalizedDayRecord {
            weather_code: row.get(2)?,
            weather: row.get(3)?,
            wind: row.get(4)?,
            wave: row.get(5)?,
            pop: row.get(6)?,
            temp_min: row.get(7)?,
            temp_max: row.get(8)?,
            reliability: reliability.and_then(|r| r.parse().ok()),
        },
    })
}

/// Classify a failure inside a write transaction.
pub(crate) fn write_error(e: rusqlite::Error) -> StorageError {
    match e.into_storage_error() {
        StorageError::QueryFailed(msg) => StorageError::WriteFailed(msg),
        other => other,
    }
}
