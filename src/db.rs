use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, Row};
use thiserror::Error;

use crate::models::{Category, EventRecord, RecordError};
use crate::recommend::EventCatalog;
use crate::utils;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),
    #[error("catalog task failed: {0}")]
    Task(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

const SELECT_COLUMNS: &str = "SELECT id, name, type, description, location, date, start_time, \
     end_time, price_min, price_max, capacity, available_spots FROM events";

// (name, type, description, location, date, start, end, price_min, price_max, capacity, available)
type SampleRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    f64,
    f64,
    i64,
    i64,
);

const SAMPLE_EVENTS: [SampleRow; 14] = [
    ("Summer Concert", "outdoor", "Live music in the park", "Central Park", "2026-02-15", "18:00", "22:00", 25.0, 50.0, 500, 120),
    ("Art Exhibition", "indoor", "Modern art showcase", "City Gallery", "2026-02-15", "10:00", "18:00", 0.0, 15.0, 200, 200),
    ("Morning Yoga", "outdoor", "Sunrise yoga session", "Beach Park", "2026-02-15", "06:00", "07:30", 10.0, 10.0, 30, 8),
    ("Food Festival", "outdoor", "International cuisine", "Waterfront", "2026-02-16", "12:00", "20:00", 0.0, 0.0, 1000, 850),
    ("Theater Show", "indoor", "Classical drama", "Grand Theater", "2026-02-16", "19:30", "21:30", 40.0, 80.0, 300, 45),
    ("Cooking Workshop", "indoor", "Learn Italian cuisine", "Culinary Studio", "2026-02-16", "14:00", "17:00", 60.0, 60.0, 15, 3),
    ("Night Market", "outdoor", "Street food and crafts", "Downtown Square", "2026-02-16", "18:00", "23:00", 0.0, 0.0, 2000, 2000),
    ("Museum Tour", "indoor", "Guided historical tour", "National Museum", "2026-02-15", "11:00", "13:00", 12.0, 12.0, 50, 22),
    ("Morning Yoga", "outdoor", "Sunrise yoga session", "Beach Park", "2026-02-16", "06:00", "07:30", 10.0, 10.0, 30, 12),
    ("Morning Yoga", "outdoor", "Sunrise yoga session", "Beach Park", "2026-02-18", "06:00", "07:30", 10.0, 10.0, 30, 30),
    ("Summer Concert", "outdoor", "Live music in the park", "Central Park", "2026-02-19", "18:00", "22:00", 25.0, 50.0, 500, 410),
    ("Night Market", "outdoor", "Street food and crafts", "Downtown Square", "2026-02-18", "18:00", "23:00", 0.0, 0.0, 2000, 1500),
    ("Theater Show", "indoor", "Classical drama", "Grand Theater", "2026-02-18", "19:30", "21:30", 40.0, 80.0, 300, 0),
    ("Museum Tour", "indoor", "Guided historical tour", "National Museum", "2026-02-19", "11:00", "13:00", 12.0, 12.0, 50, 41),
];

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events(
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                price_min REAL NOT NULL DEFAULT 0,
                price_max REAL NOT NULL DEFAULT 0,
                capacity INTEGER NOT NULL,
                available_spots INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_date ON events(date);",
        )?;
        Ok(())
    }

    pub fn count(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
    }

    pub fn seed_if_empty(&self) -> rusqlite::Result<usize> {
        if self.count()? > 0 {
            return Ok(0);
        }
        self.insert_samples()
    }

    /// Drops every stored event and reloads the sample catalog.
    pub fn reset_with_samples(&self) -> rusqlite::Result<usize> {
        self.conn.execute_batch("DROP TABLE IF EXISTS events;")?;
        self.init_schema()?;
        self.insert_samples()
    }

    fn insert_samples(&self) -> rusqlite::Result<usize> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO events (name, type, description, location, date, start_time, end_time,
                                 price_min, price_max, capacity, available_spots)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for row in SAMPLE_EVENTS.iter() {
            stmt.execute(params![
                row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8, row.9, row.10
            ])?;
        }
        tracing::debug!(count = SAMPLE_EVENTS.len(), "seeded sample events");
        Ok(SAMPLE_EVENTS.len())
    }

    /// Inserts a record under a fresh id and returns that id.
    pub fn insert_event(&self, event: &EventRecord) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO events (name, type, description, location, date, start_time, end_time,
                                 price_min, price_max, capacity, available_spots)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.name,
                event.category.as_str(),
                event.description,
                event.location,
                event.date,
                event.start_time.format("%H:%M").to_string(),
                event.end_time.format("%H:%M").to_string(),
                event.price_min,
                event.price_max,
                event.capacity,
                event.available_spots,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn events_on(&self, date: NaiveDate) -> CatalogResult<Vec<EventRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE date = ?1 ORDER BY start_time, id");
        self.load(&sql, params![date])
    }

    pub fn all_events(&self) -> CatalogResult<Vec<EventRecord>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY date, start_time, id");
        self.load(&sql, [])
    }

    fn load<P: rusqlite::Params>(&self, sql: &str, params: P) -> CatalogResult<Vec<EventRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawRow::from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }
}

struct RawRow {
    id: i64,
    name: String,
    kind: String,
    description: String,
    location: String,
    date: String,
    start_time: String,
    end_time: String,
    price_min: f64,
    price_max: f64,
    capacity: i64,
    available_spots: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            description: row.get(3)?,
            location: row.get(4)?,
            date: row.get(5)?,
            start_time: row.get(6)?,
            end_time: row.get(7)?,
            price_min: row.get(8)?,
            price_max: row.get(9)?,
            capacity: row.get(10)?,
            available_spots: row.get(11)?,
        })
    }

    fn into_record(self) -> Result<EventRecord, RecordError> {
        let id = self.id;
        let invalid = |reason: String| RecordError { id, reason };

        let category = self
            .kind
            .parse::<Category>()
            .map_err(|_| invalid(format!("unknown event type {:?}", self.kind)))?;
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| invalid(format!("malformed date {:?}", self.date)))?;
        let start_time = parse_clock(&self.start_time)
            .ok_or_else(|| invalid(format!("malformed start time {:?}", self.start_time)))?;
        let end_time = parse_clock(&self.end_time)
            .ok_or_else(|| invalid(format!("malformed end time {:?}", self.end_time)))?;
        let capacity = u32::try_from(self.capacity)
            .map_err(|_| invalid(format!("capacity {} out of range", self.capacity)))?;
        let available_spots = u32::try_from(self.available_spots).map_err(|_| {
            invalid(format!(
                "available spots {} out of range",
                self.available_spots
            ))
        })?;

        let record = EventRecord {
            id,
            name: self.name,
            category,
            description: self.description,
            location: self.location,
            date,
            start_time,
            end_time,
            price_min: self.price_min,
            price_max: self.price_max,
            capacity,
            available_spots,
        };
        record.validate()?;
        Ok(record)
    }
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}

/// Catalog port backed by a SQLite file. Each query opens its own connection
/// on the blocking pool.
pub struct SqliteCatalog {
    path: PathBuf,
}

impl SqliteCatalog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn with_store<T, F>(&self, query: F) -> CatalogResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Store) -> CatalogResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> CatalogResult<T> {
            let store = Store::open(&path)?;
            query(&store)
        })
        .await
        .map_err(|err| CatalogError::Task(err.to_string()))?
    }
}

#[async_trait]
impl EventCatalog for SqliteCatalog {
    async fn events_on(&self, date: NaiveDate) -> CatalogResult<Vec<EventRecord>> {
        self.with_store(move |store| store.events_on(date)).await
    }

    async fn all_events(&self) -> CatalogResult<Vec<EventRecord>> {
        self.with_store(|store| store.all_events()).await
    }
}
