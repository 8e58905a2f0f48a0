use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{CacheError, Result};

/// One hour, in milliseconds
pub const DEFAULT_TTL_MS: i64 = 3_600_000;

/// What a backend keeps per key: the serialized payload and when it was fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub payload: String,
    /// Epoch milliseconds
    pub last_request_date: i64,
}

/// Key/value backend for the response cache.
///
/// Writes replace the whole entry for a key; nothing is ever merged.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<StoredEntry>>;
    fn save(&self, key: &str, entry: &StoredEntry) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Cache backend using SQLite
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - Survives restarts, like the browser store it replaces
/// - Doesn't require a separate process
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Initialize schema on first run
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                last_request_date INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl CacheStore for SqliteStore {
    fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let entry = conn
            .query_row(
                "SELECT payload, last_request_date FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    Ok(StoredEntry {
                        payload: row.get(0)?,
                        last_request_date: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn save(&self, key: &str, entry: &StoredEntry) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            "INSERT INTO cache_entries (key, payload, last_request_date) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                last_request_date = excluded.last_request_date",
            params![key, entry.payload, entry.last_request_date],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Process-local backend, handy for tests and one-shot runs
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, entry: &StoredEntry) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Source of "now" in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Result of a cache read
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    pub value: T,
    pub is_fresh: bool,
    pub last_request_date: i64,
}

/// TTL cache over any `CacheStore`.
///
/// A key is Absent until written, Fresh for `ttl_ms` after each write, then
/// Stale until rewritten or cleared. Callers refetch on a stale or absent read.
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), DEFAULT_TTL_MS)
    }

    pub fn with_clock(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, ttl_ms: i64) -> Self {
        Self {
            store,
            clock,
            ttl_ms,
        }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheRead<T>>> {
        let Some(entry) = self.store.load(key)? else {
            debug!("Cache miss for {}", key);
            return Ok(None);
        };

        let value: T = serde_json::from_str(&entry.payload)?;
        let age = self.clock.now_millis() - entry.last_request_date;
        let is_fresh = age < self.ttl_ms;
        debug!("Cache hit for {} (age {}ms, fresh: {})", key, age, is_fresh);

        Ok(Some(CacheRead {
            value,
            is_fresh,
            last_request_date: entry.last_request_date,
        }))
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let entry = StoredEntry {
            payload: serde_json::to_string(value)?,
            last_request_date: self.clock.now_millis(),
        };
        self.store.save(key, &entry)
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        debug!("Clearing cache entry {}", key);
        self.store.delete(key)
    }
}
