use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CacheError, Result};

/// Human-entered description for a repository, keyed by GitHub's repository id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionOverride {
    pub repo_id: u64,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
}

/// Record store for description overrides. Records are never deleted here.
pub trait DescriptionStore: Send + Sync {
    fn get(&self, repo_id: u64) -> Result<Option<DescriptionOverride>>;

    /// Insert unless a record already exists. Returns whether a record was created.
    ///
    /// Losing an insert race to another writer counts as success.
    fn create_if_absent(&self, record: &DescriptionOverride) -> Result<bool>;

    /// Insert or fully replace the record for `record.repo_id`
    fn upsert(&self, record: &DescriptionOverride) -> Result<()>;
}

/// SQLite integers are signed 64-bit
fn sql_id(repo_id: u64) -> Result<i64> {
    i64::try_from(repo_id).map_err(|_| CacheError::IdOutOfRange(repo_id))
}

pub struct SqliteDescriptionStore {
    conn: Mutex<Connection>,
}

impl SqliteDescriptionStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS repo_descriptions (
                repo_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                description TEXT
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lookup(conn: &Connection, repo_id: u64) -> Result<Option<DescriptionOverride>> {
        let record = conn
            .query_row(
                "SELECT repo_id, name, url, description FROM repo_descriptions WHERE repo_id = ?1",
                params![sql_id(repo_id)?],
                |row| {
                    let stored: i64 = row.get(0)?;
                    Ok(DescriptionOverride {
                        repo_id: u64::try_from(stored)
                            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, stored))?,
                        name: row.get(1)?,
                        url: row.get(2)?,
                        description: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Plain INSERT; a primary key collision means someone else got there first
    fn insert_new(conn: &Connection, record: &DescriptionOverride) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT INTO repo_descriptions (repo_id, name, url, description) VALUES (?1, ?2, ?3, ?4)",
            params![
                sql_id(record.repo_id)?,
                record.name,
                record.url,
                record.description
            ],
        );

        match inserted {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                debug!("Description for {} was created concurrently", record.repo_id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl DescriptionStore for SqliteDescriptionStore {
    fn get(&self, repo_id: u64) -> Result<Option<DescriptionOverride>> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        Self::lookup(&conn, repo_id)
    }

    fn create_if_absent(&self, record: &DescriptionOverride) -> Result<bool> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        if Self::lookup(&conn, record.repo_id)?.is_some() {
            return Ok(false);
        }
        Self::insert_new(&conn, record)
    }

    fn upsert(&self, record: &DescriptionOverride) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            "INSERT INTO repo_descriptions (repo_id, name, url, description) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(repo_id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                description = excluded.description",
            params![
                sql_id(record.repo_id)?,
                record.name,
                record.url,
                record.description
            ],
        )?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDescriptionStore {
    records: Mutex<HashMap<u64, DescriptionOverride>>,
}

impl MemoryDescriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DescriptionStore for MemoryDescriptionStore {
    fn get(&self, repo_id: u64) -> Result<Option<DescriptionOverride>> {
        let records = self.records.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(records.get(&repo_id).cloned())
    }

    fn create_if_absent(&self, record: &DescriptionOverride) -> Result<bool> {
        let mut records = self.records.lock().map_err(|_| CacheError::Poisoned)?;
        if records.contains_key(&record.repo_id) {
            return Ok(false);
        }
        records.insert(record.repo_id, record.clone());
        Ok(true)
    }

    fn upsert(&self, record: &DescriptionOverride) -> Result<()> {
        let mut records = self.records.lock().map_err(|_| CacheError::Poisoned)?;
        records.insert(record.repo_id, record.clone());
        Ok(())
    }
}
