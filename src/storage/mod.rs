//! Core storage engine
//!
//! Handles the fundamental storage operations including:
//! - Opening the SQLite database and provisioning its schema
//! - Serializing access to the single connection
//! - Publishing a change event after every committed write
//!
//! Each entity has its own module of parameterized read/write operations.

pub mod appointments;
pub mod doctors;
pub mod entries;
pub mod history;
pub mod kv;
pub mod media;
pub mod notes;
pub mod patient_notes;
pub mod patients;
pub mod schema;
pub mod xrays;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Row, ToSql, Transaction};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the change channel; slow subscribers see `Lagged` and reload.
const CHANGE_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("file storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Tables that publish change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Table {
    Doctors,
    Patients,
    Appointments,
    Xrays,
    Notes,
    PatientNotes,
    History,
    Kv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// Published after a write commits. `id` is the affected row, when there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Change {
    pub table: Table,
    pub kind: ChangeKind,
    pub id: Option<i64>,
}

/// Where a patient came from, or where a visit takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Site {
    Clinic,
    Hospital,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Clinic => "Clinic",
            Site::Hospital => "Hospital",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown site: {0}")]
pub struct UnknownSite(pub String);

impl FromStr for Site {
    type Err = UnknownSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("Clinic") {
            Ok(Site::Clinic)
        } else if s.eq_ignore_ascii_case("Hospital") {
            Ok(Site::Hospital)
        } else {
            Err(UnknownSite(s.to_string()))
        }
    }
}

impl ToSql for Site {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Site {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: UnknownSite| FromSqlError::Other(Box::new(e)))
    }
}

/// Reads a nullable text column, mapping NULL to the empty string.
pub(crate) fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

/// Reads a nullable site column. Blank or unrecognized text reads as `None`
/// so one odd legacy row cannot fail a whole listing.
pub(crate) fn site(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Site>> {
    let raw = match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };
    match raw.parse() {
        Ok(site) => Ok(Some(site)),
        Err(UnknownSite(value)) => {
            warn!(%value, column = idx, "ignoring unknown site");
            Ok(None)
        }
    }
}

/// Owns the database connection and the change channel.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<Change>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(%mode, "journal mode set");
        info!(path = %path.display(), "opened clinic database");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Store {
            conn: Mutex::new(conn),
            changes,
        }
    }

    /// Creates or upgrades the schema. Safe to call on every start.
    pub fn ensure_schema(&self) -> Result<u32, StorageError> {
        let mut conn = self.lock()?;
        schema::ensure_schema(&mut conn)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    /// Runs `f` in one transaction. Nothing is published; callers notify
    /// after the commit.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub(crate) fn notify(&self, table: Table, kind: ChangeKind, id: Option<i64>) {
        debug!(?table, ?kind, ?id, "change committed");
        // No subscribers is fine.
        let _ = self.changes.send(Change { table, kind, id });
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn store() -> Store {
        let store = Store::open_in_memory().expect("in-memory database");
        store.ensure_schema().expect("schema");
        store
    }
}
