//! Schema provisioning, versioned through `PRAGMA user_version`.
//!
//! Version 1 is the layout the mobile app has always shipped: one table per
//! entity, multi-value fields packed into text columns, no foreign keys.
//! Databases created by the app report version 0 but already hold these
//! tables, which is why every statement is `IF NOT EXISTS`.
//!
//! Version 2 adds `visit_entries` and `history_entries`, one row per packed
//! value, kept in step with the legacy columns on every write.

use rusqlite::{params, Connection, Transaction};
use tracing::info;

use super::entries::{self, EntryKind};
use super::StorageError;
use crate::codec::{comma, json};

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS doctors (
    DoctorID   INTEGER PRIMARY KEY AUTOINCREMENT,
    firstName  TEXT NOT NULL,
    lastName   TEXT NOT NULL,
    email      TEXT NOT NULL,
    password   TEXT NOT NULL,   -- clear text, as the app has always stored it
    pp         TEXT             -- profile image path
);

CREATE TABLE IF NOT EXISTS patients (
    HastaID        INTEGER PRIMARY KEY AUTOINCREMENT,
    firstName      TEXT,
    lastName       TEXT,
    AMKAnumber     TEXT,
    Sex            TEXT,
    Disease        TEXT,
    Address        TEXT,
    PostalCode     TEXT,
    City           TEXT,
    Telefon        TEXT,
    Email          TEXT,
    dob            TEXT,
    DoctorID       INTEGER,
    PatientSource  TEXT            -- 'Clinic' | 'Hospital'
);

CREATE TABLE IF NOT EXISTS appointments (
    AppointmentID  INTEGER PRIMARY KEY AUTOINCREMENT,
    PatientName    TEXT,
    Description    TEXT,
    Date           TEXT NOT NULL,  -- YYYY-MM-DD
    Hour           TEXT NOT NULL,  -- HH:MM
    HastaID        INTEGER,
    Location       TEXT,
    VisitDisease   TEXT,           -- comma-joined diagnosis labels
    Medication     TEXT,           -- comma-joined
    Note           TEXT
);

CREATE TABLE IF NOT EXISTS xray (
    XrayID           INTEGER PRIMARY KEY AUTOINCREMENT,
    FileName         TEXT NOT NULL,
    Description      TEXT,
    AppointmentID    INTEGER,
    HastaID          INTEGER,
    AppointmentDate  TEXT
);

CREATE TABLE IF NOT EXISTS notes (
    NoteID       INTEGER PRIMARY KEY AUTOINCREMENT,
    Title        TEXT NOT NULL,
    Description  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patientNotes (
    PatientNoteID  INTEGER PRIMARY KEY AUTOINCREMENT,
    Title          TEXT NOT NULL,
    Description    TEXT NOT NULL,
    HastaID        INTEGER
);

CREATE TABLE IF NOT EXISTS history (
    HistoryID    INTEGER PRIMARY KEY AUTOINCREMENT,
    HastaID      INTEGER NOT NULL,
    Diseases     TEXT,             -- JSON array of strings
    Medications  TEXT,             -- JSON array of strings
    Allergies    TEXT              -- JSON array of strings
);

CREATE TABLE IF NOT EXISTS kv (
    key    TEXT PRIMARY KEY,
    value  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_doctor ON patients(DoctorID);
CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(HastaID);
CREATE INDEX IF NOT EXISTS idx_appointments_when ON appointments(Date, Hour);
CREATE INDEX IF NOT EXISTS idx_xray_patient ON xray(HastaID);
CREATE INDEX IF NOT EXISTS idx_xray_appointment ON xray(AppointmentID);
CREATE INDEX IF NOT EXISTS idx_patient_notes_patient ON patientNotes(HastaID);
CREATE INDEX IF NOT EXISTS idx_history_patient ON history(HastaID);
";

const SCHEMA_V2: &str = "
CREATE TABLE IF NOT EXISTS visit_entries (
    AppointmentID  INTEGER NOT NULL,
    kind           TEXT NOT NULL,  -- 'disease' | 'medication'
    position       INTEGER NOT NULL,
    value          TEXT NOT NULL,
    PRIMARY KEY (AppointmentID, kind, position)
);

CREATE TABLE IF NOT EXISTS history_entries (
    HistoryID  INTEGER NOT NULL,
    kind       TEXT NOT NULL,      -- 'disease' | 'medication' | 'allergy'
    position   INTEGER NOT NULL,
    value      TEXT NOT NULL,
    PRIMARY KEY (HistoryID, kind, position)
);

CREATE INDEX IF NOT EXISTS idx_visit_entries_value ON visit_entries(kind, value COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_history_entries_value ON history_entries(kind, value COLLATE NOCASE);
";

struct Migration {
    version: u32,
    apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, apply: apply_v1 },
    Migration { version: 2, apply: apply_v2 },
];

pub const LATEST_VERSION: u32 = 2;

/// Applies every migration newer than the database's `user_version`, each in
/// its own transaction, and returns the resulting version.
pub fn ensure_schema(conn: &mut Connection) -> Result<u32, StorageError> {
    let start = schema_version(conn)?;
    let mut current = start;
    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        let tx = conn.transaction()?;
        (migration.apply)(&tx)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
        info!(version = migration.version, "schema migrated");
        current = migration.version;
    }
    Ok(current)
}

pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

fn apply_v1(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(SCHEMA_V1)
}

fn apply_v2(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(SCHEMA_V2)?;
    backfill_visit_entries(tx)?;
    backfill_history_entries(tx)
}

fn backfill_visit_entries(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    let rows: Vec<(i64, Option<String>, Option<String>)> = {
        let mut stmt = tx.prepare("SELECT AppointmentID, VisitDisease, Medication FROM appointments")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };
    for (id, diseases, medications) in &rows {
        entries::replace_visit_entries(tx, *id, EntryKind::Disease, &comma::decode(diseases.as_deref()))?;
        entries::replace_visit_entries(tx, *id, EntryKind::Medication, &comma::decode(medications.as_deref()))?;
    }
    info!(appointments = rows.len(), "visit entries backfilled");
    Ok(())
}

fn backfill_history_entries(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    let rows: Vec<(i64, Option<String>, Option<String>, Option<String>)> = {
        let mut stmt = tx.prepare("SELECT HistoryID, Diseases, Medications, Allergies FROM history")?;
        let rows = stmt.query_map(params![], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        rows.collect::<rusqlite::Result<_>>()?
    };
    for (id, diseases, medications, allergies) in &rows {
        entries::replace_history_entries(tx, *id, EntryKind::Disease, &json::decode(diseases.as_deref()))?;
        entries::replace_history_entries(tx, *id, EntryKind::Medication, &json::decode(medications.as_deref()))?;
        entries::replace_history_entries(tx, *id, EntryKind::Allergy, &json::decode(allergies.as_deref()))?;
    }
    info!(histories = rows.len(), "history entries backfilled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let names = stmt.query_map([], |row| row.get(0)).unwrap();
        names.collect::<rusqlite::Result<_>>().unwrap()
    }

    #[test]
    fn fresh_database_reaches_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(ensure_schema(&mut conn).unwrap(), LATEST_VERSION);
        assert_eq!(
            table_names(&conn),
            vec![
                "appointments", "doctors", "history", "history_entries", "kv", "notes",
                "patientNotes", "patients", "visit_entries", "xray",
            ]
        );
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn).unwrap();
        conn.execute("INSERT INTO notes (Title, Description) VALUES ('t', 'd')", []).unwrap();
        assert_eq!(ensure_schema(&mut conn).unwrap(), LATEST_VERSION);
        let notes: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |r| r.get(0)).unwrap();
        assert_eq!(notes, 1);
    }

    #[test]
    fn legacy_database_is_backfilled() {
        let mut conn = Connection::open_in_memory().unwrap();
        // An app-created database: tables present, user_version still 0.
        conn.execute_batch(SCHEMA_V1).unwrap();
        conn.execute(
            "INSERT INTO appointments (Date, Hour, HastaID, VisitDisease, Medication)
             VALUES ('2024-01-01', '09:00', 1, 'I10 - Essential (primary) hypertension', 'Aspirin, Ramipril')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO history (HastaID, Diseases, Medications, Allergies) VALUES (1, '[\"E11 - Type 2 diabetes mellitus\"]', 'oops', '[\"Latex\"]')",
            [],
        )
        .unwrap();

        assert_eq!(ensure_schema(&mut conn).unwrap(), LATEST_VERSION);

        let visit: Vec<String> = conn
            .prepare("SELECT value FROM visit_entries WHERE kind = 'medication' ORDER BY position")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(visit, vec!["Aspirin", "Ramipril"]);

        let history: i64 = conn
            .query_row("SELECT COUNT(*) FROM history_entries", [], |r| r.get(0))
            .unwrap();
        // The malformed medications column contributes nothing.
        assert_eq!(history, 2);
    }
}
