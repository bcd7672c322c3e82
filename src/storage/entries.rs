//! Normalized mirror of the packed multi-value columns.
//!
//! The legacy text columns stay authoritative for reads; these rows are
//! rewritten in the same transaction and exist for indexed lookups across
//! patients.

use rusqlite::{params, Connection};
use serde::Serialize;

use super::Store;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    Disease,
    Medication,
    Allergy,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Disease => "disease",
            EntryKind::Medication => "medication",
            EntryKind::Allergy => "allergy",
        }
    }
}

pub(crate) fn replace_visit_entries(
    conn: &Connection,
    appointment_id: i64,
    kind: EntryKind,
    values: &[String],
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM visit_entries WHERE AppointmentID = ?1 AND kind = ?2",
        params![appointment_id, kind.as_str()],
    )?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO visit_entries (AppointmentID, kind, position, value) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, value) in values.iter().enumerate() {
        stmt.execute(params![appointment_id, kind.as_str(), position as i64, value])?;
    }
    Ok(())
}

pub(crate) fn replace_history_entries(
    conn: &Connection,
    history_id: i64,
    kind: EntryKind,
    values: &[String],
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM history_entries WHERE HistoryID = ?1 AND kind = ?2",
        params![history_id, kind.as_str()],
    )?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO history_entries (HistoryID, kind, position, value) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, value) in values.iter().enumerate() {
        stmt.execute(params![history_id, kind.as_str(), position as i64, value])?;
    }
    Ok(())
}

/// Patients with `value` recorded under `kind` on any visit or in their
/// history. Matching ignores case.
pub fn patients_with(store: &Store, kind: EntryKind, value: &str) -> Result<Vec<i64>> {
    let value = value.trim().to_string();
    Ok(store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT a.HastaID FROM visit_entries v
             JOIN appointments a ON a.AppointmentID = v.AppointmentID
             WHERE v.kind = ?1 AND v.value = ?2 COLLATE NOCASE AND a.HastaID IS NOT NULL
             UNION
             SELECT h.HastaID FROM history_entries e
             JOIN history h ON h.HistoryID = e.HistoryID
             WHERE e.kind = ?1 AND e.value = ?2 COLLATE NOCASE
             ORDER BY 1",
        )?;
        let ids = stmt.query_map(params![kind.as_str(), value], |row| row.get(0))?;
        ids.collect()
    })?)
}

pub fn patients_with_medication(store: &Store, medication: &str) -> Result<Vec<i64>> {
    patients_with(store, EntryKind::Medication, medication)
}

pub fn patients_with_allergy(store: &Store, allergy: &str) -> Result<Vec<i64>> {
    patients_with(store, EntryKind::Allergy, allergy)
}
