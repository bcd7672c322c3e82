//! Free-text medical history, one row per patient.
//!
//! The row is created the first time a patient's history is opened. Its three
//! lists are JSON arrays; saving re-serializes all of them and overwrites the
//! row, so the last save wins.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;

use super::entries::{self, EntryKind};
use super::{ChangeKind, Store, Table};
use crate::codec::json;
use crate::error::Result;
use crate::reference::DiagnosisCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryField {
    Diseases,
    Medications,
    Allergies,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatientHistory {
    pub id: i64,
    pub patient_id: i64,
    pub diseases: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
}

impl PatientHistory {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PatientHistory {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            diseases: json::decode(row.get::<_, Option<String>>(2)?.as_deref()),
            medications: json::decode(row.get::<_, Option<String>>(3)?.as_deref()),
            allergies: json::decode(row.get::<_, Option<String>>(4)?.as_deref()),
        })
    }

    pub fn field(&self, field: HistoryField) -> &[String] {
        match field {
            HistoryField::Diseases => &self.diseases,
            HistoryField::Medications => &self.medications,
            HistoryField::Allergies => &self.allergies,
        }
    }

    fn field_mut(&mut self, field: HistoryField) -> &mut Vec<String> {
        match field {
            HistoryField::Diseases => &mut self.diseases,
            HistoryField::Medications => &mut self.medications,
            HistoryField::Allergies => &mut self.allergies,
        }
    }

    /// Adds the code's `"CODE - description"` label unless it is already
    /// listed. Returns whether the list changed.
    pub fn add_disease(&mut self, code: &DiagnosisCode) -> bool {
        let label = code.label();
        if self.diseases.contains(&label) {
            return false;
        }
        self.diseases.push(label);
        true
    }

    /// Appends a trimmed medication; blank input is ignored.
    pub fn add_medication(&mut self, medication: &str) -> bool {
        push_trimmed(&mut self.medications, medication)
    }

    /// Appends a trimmed allergy; blank input is ignored.
    pub fn add_allergy(&mut self, allergy: &str) -> bool {
        push_trimmed(&mut self.allergies, allergy)
    }

    /// Removes the entry at `index`, if there is one.
    pub fn remove_at(&mut self, field: HistoryField, index: usize) -> Option<String> {
        let list = self.field_mut(field);
        (index < list.len()).then(|| list.remove(index))
    }
}

fn push_trimmed(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    list.push(value.to_string());
    true
}

const SELECT: &str =
    "SELECT HistoryID, HastaID, Diseases, Medications, Allergies FROM history WHERE HastaID = ?1
     ORDER BY HistoryID LIMIT 1";

fn find(conn: &Connection, patient_id: i64) -> rusqlite::Result<Option<PatientHistory>> {
    conn.query_row(SELECT, params![patient_id], PatientHistory::from_row).optional()
}

/// The patient's history row, without creating one.
pub fn get_for_patient(store: &Store, patient_id: i64) -> Result<Option<PatientHistory>> {
    Ok(store.read(|conn| find(conn, patient_id))?)
}

/// The patient's history row, created empty on first access. The lookup and
/// the insert share a transaction, so repeated calls never duplicate it.
pub fn load_or_create(store: &Store, patient_id: i64) -> Result<PatientHistory> {
    let (history, created) = store.write(|tx| {
        if let Some(existing) = find(tx, patient_id)? {
            return Ok((existing, false));
        }
        tx.execute(
            "INSERT INTO history (HastaID, Diseases, Medications, Allergies) VALUES (?1, '[]', '[]', '[]')",
            params![patient_id],
        )?;
        let history = PatientHistory {
            id: tx.last_insert_rowid(),
            patient_id,
            ..Default::default()
        };
        Ok((history, true))
    })?;
    if created {
        info!(patient_id, history_id = history.id, "history row created");
        store.notify(Table::History, ChangeKind::Inserted, Some(history.id));
    }
    Ok(history)
}

/// Overwrites all three lists of the row identified by `history.id`.
pub fn save(store: &Store, history: &PatientHistory) -> Result<()> {
    store.write(|tx| {
        let updated = tx.execute(
            "UPDATE history SET Diseases = ?1, Medications = ?2, Allergies = ?3 WHERE HistoryID = ?4",
            params![
                json::encode(&history.diseases),
                json::encode(&history.medications),
                json::encode(&history.allergies),
                history.id,
            ],
        )?;
        if updated > 0 {
            entries::replace_history_entries(tx, history.id, EntryKind::Disease, &history.diseases)?;
            entries::replace_history_entries(tx, history.id, EntryKind::Medication, &history.medications)?;
            entries::replace_history_entries(tx, history.id, EntryKind::Allergy, &history.allergies)?;
        }
        Ok(())
    })?;
    store.notify(Table::History, ChangeKind::Updated, Some(history.id));
    Ok(())
}
