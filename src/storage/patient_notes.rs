use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{text, ChangeKind, Store, Table};
use crate::error::{require, Result, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientNote {
    pub id: i64,
    pub patient_id: Option<i64>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatientNote {
    pub patient_id: i64,
    pub title: String,
    pub description: String,
}

impl Validate for NewPatientNote {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require("title", &self.title)?;
        require("description", &self.description)
    }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<PatientNote> {
    Ok(PatientNote {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        title: text(row, 2)?,
        description: text(row, 3)?,
    })
}

pub fn insert(store: &Store, note: &NewPatientNote) -> Result<i64> {
    note.validate()?;
    let id = store.write(|tx| {
        tx.execute(
            "INSERT INTO patientNotes (Title, Description, HastaID) VALUES (?1, ?2, ?3)",
            params![note.title.trim(), note.description.trim(), note.patient_id],
        )?;
        Ok(tx.last_insert_rowid())
    })?;
    store.notify(Table::PatientNotes, ChangeKind::Inserted, Some(id));
    Ok(id)
}

pub fn get(store: &Store, id: i64) -> Result<Option<PatientNote>> {
    Ok(store.read(|conn| {
        conn.query_row(
            "SELECT PatientNoteID, HastaID, Title, Description FROM patientNotes WHERE PatientNoteID = ?1",
            params![id],
            from_row,
        )
        .optional()
    })?)
}

/// The patient's notes, newest first.
pub fn list_for_patient(store: &Store, patient_id: i64) -> Result<Vec<PatientNote>> {
    Ok(store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT PatientNoteID, HastaID, Title, Description FROM patientNotes
             WHERE HastaID = ?1 ORDER BY PatientNoteID DESC",
        )?;
        let rows = stmt.query_map(params![patient_id], from_row)?;
        rows.collect()
    })?)
}

pub fn update(store: &Store, id: i64, title: &str, description: &str) -> Result<()> {
    require("title", title)?;
    require("description", description)?;
    store.write(|tx| {
        tx.execute(
            "UPDATE patientNotes SET Title = ?1, Description = ?2 WHERE PatientNoteID = ?3",
            params![title.trim(), description.trim(), id],
        )
    })?;
    store.notify(Table::PatientNotes, ChangeKind::Updated, Some(id));
    Ok(())
}

pub fn delete(store: &Store, id: i64) -> Result<()> {
    store.write(|tx| tx.execute("DELETE FROM patientNotes WHERE PatientNoteID = ?1", params![id]))?;
    store.notify(Table::PatientNotes, ChangeKind::Deleted, Some(id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support;

    #[test]
    fn notes_are_scoped_to_patient() {
        let store = test_support::store();
        let draft = |patient_id| NewPatientNote {
            patient_id,
            title: "Diet".into(),
            description: "Low sodium".into(),
        };
        let mine = insert(&store, &draft(1)).unwrap();
        insert(&store, &draft(2)).unwrap();

        let notes = list_for_patient(&store, 1).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, mine);

        update(&store, mine, "Diet", "Low sodium, low sugar").unwrap();
        assert_eq!(get(&store, mine).unwrap().unwrap().description, "Low sodium, low sugar");
        delete(&store, mine).unwrap();
        assert!(list_for_patient(&store, 1).unwrap().is_empty());
    }
}
