use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{text, ChangeKind, Store, Table};
use crate::error::{require, Result, Validate, ValidationError};

/// A personal note, not tied to any patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub description: String,
}

impl Validate for NewNote {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require("title", &self.title)?;
        require("description", &self.description)
    }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: text(row, 1)?,
        description: text(row, 2)?,
    })
}

pub fn insert(store: &Store, note: &NewNote) -> Result<i64> {
    note.validate()?;
    let id = store.write(|tx| {
        tx.execute(
            "INSERT INTO notes (Title, Description) VALUES (?1, ?2)",
            params![note.title.trim(), note.description.trim()],
        )?;
        Ok(tx.last_insert_rowid())
    })?;
    store.notify(Table::Notes, ChangeKind::Inserted, Some(id));
    Ok(id)
}

pub fn get(store: &Store, id: i64) -> Result<Option<Note>> {
    Ok(store.read(|conn| {
        conn.query_row(
            "SELECT NoteID, Title, Description FROM notes WHERE NoteID = ?1",
            params![id],
            from_row,
        )
        .optional()
    })?)
}

/// Newest first.
pub fn list(store: &Store) -> Result<Vec<Note>> {
    Ok(store.read(|conn| {
        let mut stmt = conn.prepare("SELECT NoteID, Title, Description FROM notes ORDER BY NoteID DESC")?;
        let rows = stmt.query_map([], from_row)?;
        rows.collect()
    })?)
}

pub fn update(store: &Store, id: i64, note: &NewNote) -> Result<()> {
    note.validate()?;
    store.write(|tx| {
        tx.execute(
            "UPDATE notes SET Title = ?1, Description = ?2 WHERE NoteID = ?3",
            params![note.title.trim(), note.description.trim(), id],
        )
    })?;
    store.notify(Table::Notes, ChangeKind::Updated, Some(id));
    Ok(())
}

pub fn delete(store: &Store, id: i64) -> Result<()> {
    store.write(|tx| tx.execute("DELETE FROM notes WHERE NoteID = ?1", params![id]))?;
    store.notify(Table::Notes, ChangeKind::Deleted, Some(id));
    Ok(())
}
