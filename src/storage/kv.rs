use rusqlite::{params, OptionalExtension};

use super::{ChangeKind, Store, Table};
use crate::error::Result;

pub fn get(store: &Store, key: &str) -> Result<Option<String>> {
    Ok(store.read(|conn| {
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
    })?)
}

pub fn set(store: &Store, key: &str, value: &str) -> Result<()> {
    store.write(|tx| {
        tx.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
    })?;
    store.notify(Table::Kv, ChangeKind::Updated, None);
    Ok(())
}

pub fn remove(store: &Store, key: &str) -> Result<()> {
    store.write(|tx| tx.execute("DELETE FROM kv WHERE key = ?1", params![key]))?;
    store.notify(Table::Kv, ChangeKind::Deleted, None);
    Ok(())
}
