use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;

use super::{text, ChangeKind, Store, Table};
use crate::error::{require, Result, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub profile_image: Option<String>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Doctor {
            id: row.get(0)?,
            first_name: text(row, 1)?,
            last_name: text(row, 2)?,
            email: text(row, 3)?,
            password: text(row, 4)?,
            profile_image: row.get(5)?,
        })
    }
}

/// Registration form, and the editable profile on later updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub profile_image: Option<String>,
}

impl Validate for DoctorProfile {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require("first name", &self.first_name)?;
        require("last name", &self.last_name)?;
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

const SELECT: &str = "SELECT DoctorID, firstName, lastName, email, password, pp FROM doctors";

pub fn register(store: &Store, profile: &DoctorProfile) -> Result<i64> {
    profile.validate()?;
    let id = store.write(|tx| {
        tx.execute(
            "INSERT INTO doctors (firstName, lastName, email, password, pp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.first_name.trim(),
                profile.last_name.trim(),
                profile.email.trim(),
                profile.password,
                profile.profile_image,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    })?;
    info!(doctor_id = id, "doctor registered");
    store.notify(Table::Doctors, ChangeKind::Inserted, Some(id));
    Ok(id)
}

pub fn get(store: &Store, id: i64) -> Result<Option<Doctor>> {
    Ok(store.read(|conn| {
        conn.query_row(&format!("{SELECT} WHERE DoctorID = ?1"), params![id], Doctor::from_row)
            .optional()
    })?)
}

pub fn list(store: &Store) -> Result<Vec<Doctor>> {
    Ok(store.read(|conn| {
        let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY DoctorID"))?;
        let rows = stmt.query_map([], Doctor::from_row)?;
        rows.collect()
    })?)
}

pub fn find_by_email(store: &Store, email: &str) -> Result<Option<Doctor>> {
    let email = email.trim().to_string();
    Ok(store.read(|conn| {
        conn.query_row(
            &format!("{SELECT} WHERE email = ?1 COLLATE NOCASE ORDER BY DoctorID LIMIT 1"),
            params![email],
            Doctor::from_row,
        )
        .optional()
    })?)
}

/// The doctor whose email and password both match.
pub fn authenticate(store: &Store, email: &str, password: &str) -> Result<Option<Doctor>> {
    Ok(find_by_email(store, email)?.filter(|doctor| doctor.password == password))
}

/// Overwrites every profile field. A missing id is a no-op.
pub fn update_profile(store: &Store, id: i64, profile: &DoctorProfile) -> Result<()> {
    profile.validate()?;
    store.write(|tx| {
        tx.execute(
            "UPDATE doctors SET firstName = ?1, lastName = ?2, email = ?3, password = ?4, pp = ?5
             WHERE DoctorID = ?6",
            params![
                profile.first_name.trim(),
                profile.last_name.trim(),
                profile.email.trim(),
                profile.password,
                profile.profile_image,
                id,
            ],
        )
    })?;
    store.notify(Table::Doctors, ChangeKind::Updated, Some(id));
    Ok(())
}
