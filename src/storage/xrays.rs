use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use super::media::MediaStore;
use super::{appointments, text, ChangeKind, Store, Table};
use crate::error::{require, ClinicError, Result, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Xray {
    pub id: i64,
    pub appointment_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub file_name: String,               // path of the copy in app storage
    pub description: String,
    pub appointment_date: Option<String>, // set when attached without a visit
}

impl Xray {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Xray {
            id: row.get(0)?,
            appointment_id: row.get(1)?,
            patient_id: row.get(2)?,
            file_name: text(row, 3)?,
            description: text(row, 4)?,
            appointment_date: row.get(5)?,
        })
    }
}

/// An X-ray with the date of the visit it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatedXray {
    #[serde(flatten)]
    pub xray: Xray,
    pub visit_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewXray {
    pub patient_id: i64,
    pub appointment_id: Option<i64>,
    pub file_name: String,
    pub description: String,
    pub appointment_date: Option<NaiveDate>,
}

impl Validate for NewXray {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require("file", &self.file_name)?;
        require("description", &self.description)?;
        if self.appointment_id.is_none() && self.appointment_date.is_none() {
            return Err(ValidationError::MissingField("appointment date"));
        }
        Ok(())
    }
}

const SELECT: &str =
    "SELECT XrayID, AppointmentID, HastaID, FileName, Description, AppointmentDate FROM xray";

pub fn insert(store: &Store, xray: &NewXray) -> Result<i64> {
    xray.validate()?;
    let id = store.write(|tx| {
        tx.execute(
            "INSERT INTO xray (FileName, Description, AppointmentID, HastaID, AppointmentDate)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                xray.file_name,
                xray.description.trim(),
                xray.appointment_id,
                xray.patient_id,
                xray.appointment_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        Ok(tx.last_insert_rowid())
    })?;
    info!(xray_id = id, patient_id = xray.patient_id, "x-ray attached");
    store.notify(Table::Xrays, ChangeKind::Inserted, Some(id));
    Ok(id)
}

/// Copies the picked image into app storage and attaches it to the visit
/// and that visit's patient.
pub fn attach_to_appointment(
    store: &Store,
    media: &MediaStore,
    source: &Path,
    description: &str,
    appointment_id: i64,
) -> Result<i64> {
    require("description", description)?;
    let appointment = appointments::get(store, appointment_id)?
        .ok_or(ClinicError::NotFound { entity: "appointment", id: appointment_id })?;
    let patient_id = appointment
        .patient_id
        .ok_or(ClinicError::NotFound { entity: "patient of appointment", id: appointment_id })?;
    let stored = media.import(source)?;
    let xray = NewXray {
        patient_id,
        appointment_id: Some(appointment_id),
        file_name: stored.to_string_lossy().into_owned(),
        description: description.to_string(),
        appointment_date: None,
    };
    insert_or_discard(store, &stored, &xray)
}

/// Copies the picked image into app storage and attaches it to the patient
/// with an explicit visit date.
pub fn attach_to_patient(
    store: &Store,
    media: &MediaStore,
    source: &Path,
    description: &str,
    patient_id: i64,
    visit_date: NaiveDate,
) -> Result<i64> {
    require("description", description)?;
    let stored = media.import(source)?;
    let xray = NewXray {
        patient_id,
        appointment_id: None,
        file_name: stored.to_string_lossy().into_owned(),
        description: description.to_string(),
        appointment_date: Some(visit_date),
    };
    insert_or_discard(store, &stored, &xray)
}

/// Inserts the row for an imported copy, removing the copy if the insert fails.
fn insert_or_discard(store: &Store, stored: &Path, xray: &NewXray) -> Result<i64> {
    insert(store, xray).map_err(|err| {
        if let Err(io_err) = std::fs::remove_file(stored) {
            warn!(path = %stored.display(), error = %io_err, "could not remove orphaned image copy");
        }
        err
    })
}

pub fn get(store: &Store, id: i64) -> Result<Option<Xray>> {
    Ok(store.read(|conn| {
        conn.query_row(&format!("{SELECT} WHERE XrayID = ?1"), params![id], Xray::from_row)
            .optional()
    })?)
}

pub fn list_for_appointment(store: &Store, appointment_id: i64) -> Result<Vec<Xray>> {
    Ok(store.read(|conn| {
        let mut stmt = conn.prepare(&format!("{SELECT} WHERE AppointmentID = ?1 ORDER BY XrayID"))?;
        let rows = stmt.query_map(params![appointment_id], Xray::from_row)?;
        rows.collect()
    })?)
}

/// The patient's X-rays with the owning visit's date, or the date recorded
/// on the X-ray itself when it has no visit.
pub fn list_for_patient_with_dates(store: &Store, patient_id: i64) -> Result<Vec<DatedXray>> {
    Ok(store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT x.XrayID, x.AppointmentID, x.HastaID, x.FileName, x.Description, x.AppointmentDate,
                    COALESCE(a.Date, x.AppointmentDate)
             FROM xray x
             LEFT JOIN appointments a ON x.AppointmentID = a.AppointmentID
             WHERE x.HastaID = ?1
             ORDER BY x.XrayID",
        )?;
        let rows = stmt.query_map(params![patient_id], |row| {
            Ok(DatedXray {
                xray: Xray::from_row(row)?,
                visit_date: row.get(6)?,
            })
        })?;
        rows.collect()
    })?)
}

/// Rewrites the row's links, file and description. A missing id is a no-op.
pub fn update(store: &Store, id: i64, xray: &NewXray) -> Result<()> {
    xray.validate()?;
    store.write(|tx| {
        tx.execute(
            "UPDATE xray SET FileName = ?1, Description = ?2, AppointmentID = ?3, HastaID = ?4,
             AppointmentDate = ?5
             WHERE XrayID = ?6",
            params![
                xray.file_name,
                xray.description.trim(),
                xray.appointment_id,
                xray.patient_id,
                xray.appointment_date.map(|d| d.format("%Y-%m-%d").to_string()),
                id,
            ],
        )
    })?;
    store.notify(Table::Xrays, ChangeKind::Updated, Some(id));
    Ok(())
}

/// Deletes the row. The image file stays in app storage.
pub fn delete(store: &Store, id: i64) -> Result<()> {
    store.write(|tx| tx.execute("DELETE FROM xray WHERE XrayID = ?1", params![id]))?;
    store.notify(Table::Xrays, ChangeKind::Deleted, Some(id));
    Ok(())
}
