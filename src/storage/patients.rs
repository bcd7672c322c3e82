use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;

use super::{site, text, ChangeKind, Site, Store, Table};
use crate::error::{require, Result, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub amka: String,        // national health id
    pub sex: String,
    pub main_disease: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub date_of_birth: String,
    pub doctor_id: Option<i64>,
    pub source: Option<Site>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Patient {
            id: row.get(0)?,
            first_name: text(row, 1)?,
            last_name: text(row, 2)?,
            amka: text(row, 3)?,
            sex: text(row, 4)?,
            main_disease: text(row, 5)?,
            address: text(row, 6)?,
            postal_code: text(row, 7)?,
            city: text(row, 8)?,
            phone: text(row, 9)?,
            email: text(row, 10)?,
            date_of_birth: text(row, 11)?,
            doctor_id: row.get(12)?,
            source: site(row, 13)?,
        })
    }
}

/// Intake form. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub amka: String,
    pub sex: String,
    pub main_disease: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub date_of_birth: String,
    pub doctor_id: i64,
    pub source: Site,
}

impl Validate for NewPatient {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require("first name", &self.first_name)?;
        require("last name", &self.last_name)?;
        require("date of birth", &self.date_of_birth)?;
        require("AMKA number", &self.amka)?;
        require("sex", &self.sex)?;
        require("address", &self.address)?;
        require("postal code", &self.postal_code)?;
        require("city", &self.city)?;
        require("phone", &self.phone)?;
        require("email", &self.email)?;
        require("disease", &self.main_disease)
    }
}

const SELECT: &str = "SELECT HastaID, firstName, lastName, AMKAnumber, Sex, Disease, Address,
    PostalCode, City, Telefon, Email, dob, DoctorID, PatientSource FROM patients";

pub fn insert(store: &Store, patient: &NewPatient) -> Result<i64> {
    patient.validate()?;
    let id = store.write(|tx| {
        tx.execute(
            "INSERT INTO patients (firstName, lastName, AMKAnumber, Sex, Disease, Address, PostalCode,
             City, Telefon, Email, dob, DoctorID, PatientSource)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                patient.first_name.trim(),
                patient.last_name.trim(),
                patient.amka.trim(),
                patient.sex,
                patient.main_disease.trim(),
                patient.address.trim(),
                patient.postal_code.trim(),
                patient.city.trim(),
                patient.phone.trim(),
                patient.email.trim(),
                patient.date_of_birth.trim(),
                patient.doctor_id,
                patient.source,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    })?;
    info!(patient_id = id, doctor_id = patient.doctor_id, "patient added");
    store.notify(Table::Patients, ChangeKind::Inserted, Some(id));
    Ok(id)
}

pub fn get(store: &Store, id: i64) -> Result<Option<Patient>> {
    Ok(store.read(|conn| {
        conn.query_row(&format!("{SELECT} WHERE HastaID = ?1"), params![id], Patient::from_row)
            .optional()
    })?)
}

/// Patients owned by `doctor_id`, or every patient when `None`.
pub fn list(store: &Store, doctor_id: Option<i64>) -> Result<Vec<Patient>> {
    Ok(store.read(|conn| {
        let mut stmt = conn.prepare(&format!(
            "{SELECT} WHERE (?1 IS NULL OR DoctorID = ?1) ORDER BY HastaID"
        ))?;
        let rows = stmt.query_map(params![doctor_id], Patient::from_row)?;
        rows.collect()
    })?)
}

/// Overwrites the patient in place. A missing id is a no-op.
pub fn update(store: &Store, id: i64, patient: &NewPatient) -> Result<()> {
    patient.validate()?;
    store.write(|tx| {
        tx.execute(
            "UPDATE patients SET firstName = ?1, lastName = ?2, AMKAnumber = ?3, Sex = ?4, Disease = ?5,
             Address = ?6, PostalCode = ?7, City = ?8, Telefon = ?9, Email = ?10, dob = ?11,
             DoctorID = ?12, PatientSource = ?13
             WHERE HastaID = ?14",
            params![
                patient.first_name.trim(),
                patient.last_name.trim(),
                patient.amka.trim(),
                patient.sex,
                patient.main_disease.trim(),
                patient.address.trim(),
                patient.postal_code.trim(),
                patient.city.trim(),
                patient.phone.trim(),
                patient.email.trim(),
                patient.date_of_birth.trim(),
                patient.doctor_id,
                patient.source,
                id,
            ],
        )
    })?;
    store.notify(Table::Patients, ChangeKind::Updated, Some(id));
    Ok(())
}

/// Deletes the patient row only. Appointments, X-rays, notes and history
/// that reference it stay behind; `care::delete_patient_cascade` removes
/// them too.
pub fn delete(store: &Store, id: i64) -> Result<()> {
    let removed = store.write(|tx| tx.execute("DELETE FROM patients WHERE HastaID = ?1", params![id]))?;
    info!(patient_id = id, removed, "patient deleted");
    store.notify(Table::Patients, ChangeKind::Deleted, Some(id));
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn new_patient(doctor_id: i64, first: &str, last: &str) -> NewPatient {
        NewPatient {
            first_name: first.into(),
            last_name: last.into(),
            amka: "01018012345".into(),
            sex: "Female".into(),
            main_disease: "I10 - Essential (primary) hypertension".into(),
            address: "Ermou 12".into(),
            postal_code: "10563".into(),
            city: "Athens".into(),
            phone: "2101234567".into(),
            email: "patient@example.org".into(),
            date_of_birth: "1980-01-01".into(),
            doctor_id,
            source: Site::Clinic,
        }
    }
}
