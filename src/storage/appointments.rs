//! Appointments ("visits") and the packed fields edited on the visit screen.
//!
//! `VisitDisease` and `Medication` are comma-joined lists. Every edit
//! re-encodes the whole list, overwrites the column and rewrites the
//! matching `visit_entries` rows in the same transaction.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::Serialize;
use tracing::{debug, info};

use super::entries::{self, EntryKind};
use super::{site, text, ChangeKind, Site, Store, Table};
use crate::codec::comma;
use crate::error::{require, ClinicError, Result, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: Option<i64>,
    pub patient_name: String,   // snapshot taken when the visit was booked
    pub date: String,           // YYYY-MM-DD
    pub hour: String,           // HH:MM
    pub description: String,
    pub location: Option<Site>,
    pub diseases: Vec<String>,
    pub medications: Vec<String>,
    pub note: Option<String>,
}

impl Appointment {
    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Appointment {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            patient_name: text(row, 2)?,
            date: text(row, 3)?,
            hour: text(row, 4)?,
            description: text(row, 5)?,
            location: site(row, 6)?,
            diseases: comma::decode(row.get::<_, Option<String>>(7)?.as_deref()),
            medications: comma::decode(row.get::<_, Option<String>>(8)?.as_deref()),
            note: row.get::<_, Option<String>>(9)?.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// Accepts `YYYY-MM-DD` with or without a trailing time part.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split('T').next().unwrap_or(raw).trim();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// An appointment joined with its patient's current name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentWithPatient {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl AppointmentWithPatient {
    /// Current patient name, falling back to the booking snapshot when the
    /// patient row is gone.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (None, None) => self.appointment.patient_name.clone(),
            (first, last) => format!(
                "{} {}",
                first.as_deref().unwrap_or_default(),
                last.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string(),
        }
    }
}

impl AsRef<Appointment> for Appointment {
    fn as_ref(&self) -> &Appointment {
        self
    }
}

impl AsRef<Appointment> for AppointmentWithPatient {
    fn as_ref(&self) -> &Appointment {
        &self.appointment
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub patient_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub description: String,
    pub location: Site,
}

impl Validate for NewAppointment {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require("description", &self.description)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub patient_id: Option<i64>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl AppointmentQuery {
    pub fn for_patient(patient_id: i64) -> Self {
        AppointmentQuery {
            patient_id: Some(patient_id),
            ..Default::default()
        }
    }
}

const COLUMNS: &str = "AppointmentID, HastaID, PatientName, Date, Hour, Description, Location,
    VisitDisease, Medication, Note";

pub fn insert(store: &Store, appointment: &NewAppointment) -> Result<i64> {
    appointment.validate()?;
    let id = store.write(|tx| {
        tx.execute(
            "INSERT INTO appointments (PatientName, Description, Date, Hour, HastaID, Location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                appointment.patient_name.trim(),
                appointment.description.trim(),
                appointment.date.format("%Y-%m-%d").to_string(),
                appointment.time.format("%H:%M").to_string(),
                appointment.patient_id,
                appointment.location,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    })?;
    info!(appointment_id = id, patient_id = appointment.patient_id, "appointment booked");
    store.notify(Table::Appointments, ChangeKind::Inserted, Some(id));
    Ok(id)
}

pub fn get(store: &Store, id: i64) -> Result<Option<Appointment>> {
    Ok(store.read(|conn| {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM appointments WHERE AppointmentID = ?1"),
            params![id],
            Appointment::from_row,
        )
        .optional()
    })?)
}

/// Appointments ordered by date then time, optionally for one patient.
pub fn list(store: &Store, query: &AppointmentQuery) -> Result<Vec<Appointment>> {
    let direction = match query.order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    let limit = query.limit.map_or(-1, |n| n as i64);
    let appointments = store.read(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM appointments
             WHERE (?1 IS NULL OR HastaID = ?1)
             ORDER BY Date {direction}, Hour {direction}, AppointmentID {direction}
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![query.patient_id, limit], Appointment::from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
    })?;
    debug!(count = appointments.len(), ?query, "appointments listed");
    Ok(appointments)
}

/// The patient's `n` most recent visits, newest first.
pub fn latest_for_patient(store: &Store, patient_id: i64, n: usize) -> Result<Vec<Appointment>> {
    list(
        store,
        &AppointmentQuery {
            patient_id: Some(patient_id),
            order: SortOrder::Descending,
            limit: Some(n),
        },
    )
}

/// Every visit of the patient, newest first.
pub fn visit_history(store: &Store, patient_id: i64) -> Result<Vec<Appointment>> {
    list(
        store,
        &AppointmentQuery {
            patient_id: Some(patient_id),
            order: SortOrder::Descending,
            limit: None,
        },
    )
}

/// All appointments with their patient's name, oldest first. Visits whose
/// patient was deleted are kept with empty names.
pub fn list_with_patient_names(store: &Store) -> Result<Vec<AppointmentWithPatient>> {
    Ok(store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT a.AppointmentID, a.HastaID, a.PatientName, a.Date, a.Hour, a.Description, a.Location,
                    a.VisitDisease, a.Medication, a.Note, p.firstName, p.lastName
             FROM appointments a
             LEFT JOIN patients p ON a.HastaID = p.HastaID
             ORDER BY a.Date, a.Hour, a.AppointmentID",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AppointmentWithPatient {
                appointment: Appointment::from_row(row)?,
                first_name: row.get(10)?,
                last_name: row.get(11)?,
            })
        })?;
        rows.collect()
    })?)
}

/// Rewrites the booking fields. Diseases, medications and the note are
/// left alone. A missing id is a no-op.
pub fn update(store: &Store, id: i64, appointment: &NewAppointment) -> Result<()> {
    appointment.validate()?;
    store.write(|tx| {
        tx.execute(
            "UPDATE appointments SET PatientName = ?1, Description = ?2, Date = ?3, Hour = ?4,
             HastaID = ?5, Location = ?6
             WHERE AppointmentID = ?7",
            params![
                appointment.patient_name.trim(),
                appointment.description.trim(),
                appointment.date.format("%Y-%m-%d").to_string(),
                appointment.time.format("%H:%M").to_string(),
                appointment.patient_id,
                appointment.location,
                id,
            ],
        )
    })?;
    store.notify(Table::Appointments, ChangeKind::Updated, Some(id));
    Ok(())
}

/// Deletes the visit. X-rays attached to it are not removed.
pub fn delete(store: &Store, id: i64) -> Result<()> {
    store.write(|tx| {
        tx.execute("DELETE FROM visit_entries WHERE AppointmentID = ?1", params![id])?;
        tx.execute("DELETE FROM appointments WHERE AppointmentID = ?1", params![id])
    })?;
    info!(appointment_id = id, "appointment deleted");
    store.notify(Table::Appointments, ChangeKind::Deleted, Some(id));
    Ok(())
}

/// Replaces the visit's diagnosis list. A missing id is a no-op.
pub fn set_diseases(store: &Store, id: i64, diseases: &[String]) -> Result<()> {
    store.write(|tx| write_list(tx, id, EntryKind::Disease, diseases))?;
    store.notify(Table::Appointments, ChangeKind::Updated, Some(id));
    Ok(())
}

/// Adds `label` to the visit's diagnoses, or removes it when already present.
/// Returns the resulting list.
pub fn toggle_disease(store: &Store, id: i64, label: &str) -> Result<Vec<String>> {
    let label = label.trim();
    require("diagnosis", label)?;
    edit_list(store, id, EntryKind::Disease, |diseases| {
        if let Some(pos) = diseases.iter().position(|d| d == label) {
            diseases.remove(pos);
        } else {
            diseases.push(label.to_string());
        }
    })
}

pub fn remove_disease(store: &Store, id: i64, label: &str) -> Result<Vec<String>> {
    let label = label.trim();
    edit_list(store, id, EntryKind::Disease, |diseases| diseases.retain(|d| d != label))
}

pub fn add_medication(store: &Store, id: i64, medication: &str) -> Result<Vec<String>> {
    let medication = medication.trim();
    require("medication", medication)?;
    edit_list(store, id, EntryKind::Medication, |medications| {
        medications.push(medication.to_string())
    })
}

/// Removes every occurrence of `medication`, comparing trimmed values.
pub fn remove_medication(store: &Store, id: i64, medication: &str) -> Result<Vec<String>> {
    let medication = medication.trim();
    edit_list(store, id, EntryKind::Medication, |medications| {
        medications.retain(|m| m.trim() != medication)
    })
}

/// Replaces the visit's single free-text note.
pub fn set_note(store: &Store, id: i64, note: &str) -> Result<()> {
    require("note", note)?;
    store.write(|tx| {
        tx.execute(
            "UPDATE appointments SET Note = ?1 WHERE AppointmentID = ?2",
            params![note.trim(), id],
        )
    })?;
    store.notify(Table::Appointments, ChangeKind::Updated, Some(id));
    Ok(())
}

fn column_for(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Medication => "Medication",
        _ => "VisitDisease",
    }
}

fn write_list(tx: &Transaction<'_>, id: i64, kind: EntryKind, values: &[String]) -> rusqlite::Result<()> {
    let encoded = comma::encode(values);
    let updated = tx.execute(
        &format!("UPDATE appointments SET {} = ?1 WHERE AppointmentID = ?2", column_for(kind)),
        params![encoded, id],
    )?;
    if updated > 0 {
        // Mirror what a later read will decode.
        entries::replace_visit_entries(tx, id, kind, &comma::decode(Some(&encoded)))?;
    }
    Ok(())
}

/// Read-modify-write of one packed list inside a single transaction.
fn edit_list(
    store: &Store,
    id: i64,
    kind: EntryKind,
    edit: impl FnOnce(&mut Vec<String>),
) -> Result<Vec<String>> {
    let column = column_for(kind);
    let updated = store.write(|tx| {
        let current: Option<Option<String>> = tx
            .query_row(
                &format!("SELECT {column} FROM appointments WHERE AppointmentID = ?1"),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Ok(None);
        };
        let mut values = comma::decode(current.as_deref());
        edit(&mut values);
        write_list(tx, id, kind, &values)?;
        Ok(Some(comma::decode(Some(&comma::encode(&values)))))
    })?;
    let values = updated.ok_or(ClinicError::NotFound { entity: "appointment", id })?;
    store.notify(Table::Appointments, ChangeKind::Updated, Some(id));
    Ok(values)
}


#[cfg(test)]
mod tests {
    use super::fixtures::visit;
    use super::*;
    use crate::storage::test_support;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_orders_by_date_then_time() {
        let store = test_support::store();
        let late = insert(&store, &visit(1, "2024-03-01", "15:30")).unwrap();
        let early = insert(&store, &visit(1, "2024-03-01", "09:00")).unwrap();
        let first = insert(&store, &visit(1, "2024-01-10", "12:00")).unwrap();
        insert(&store, &visit(2, "2024-02-01", "12:00")).unwrap();

        let asc: Vec<i64> = list(&store, &AppointmentQuery::for_patient(1)).unwrap().iter().map(|a| a.id).collect();
        assert_eq!(asc, vec![first, early, late]);

        let latest: Vec<i64> = latest_for_patient(&store, 1, 2).unwrap().iter().map(|a| a.id).collect();
        assert_eq!(latest, vec![late, early]);

        assert_eq!(list(&store, &AppointmentQuery::default()).unwrap().len(), 4);
        assert_eq!(visit_history(&store, 1).unwrap().len(), 3);
    }

    #[test]
    fn insert_formats_date_and_time() {
        let store = test_support::store();
        let id = insert(&store, &visit(1, "2024-03-01", "09:05")).unwrap();
        let appointment = get(&store, id).unwrap().unwrap();
        assert_eq!(appointment.date, "2024-03-01");
        assert_eq!(appointment.hour, "09:05");
        assert_eq!(appointment.location, Some(Site::Clinic));
        assert!(appointment.diseases.is_empty());
        assert_eq!(appointment.note, None);
    }

    #[test]
    fn description_is_required() {
        let store = test_support::store();
        let mut draft = visit(1, "2024-03-01", "09:05");
        draft.description = String::new();
        assert!(matches!(insert(&store, &draft), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn toggle_disease_adds_then_removes() {
        let store = test_support::store();
        let id = insert(&store, &visit(1, "2024-03-01", "09:00")).unwrap();
        toggle_disease(&store, id, "I10 - Essential (primary) hypertension").unwrap();
        let after = toggle_disease(&store, id, "J45 - Asthma").unwrap();
        assert_eq!(after, vec!["I10 - Essential (primary) hypertension", "J45 - Asthma"]);

        let raw: String = store
            .read(|c| c.query_row("SELECT VisitDisease FROM appointments WHERE AppointmentID = ?1", [id], |r| r.get(0)))
            .unwrap();
        assert_eq!(raw, "I10 - Essential (primary) hypertension, J45 - Asthma");

        let after = toggle_disease(&store, id, "J45 - Asthma").unwrap();
        assert_eq!(after, vec!["I10 - Essential (primary) hypertension"]);
        let after = remove_disease(&store, id, "I10 - Essential (primary) hypertension").unwrap();
        assert!(after.is_empty());
    }

    #[test]
    fn medications_round_trip_through_column() {
        let store = test_support::store();
        let id = insert(&store, &visit(1, "2024-03-01", "09:00")).unwrap();
        add_medication(&store, id, " Aspirin ").unwrap();
        add_medication(&store, id, "Ibuprofen").unwrap();
        let left = remove_medication(&store, id, "Aspirin").unwrap();
        assert_eq!(left, vec!["Ibuprofen"]);
        assert_eq!(get(&store, id).unwrap().unwrap().medications, vec!["Ibuprofen"]);
        assert!(matches!(add_medication(&store, id, "  "), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn editing_missing_visit_is_not_found() {
        let store = test_support::store();
        assert!(matches!(
            add_medication(&store, 42, "Aspirin"),
            Err(ClinicError::NotFound { entity: "appointment", id: 42 })
        ));
        // Whole-list replacement keeps the silent no-op contract.
        assert!(set_diseases(&store, 42, &["J45 - Asthma".to_string()]).is_ok());
    }

    #[test]
    fn set_note_overwrites() {
        let store = test_support::store();
        let id = insert(&store, &visit(1, "2024-03-01", "09:00")).unwrap();
        set_note(&store, id, "BP elevated").unwrap();
        set_note(&store, id, "BP normal on recheck").unwrap();
        assert_eq!(get(&store, id).unwrap().unwrap().note.as_deref(), Some("BP normal on recheck"));
    }

    #[test]
    fn blank_legacy_location_does_not_break_listing() {
        let store = test_support::store();
        insert(&store, &visit(1, "2024-01-01", "09:00")).unwrap();
        store
            .write(|tx| {
                tx.execute(
                    "INSERT INTO appointments (Date, Hour, HastaID, Location) VALUES ('2024-01-02', '10:00', 1, '')",
                    [],
                )
            })
            .unwrap();
        let locations: Vec<Option<Site>> =
            list(&store, &AppointmentQuery::default()).unwrap().iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![Some(Site::Clinic), None]);
        assert_eq!(list_with_patient_names(&store).unwrap().len(), 2);
    }

    #[test]
    fn joined_listing_survives_patient_delete() {
        let store = test_support::store();
        insert(&store, &visit(99, "2024-03-01", "09:00")).unwrap();
        let rows = list_with_patient_names(&store).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].first_name, None);
        assert_eq!(rows[0].display_name(), "Maria Georgiou");
    }

    #[test]
    fn parse_date_accepts_iso_timestamps() {
        assert_eq!(parse_date("2024-06-01T10:00:00.000Z"), NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(parse_date("garbage"), None);
    }
}
