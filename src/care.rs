//! Multi-table operations on a patient's record.

use rusqlite::params;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::storage::{ChangeKind, Store, Table};

/// Rows removed by [`delete_patient_cascade`], per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub xrays: usize,
    pub patient_notes: usize,
    pub histories: usize,
    pub appointments: usize,
    pub patients: usize,
}

/// Deletes a patient together with everything that references it, in one
/// transaction: X-rays (the patient's own and those of its visits), patient
/// notes, history, visits, then the patient row. Image files are kept.
pub fn delete_patient_cascade(store: &Store, patient_id: i64) -> Result<CascadeReport> {
    let report = store.write(|tx| {
        let xrays = tx.execute(
            "DELETE FROM xray WHERE HastaID = ?1
             OR AppointmentID IN (SELECT AppointmentID FROM appointments WHERE HastaID = ?1)",
            params![patient_id],
        )?;
        let patient_notes = tx.execute("DELETE FROM patientNotes WHERE HastaID = ?1", params![patient_id])?;
        tx.execute(
            "DELETE FROM history_entries WHERE HistoryID IN (SELECT HistoryID FROM history WHERE HastaID = ?1)",
            params![patient_id],
        )?;
        let histories = tx.execute("DELETE FROM history WHERE HastaID = ?1", params![patient_id])?;
        tx.execute(
            "DELETE FROM visit_entries WHERE AppointmentID IN (SELECT AppointmentID FROM appointments WHERE HastaID = ?1)",
            params![patient_id],
        )?;
        let appointments = tx.execute("DELETE FROM appointments WHERE HastaID = ?1", params![patient_id])?;
        let patients = tx.execute("DELETE FROM patients WHERE HastaID = ?1", params![patient_id])?;
        Ok(CascadeReport { xrays, patient_notes, histories, appointments, patients })
    })?;
    info!(patient_id, ?report, "patient record deleted");

    for (table, removed) in [
        (Table::Xrays, report.xrays),
        (Table::PatientNotes, report.patient_notes),
        (Table::History, report.histories),
        (Table::Appointments, report.appointments),
    ] {
        if removed > 0 {
            store.notify(table, ChangeKind::Deleted, None);
        }
    }
    store.notify(Table::Patients, ChangeKind::Deleted, Some(patient_id));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::appointments::{self, fixtures::visit, AppointmentQuery};
    use crate::storage::patient_notes::{self, NewPatientNote};
    use crate::storage::patients::{self, fixtures::new_patient};
    use crate::storage::xrays::{self, NewXray};
    use crate::storage::{history, test_support};
    use pretty_assertions::assert_eq;

    fn seed(store: &Store, patient_id: i64) -> i64 {
        let visit_id = appointments::insert(store, &visit(patient_id, "2024-04-04", "11:00")).unwrap();
        appointments::add_medication(store, visit_id, "Aspirin").unwrap();
        xrays::insert(
            store,
            &NewXray {
                patient_id,
                appointment_id: Some(visit_id),
                file_name: "/media/x.png".into(),
                description: "PA".into(),
                appointment_date: None,
            },
        )
        .unwrap();
        patient_notes::insert(
            store,
            &NewPatientNote { patient_id, title: "Diet".into(), description: "Low salt".into() },
        )
        .unwrap();
        let mut record = history::load_or_create(store, patient_id).unwrap();
        record.add_allergy("Latex");
        history::save(store, &record).unwrap();
        visit_id
    }

    #[test]
    fn cascade_removes_every_dependent() {
        let store = test_support::store();
        let doomed = patients::insert(&store, &new_patient(1, "Maria", "Georgiou")).unwrap();
        let kept = patients::insert(&store, &new_patient(1, "Nikos", "Ioannou")).unwrap();
        seed(&store, doomed);
        seed(&store, kept);

        let report = delete_patient_cascade(&store, doomed).unwrap();
        assert_eq!(
            report,
            CascadeReport { xrays: 1, patient_notes: 1, histories: 1, appointments: 1, patients: 1 }
        );

        assert!(appointments::list(&store, &AppointmentQuery::for_patient(doomed)).unwrap().is_empty());
        assert!(xrays::list_for_patient_with_dates(&store, doomed).unwrap().is_empty());
        assert!(history::get_for_patient(&store, doomed).unwrap().is_none());
        assert_eq!(appointments::list(&store, &AppointmentQuery::for_patient(kept)).unwrap().len(), 1);

        let medicated = crate::storage::entries::patients_with_medication(&store, "aspirin").unwrap();
        assert_eq!(medicated, vec![kept]);
    }

    #[test]
    fn cascade_on_missing_patient_is_empty() {
        let store = test_support::store();
        assert_eq!(delete_patient_cascade(&store, 12).unwrap(), CascadeReport::default());
    }
}
