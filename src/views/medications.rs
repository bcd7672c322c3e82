use std::collections::HashSet;

use crate::codec::comma;
use crate::error::Result;
use crate::storage::appointments::{self, AppointmentQuery};
use crate::storage::Store;

/// Flattens raw `Medication` column values into one list.
///
/// Entries are trimmed and blanks dropped. Duplicates are compared without
/// regard to letter case and the first spelling seen is kept.
pub fn unique_medications<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .flat_map(|column| comma::decode(column.as_ref().map(|c| c.as_ref())))
        .filter(|medication| seen.insert(medication.to_lowercase()))
        .collect()
}

/// Every medication prescribed across the patient's visits, oldest visit first.
pub fn patient_medications(store: &Store, patient_id: i64) -> Result<Vec<String>> {
    let visits = appointments::list(store, &AppointmentQuery::for_patient(patient_id))?;
    let mut seen = HashSet::new();
    Ok(visits
        .into_iter()
        .flat_map(|visit| visit.medications)
        .filter(|medication| seen.insert(medication.to_lowercase()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::appointments::fixtures::visit;
    use crate::storage::test_support;
    use pretty_assertions::assert_eq;

    #[test]
    fn dedups_ignoring_case() {
        let columns = [Some("Aspirin, Ibuprofen"), Some("ibuprofen "), Some(""), None];
        assert_eq!(unique_medications(columns), vec!["Aspirin", "Ibuprofen"]);
    }

    #[test]
    fn collects_across_visits() {
        let store = test_support::store();
        let first = appointments::insert(&store, &visit(5, "2024-01-10", "09:00")).unwrap();
        let second = appointments::insert(&store, &visit(5, "2024-02-10", "09:00")).unwrap();
        appointments::insert(&store, &visit(6, "2024-02-11", "09:00")).unwrap();
        appointments::add_medication(&store, first, "Metformin").unwrap();
        appointments::add_medication(&store, second, "metformin").unwrap();
        appointments::add_medication(&store, second, "Lisinopril").unwrap();

        assert_eq!(patient_medications(&store, 5).unwrap(), vec!["Metformin", "Lisinopril"]);
        assert!(patient_medications(&store, 6).unwrap().is_empty());
    }
}
