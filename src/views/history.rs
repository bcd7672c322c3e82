//! Combined medical history for the patient detail screen.

use rusqlite::params;
use serde::Serialize;

use crate::error::Result;
use crate::storage::{patients, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MedicalHistoryView {
    pub main_disease: Option<String>,
    /// One entry per distinct `VisitDisease` column value, not per label: a
    /// visit with "J45 - Asthma, I10" and one with "I10" give two entries.
    pub visit_diseases: Vec<String>,
    /// The stored past-diseases array, flattened to text.
    pub history_diseases: Vec<String>,
}

impl MedicalHistoryView {
    /// Main disease first, then visit diagnoses, then recorded history.
    pub fn all(&self) -> Vec<&str> {
        self.main_disease
            .iter()
            .chain(&self.visit_diseases)
            .chain(&self.history_diseases)
            .map(String::as_str)
            .collect()
    }
}

/// Removes `[`, `]` and `"` and trims, turning a stored JSON array into
/// readable text.
pub fn strip_legacy_quoting(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '[' | ']' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn cleaned(values: Vec<Option<String>>) -> Vec<String> {
    values
        .iter()
        .flatten()
        .map(|raw| strip_legacy_quoting(raw))
        .filter(|v| !v.is_empty())
        .collect()
}

pub fn build_medical_history(store: &Store, patient_id: i64) -> Result<MedicalHistoryView> {
    let main_disease = patients::get(store, patient_id)?
        .map(|p| strip_legacy_quoting(&p.main_disease))
        .filter(|d| !d.is_empty());

    let (visit_raw, history_raw) = store.read(|conn| {
        let mut stmt = conn.prepare("SELECT DISTINCT VisitDisease FROM appointments WHERE HastaID = ?1")?;
        let visit = stmt
            .query_map(params![patient_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<Option<String>>>>()?;
        let mut stmt = conn.prepare("SELECT Diseases FROM history WHERE HastaID = ?1")?;
        let history = stmt
            .query_map(params![patient_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<Option<String>>>>()?;
        Ok((visit, history))
    })?;

    Ok(MedicalHistoryView {
        main_disease,
        visit_diseases: cleaned(visit_raw),
        history_diseases: cleaned(history_raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::DiagnosisCode;
    use crate::storage::appointments::{self, fixtures::visit};
    use crate::storage::history;
    use crate::storage::patients::fixtures::new_patient;
    use crate::storage::test_support;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_brackets_and_quotes() {
        assert_eq!(strip_legacy_quoting(r#"["J45 - Asthma","I10"]"#), "J45 - Asthma,I10");
        assert_eq!(strip_legacy_quoting("[]"), "");
    }

    #[test]
    fn combines_three_sources() {
        let store = test_support::store();
        let mut draft = new_patient(1, "Maria", "Georgiou");
        draft.main_disease = "Diabetes".into();
        let patient_id = patients::insert(&store, &draft).unwrap();

        let first = appointments::insert(&store, &visit(patient_id, "2024-01-10", "09:00")).unwrap();
        let second = appointments::insert(&store, &visit(patient_id, "2024-02-10", "09:00")).unwrap();
        appointments::toggle_disease(&store, first, "J45 - Asthma").unwrap();
        appointments::toggle_disease(&store, second, "J45 - Asthma").unwrap();

        let mut record = history::load_or_create(&store, patient_id).unwrap();
        record.add_disease(&DiagnosisCode { code: "I10".into(), description: "Essential (primary) hypertension".into() });
        history::save(&store, &record).unwrap();

        let view = build_medical_history(&store, patient_id).unwrap();
        assert_eq!(view.main_disease.as_deref(), Some("Diabetes"));
        assert_eq!(view.visit_diseases, vec!["J45 - Asthma"]);

        let third = appointments::insert(&store, &visit(patient_id, "2024-03-10", "09:00")).unwrap();
        appointments::set_diseases(&store, third, &["J45 - Asthma".to_string(), "E11".to_string()]).unwrap();
        let view = build_medical_history(&store, patient_id).unwrap();
        let mut visit_diseases = view.visit_diseases.clone();
        visit_diseases.sort();
        assert_eq!(visit_diseases, vec!["J45 - Asthma", "J45 - Asthma, E11"]);
        assert_eq!(view.history_diseases, vec!["I10 - Essential (primary) hypertension"]);
        assert_eq!(view.all().len(), 4);
    }

    #[test]
    fn unknown_patient_is_empty() {
        let store = test_support::store();
        assert_eq!(build_medical_history(&store, 77).unwrap(), MedicalHistoryView::default());
    }
}
