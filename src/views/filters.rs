//! List filters for the appointment, patient and calendar screens.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::storage::appointments::{Appointment, SortOrder};
use crate::storage::patients::Patient;
use crate::storage::Site;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub location: Option<Site>,
    pub order: SortOrder,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.date.map_or(true, |day| appointment.date() == Some(day))
            && self.location.map_or(true, |site| appointment.location == Some(site))
    }

    /// Keeps matching rows, sorted by date then time in the chosen order.
    pub fn apply<T>(&self, rows: &[T]) -> Vec<T>
    where
        T: AsRef<Appointment> + Clone,
    {
        let mut kept: Vec<T> = rows.iter().filter(|r| self.matches((*r).as_ref())).cloned().collect();
        kept.sort_by(|a, b| {
            let (a, b) = (a.as_ref(), b.as_ref());
            let ordering = (a.date(), a.hour.as_str()).cmp(&(b.date(), b.hour.as_str()));
            match self.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        kept
    }
}

/// Free-text patient search with optional sex and intake-source filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientSearch {
    /// Matched case-insensitively against "first last", or as a substring of
    /// the AMKA number.
    pub text: String,
    pub sex: Option<String>,
    pub source: Option<Site>,
}

impl PatientSearch {
    pub fn matches(&self, patient: &Patient) -> bool {
        let text = self.text.trim();
        let text_ok = text.is_empty()
            || format!("{} {}", patient.first_name, patient.last_name)
                .to_lowercase()
                .contains(&text.to_lowercase())
            || patient.amka.contains(text);
        let sex_ok = self.sex.as_deref().map_or(true, |sex| patient.sex == sex);
        let source_ok = self.source.map_or(true, |source| patient.source == Some(source));
        text_ok && sex_ok && source_ok
    }

    pub fn apply<'a>(&self, patients: &'a [Patient]) -> Vec<&'a Patient> {
        patients.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Appointments on `day`, in their original order.
pub fn appointments_on<T>(rows: &[T], day: NaiveDate) -> Vec<&T>
where
    T: AsRef<Appointment>,
{
    rows.iter().filter(|r| (*r).as_ref().date() == Some(day)).collect()
}

/// Days that have at least one appointment, for calendar marking.
pub fn visit_dates<T>(rows: &[T]) -> BTreeSet<NaiveDate>
where
    T: AsRef<Appointment>,
{
    rows.iter().filter_map(|r| r.as_ref().date()).collect()
}
