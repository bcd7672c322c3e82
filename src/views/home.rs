//! Home screen: the signed-in doctor and the next and last few visits.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::session::Session;
use crate::storage::appointments::{self, Appointment, AppointmentWithPatient};
use crate::storage::{doctors, Store};

pub const UPCOMING_LIMIT: usize = 3;
pub const RECENT_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorHeader {
    pub id: i64,
    pub name: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeDashboard {
    pub doctor: Option<DoctorHeader>,
    pub today: NaiveDate,
    pub upcoming: Vec<AppointmentWithPatient>,
    pub recent: Vec<AppointmentWithPatient>,
}

fn sort_key(appointment: &Appointment) -> (Option<NaiveDate>, &str) {
    (appointment.date(), appointment.hour.as_str())
}

/// Splits visits around `today`.
///
/// Upcoming holds the first visits dated today or later, soonest first.
/// Recent holds the latest visits dated before today, newest first. Rows with
/// an unreadable date are in neither list.
pub fn split_upcoming_recent<T>(visits: &[T], today: NaiveDate) -> (Vec<T>, Vec<T>)
where
    T: AsRef<Appointment> + Clone,
{
    let mut upcoming: Vec<&T> = Vec::new();
    let mut recent: Vec<&T> = Vec::new();
    for visit in visits {
        match visit.as_ref().date() {
            Some(date) if date >= today => upcoming.push(visit),
            Some(_) => recent.push(visit),
            None => {}
        }
    }
    upcoming.sort_by(|a, b| sort_key(a.as_ref()).cmp(&sort_key(b.as_ref())));
    recent.sort_by(|a, b| sort_key(b.as_ref()).cmp(&sort_key(a.as_ref())));

    (
        upcoming.into_iter().take(UPCOMING_LIMIT).cloned().collect(),
        recent.into_iter().take(RECENT_LIMIT).cloned().collect(),
    )
}

/// Every appointment is considered, not only the signed-in doctor's.
pub fn build_dashboard(store: &Store, session: &Session, today: NaiveDate) -> Result<HomeDashboard> {
    let doctor = match session.doctor_id() {
        Some(id) => doctors::get(store, id)?.map(|d| DoctorHeader {
            id: d.id,
            name: d.full_name(),
            profile_image: d.profile_image,
        }),
        None => None,
    };
    let visits = appointments::list_with_patient_names(store)?;
    let (upcoming, recent) = split_upcoming_recent(&visits, today);
    debug!(total = visits.len(), upcoming = upcoming.len(), recent = recent.len(), "dashboard built");
    Ok(HomeDashboard { doctor, today, upcoming, recent })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::appointments::fixtures::visit;
    use crate::storage::doctors::DoctorProfile;
    use crate::storage::test_support;
    use pretty_assertions::assert_eq;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn dates<T: AsRef<Appointment>>(rows: &[T]) -> Vec<&str> {
        rows.iter().map(|r| r.as_ref().date.as_str()).collect()
    }

    #[test]
    fn splits_around_today() {
        let store = test_support::store();
        for date in ["2024-01-01", "2024-06-01", "2024-12-31"] {
            appointments::insert(&store, &visit(1, date, "10:00")).unwrap();
        }
        let all = appointments::list(&store, &Default::default()).unwrap();
        let (upcoming, recent) = split_upcoming_recent(&all, day("2024-06-15"));
        assert_eq!(dates(&upcoming), vec!["2024-12-31"]);
        assert_eq!(dates(&recent), vec!["2024-06-01", "2024-01-01"]);
    }

    #[test]
    fn recent_keeps_latest_past_visits() {
        let store = test_support::store();
        for date in ["2024-01-01", "2024-02-01", "2024-03-01", "2024-04-01", "2024-05-01"] {
            appointments::insert(&store, &visit(1, date, "10:00")).unwrap();
        }
        let all = appointments::list(&store, &Default::default()).unwrap();
        let (upcoming, recent) = split_upcoming_recent(&all, day("2024-06-15"));
        assert!(upcoming.is_empty());
        assert_eq!(dates(&recent), vec!["2024-05-01", "2024-04-01", "2024-03-01"]);
    }

    #[test]
    fn today_counts_as_upcoming_ordered_by_hour() {
        let store = test_support::store();
        appointments::insert(&store, &visit(1, "2024-06-15", "16:00")).unwrap();
        appointments::insert(&store, &visit(1, "2024-06-15", "08:30")).unwrap();
        let all = appointments::list(&store, &Default::default()).unwrap();
        let (upcoming, _) = split_upcoming_recent(&all, day("2024-06-15"));
        let hours: Vec<&str> = upcoming.iter().map(|a| a.hour.as_str()).collect();
        assert_eq!(hours, vec!["08:30", "16:00"]);
    }

    #[test]
    fn dashboard_carries_doctor_header() {
        let store = test_support::store();
        let doctor_id = doctors::register(
            &store,
            &DoctorProfile {
                first_name: "Eleni".into(),
                last_name: "Papadopoulou".into(),
                email: "eleni@example.org".into(),
                password: "pw".into(),
                profile_image: None,
            },
        )
        .unwrap();
        let mut session = Session::default();
        session.login(&store, doctor_id).unwrap();
        appointments::insert(&store, &visit(1, "2024-07-01", "09:00")).unwrap();

        let dashboard = build_dashboard(&store, &session, day("2024-06-15")).unwrap();
        assert_eq!(dashboard.doctor.as_ref().map(|d| d.name.as_str()), Some("Eleni Papadopoulou"));
        assert_eq!(dashboard.upcoming.len(), 1);
        assert!(dashboard.recent.is_empty());

        let signed_out = build_dashboard(&store, &Session::default(), day("2024-06-15")).unwrap();
        assert_eq!(signed_out.doctor, None);
    }
}
