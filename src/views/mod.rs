//! Read-only projections built from stored records.
//!
//! Builders take rows already loaded from the store (or load them through the
//! access layer) and never write.

pub mod filters;
pub mod history;
pub mod home;
pub mod medications;

pub use filters::{appointments_on, visit_dates, AppointmentFilter, PatientSearch};
pub use history::{build_medical_history, strip_legacy_quoting, MedicalHistoryView};
pub use home::{build_dashboard, split_upcoming_recent, HomeDashboard};
pub use medications::{patient_medications, unique_medications};
