//! ClinicDB: an on-device records store for a single clinician
//!
//! ClinicDB keeps patients, visits, X-ray attachments, notes and free-text
//! medical history in one SQLite file, together with a bundled diagnosis-code
//! reference and the derived views the clinician's screens are built from.

pub mod care;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod reference;
pub mod session;
pub mod storage;
pub mod views;
pub mod watch;

pub use config::{load_config, Config};
pub use error::{ClinicError, Result, ValidationError};
pub use reference::{CodeTable, DiagnosisCode};
pub use session::Session;
pub use storage::{Change, ChangeKind, Site, Store, Table};
pub use watch::ViewRefresher;
