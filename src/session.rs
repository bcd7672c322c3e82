//! The signed-in doctor.
//!
//! The doctor id is persisted in the key-value table under `DoctorID` so a
//! restart resumes the session. Consumers receive a `Session` explicitly
//! instead of reading the key themselves.

use tracing::{info, warn};

use crate::error::{Result, ValidationError};
use crate::storage::{doctors, kv, Store};

pub const DOCTOR_KEY: &str = "DoctorID";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    doctor_id: Option<i64>,
}

impl Session {
    /// Restores the persisted session. An unparseable id counts as signed out.
    pub fn load(store: &Store) -> Result<Self> {
        let doctor_id = match kv::get(store, DOCTOR_KEY)? {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(value = %raw, "ignoring malformed stored doctor id");
                    None
                }
            },
            None => None,
        };
        Ok(Session { doctor_id })
    }

    pub fn doctor_id(&self) -> Option<i64> {
        self.doctor_id
    }

    pub fn require_doctor(&self) -> std::result::Result<i64, ValidationError> {
        self.doctor_id.ok_or(ValidationError::NoActiveDoctor)
    }

    pub fn login(&mut self, store: &Store, doctor_id: i64) -> Result<()> {
        kv::set(store, DOCTOR_KEY, &doctor_id.to_string())?;
        self.doctor_id = Some(doctor_id);
        info!(doctor_id, "doctor signed in");
        Ok(())
    }

    /// Signs in the doctor whose credentials match. Returns whether they did.
    pub fn sign_in(&mut self, store: &Store, email: &str, password: &str) -> Result<bool> {
        match doctors::authenticate(store, email, password)? {
            Some(doctor) => {
                self.login(store, doctor.id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear(&mut self, store: &Store) -> Result<()> {
        kv::remove(store, DOCTOR_KEY)?;
        self.doctor_id = None;
        info!("session cleared");
        Ok(())
    }
}
