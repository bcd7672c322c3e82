use crate::config::ConfigError;
use crate::reference::ReferenceError;
use crate::storage::StorageError;

/// Crate-level error.
///
/// Update and delete on a missing id are not errors; `NotFound` is only
/// raised by operations that have to read a row before writing it.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

impl From<rusqlite::Error> for ClinicError {
    fn from(error: rusqlite::Error) -> Self {
        ClinicError::Storage(StorageError::from(error))
    }
}

pub type Result<T> = std::result::Result<T, ClinicError>;

/// Input rejected before any storage call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field missing: {0}")]
    MissingField(&'static str),
    #[error("no doctor is signed in")]
    NoActiveDoctor,
}

/// Draft types check their required fields with this before they are written.
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), ValidationError>;
}

/// Fails with `MissingField` when `value` is blank.
pub(crate) fn require(field: &'static str, value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}
