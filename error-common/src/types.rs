use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codes;

/// Closed set of failure categories every CareLedger operation reports.
///
/// The request layer translates a kind into a user-facing response; nothing
/// in this taxonomy is retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed timestamp, out-of-range parameter, illegal state change
    InvalidInput,
    /// Referenced record does not exist or is not visible to the caller
    NotFound,
    /// Doctor is off-shift or not working on the requested weekday
    DoctorUnavailable,
    /// Doctor's daily appointment limit is reached
    CapacityExceeded,
    /// Requested medicine quantity exceeds stock
    InsufficientStock,
    /// Storage failure; the whole unit of work was rolled back
    PersistenceFailure,
}

impl ErrorKind {
    /// Stable error code for API payloads
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => codes::validation::INVALID_INPUT,
            ErrorKind::NotFound => codes::lookup::NOT_FOUND,
            ErrorKind::DoctorUnavailable => codes::scheduling::DOCTOR_UNAVAILABLE,
            ErrorKind::CapacityExceeded => codes::scheduling::CAPACITY_EXCEEDED,
            ErrorKind::InsufficientStock => codes::inventory::INSUFFICIENT_STOCK,
            ErrorKind::PersistenceFailure => codes::database::PERSISTENCE_FAILURE,
        }
    }

    /// HTTP status the request layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::InvalidInput
            | ErrorKind::DoctorUnavailable
            | ErrorKind::CapacityExceeded => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::InsufficientStock => 409,
            ErrorKind::PersistenceFailure => 500,
        }
    }

    /// Whether the caller (not the server) is at fault
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ErrorKind::PersistenceFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::DoctorUnavailable => "doctor_unavailable",
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::PersistenceFailure => "persistence_failure",
        };
        f.write_str(name)
    }
}

/// Implemented by every crate-level error so the request layer can classify
/// failures without matching on crate-specific variants.
pub trait Classify {
    fn kind(&self) -> ErrorKind;

    fn code(&self) -> &'static str {
        self.kind().code()
    }
}

/// Serializable error body handed to the request layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

impl ErrorReport {
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Classify + fmt::Display,
    {
        let kind = error.kind();
        Self {
            kind,
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}
