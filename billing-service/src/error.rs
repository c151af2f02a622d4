use chrono::{DateTime, NaiveDate, Utc};
use database_layer::DatabaseError;
use error_common::{codes, Classify, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Doctor is not available at the given time. Try other times.")]
    DoctorUnavailable { doctor_id: Uuid, at: DateTime<Utc> },

    #[error("Doctor has reached the maximum number of appointments for the given date. Try other dates.")]
    CapacityExceeded { doctor_id: Uuid, date: NaiveDate, limit: u32 },

    #[error("Insufficient stock for {medicine}: {available} available, {requested} requested")]
    InsufficientStock { medicine: String, available: u32, requested: u32 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl BillingError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Classify for BillingError {
    fn kind(&self) -> ErrorKind {
        match self {
            BillingError::InvalidInput(_) | BillingError::InvalidTransition(_) => ErrorKind::InvalidInput,
            BillingError::DoctorUnavailable { .. } => ErrorKind::DoctorUnavailable,
            BillingError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            BillingError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            BillingError::NotFound { .. } => ErrorKind::NotFound,
            BillingError::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BillingError::InvalidTransition(_) => codes::validation::INVALID_TRANSITION,
            other => other.kind().code(),
        }
    }
}

impl From<DatabaseError> for BillingError {
    fn from(err: DatabaseError) -> Self {
        BillingError::Persistence(err.to_string())
    }
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        BillingError::Persistence(err.to_string())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_errors_keep_their_own_code() {
        let err = BillingError::InvalidTransition("completed -> scheduled".to_string());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.code(), codes::validation::INVALID_TRANSITION);
    }

    #[test]
    fn test_stock_message_names_medicine() {
        let err = BillingError::InsufficientStock {
            medicine: "Amoxicillin".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(err.to_string(), "Insufficient stock for Amoxicillin: 3 available, 5 requested");
        assert_eq!(err.kind().http_status(), 409);
    }

    #[test]
    fn test_database_errors_become_persistence_failures() {
        let err: BillingError = DatabaseError::QueryFailed("connection reset".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert!(!err.kind().is_client_error());
    }
}
