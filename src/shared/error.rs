use crate::domain::value_objects::EvidenceStage;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    Storage(String),
    /// The durable queue cannot accept another mutation. Never retried.
    StorageFull(String),
    GpsUnavailable(String),
    Network(String),
    PermanentRejection(String),
    ValidationError(String),
    IncompleteEvidence(Vec<EvidenceStage>),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
    Internal(String),
}

impl AppError {
    /// Errors the technician has to see right away (capture aborted).
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            AppError::StorageFull(_)
                | AppError::GpsUnavailable(_)
                | AppError::ValidationError(_)
                | AppError::IncompleteEvidence(_)
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::StorageFull(msg) => write!(f, "Storage full: {}", msg),
            AppError::GpsUnavailable(msg) => write!(f, "GPS unavailable: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::PermanentRejection(msg) => write!(f, "Rejected by server: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::IncompleteEvidence(missing) => {
                let stages: Vec<&str> = missing.iter().map(|stage| stage.as_str()).collect();
                write!(f, "Missing evidence for stages: {}", stages.join(", "))
            }
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// SQLITE_FULL primary result code.
const SQLITE_FULL: &str = "13";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.code().as_deref() == Some(SQLITE_FULL)
        {
            return AppError::StorageFull(db_err.message().to_string());
        }
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_evidence_lists_missing_stages() {
        let err = AppError::IncompleteEvidence(vec![EvidenceStage::After]);
        assert_eq!(err.to_string(), "Missing evidence for stages: after");
        assert!(err.is_user_visible());
    }

    #[test]
    fn network_errors_stay_in_the_background() {
        assert!(!AppError::Network("timed out".into()).is_user_visible());
        assert!(AppError::StorageFull("disk".into()).is_user_visible());
    }
}
