use crate::domain::entities::{EvidenceRecord, EvidenceUpload};
use crate::shared::error::AppError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    /// Network loss, timeouts, overloaded server. Worth retrying.
    #[error("Transient upload failure: {0}")]
    Transient(String),

    /// The server will never accept this upload (e.g. the task no longer exists).
    #[error("Upload rejected: {0}")]
    Permanent(String),
}

impl UploadError {
    pub fn is_transient(&self) -> bool {
        matches!(self, UploadError::Transient(_))
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Transient(msg) => AppError::Network(msg),
            UploadError::Permanent(msg) => AppError::PermanentRejection(msg),
        }
    }
}

/// Remote evidence service. Uploads carry a stable `client_ref` so that a
/// repeated delivery of the same capture is harmless on the server.
#[async_trait]
pub trait EvidenceGateway: Send + Sync {
    async fn upload(&self, upload: &EvidenceUpload) -> Result<EvidenceRecord, UploadError>;
}
