use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;

/// Camera or gallery picker. `Ok(None)` means the user cancelled the selection.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn select_image(&self) -> Result<Option<Bytes>, AppError>;
}
