use crate::domain::value_objects::GeoLocation;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Platform GPS.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<GeoLocation, AppError>;
}
