use super::rows::QueuedMutationRow;
use crate::domain::entities::{QUEUE_SCHEMA_VERSION, QueuedMutation};
use crate::domain::value_objects::{GeoLocation, MutationId, PhotoPayload, TaskId};
use crate::shared::error::AppError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn mutation_from_row(row: QueuedMutationRow) -> Result<QueuedMutation, AppError> {
    if row.schema_version > QUEUE_SCHEMA_VERSION {
        return Err(AppError::DeserializationError(format!(
            "unsupported queue schema version {}",
            row.schema_version
        )));
    }

    let payload = PhotoPayload::new(Bytes::from(row.payload))
        .map_err(AppError::DeserializationError)?;
    if payload.checksum() != row.checksum {
        return Err(AppError::DeserializationError(
            "payload checksum mismatch".to_string(),
        ));
    }

    Ok(QueuedMutation {
        id: MutationId::new(row.id).map_err(AppError::DeserializationError)?,
        client_ref: Uuid::parse_str(&row.client_ref)
            .map_err(|err| AppError::DeserializationError(err.to_string()))?,
        task_id: TaskId::new(row.task_id).map_err(AppError::DeserializationError)?,
        stage: row.stage.parse().map_err(AppError::DeserializationError)?,
        payload,
        location: GeoLocation::new(row.latitude, row.longitude)
            .map_err(AppError::DeserializationError)?,
        enqueued_at: timestamp_from_millis(row.enqueued_at)?,
    })
}

pub fn timestamp_from_millis(value: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(value)
        .ok_or_else(|| AppError::DeserializationError(format!("invalid timestamp: {value}")))
}
