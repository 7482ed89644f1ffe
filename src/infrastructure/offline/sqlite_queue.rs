use super::mappers::{mutation_from_row, timestamp_from_millis};
use super::rows::{PendingSummaryRow, QueuedMutationRow};
use crate::application::ports::MutationQueue;
use crate::domain::entities::{QUEUE_SCHEMA_VERSION, QueuedMutation, QueuedMutationDraft};
use crate::domain::value_objects::{EvidenceStage, MutationId, TaskId};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::config::DatabaseConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

/// Per task and stage view of what is still waiting for the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSummary {
    pub task_id: TaskId,
    pub stage: EvidenceStage,
    pub pending: u64,
    pub oldest_enqueued_at: DateTime<Utc>,
}

/// `MutationQueue` backed by the `evidence_queue` table.
pub struct SqliteMutationQueue {
    pool: SqlitePool,
    max_pending: Option<u64>,
}

impl SqliteMutationQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_pending: None,
        }
    }

    pub fn with_capacity(mut self, max_pending: Option<u64>) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Connects, applies migrations and honours the configured capacity.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, AppError> {
        let connection = ConnectionPool::open(config).await?;
        connection.migrate().await?;
        Ok(Self::new(connection.get_pool().clone()).with_capacity(config.max_pending))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn pending_summary(&self) -> Result<Vec<PendingSummary>, AppError> {
        let rows = sqlx::query_as::<_, PendingSummaryRow>(
            r#"
            SELECT task_id, stage, COUNT(*) AS pending, MIN(enqueued_at) AS oldest_enqueued_at
            FROM evidence_queue
            GROUP BY task_id, stage
            ORDER BY MIN(id) ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PendingSummary {
                    task_id: TaskId::new(row.task_id).map_err(AppError::DeserializationError)?,
                    stage: row.stage.parse().map_err(AppError::DeserializationError)?,
                    pending: u64::try_from(row.pending).unwrap_or(0),
                    oldest_enqueued_at: timestamp_from_millis(row.oldest_enqueued_at)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl MutationQueue for SqliteMutationQueue {
    async fn enqueue(&self, draft: &QueuedMutationDraft) -> Result<MutationId, AppError> {
        let capacity = self
            .max_pending
            .map(|value| i64::try_from(value).unwrap_or(i64::MAX))
            .unwrap_or(i64::MAX);

        // Capacity check and insert are one statement, so concurrent enqueues cannot overshoot.
        let result = sqlx::query(
            r#"
            INSERT INTO evidence_queue
                (schema_version, client_ref, task_id, stage, payload, checksum,
                 latitude, longitude, enqueued_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE (SELECT COUNT(*) FROM evidence_queue) < ?
            "#,
        )
        .bind(QUEUE_SCHEMA_VERSION)
        .bind(draft.client_ref.to_string())
        .bind(draft.task_id.as_str())
        .bind(draft.stage.as_str())
        .bind(draft.payload.as_bytes())
        .bind(draft.payload.checksum())
        .bind(draft.location.lat)
        .bind(draft.location.lng)
        .bind(draft.enqueued_at.timestamp_millis())
        .bind(capacity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::error!(
                target: "fieldsync::queue",
                task_id = %draft.task_id,
                stage = %draft.stage,
                capacity,
                "evidence queue is full"
            );
            return Err(AppError::StorageFull(format!(
                "evidence queue holds the maximum of {capacity} pending uploads"
            )));
        }

        let id = MutationId::new(result.last_insert_rowid()).map_err(AppError::Database)?;
        tracing::debug!(
            target: "fieldsync::queue",
            mutation_id = %id,
            task_id = %draft.task_id,
            stage = %draft.stage,
            bytes = draft.payload.len(),
            "mutation enqueued"
        );
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<QueuedMutation>, AppError> {
        let rows = sqlx::query_as::<_, QueuedMutationRow>(
            r#"
            SELECT id, schema_version, client_ref, task_id, stage, payload, checksum,
                   latitude, longitude, enqueued_at
            FROM evidence_queue
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut mutations = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match mutation_from_row(row) {
                Ok(mutation) => mutations.push(mutation),
                // Unreadable rows stay in place for inspection.
                Err(err) => tracing::warn!(
                    target: "fieldsync::queue",
                    row_id = id,
                    error = %err,
                    "skipping unreadable queued mutation"
                ),
            }
        }
        Ok(mutations)
    }

    async fn remove(&self, id: MutationId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM evidence_queue WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(target: "fieldsync::queue", mutation_id = %id, "mutation already removed");
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM evidence_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
