use crate::domain::entities::{QueuedMutation, QueuedMutationDraft};
use crate::domain::value_objects::MutationId;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable holding area for evidence uploads that could not be sent right away.
///
/// Each operation is atomic on its own. The store is the only state shared
/// between the capture pipeline and the sync engine.
#[async_trait]
pub trait MutationQueue: Send + Sync {
    /// Persists `draft` and returns the id assigned to it. Once this returns the
    /// mutation survives a process restart. Fails with `AppError::StorageFull`
    /// when nothing more can be stored.
    async fn enqueue(&self, draft: &QueuedMutationDraft) -> Result<MutationId, AppError>;

    /// All queued mutations, oldest first.
    async fn list_all(&self) -> Result<Vec<QueuedMutation>, AppError>;

    /// Removes `id`. Removing an unknown id is a no-op.
    async fn remove(&self, id: MutationId) -> Result<(), AppError>;

    async fn pending_count(&self) -> Result<u64, AppError>;
}
