use crate::domain::value_objects::{EvidenceStage, GeoLocation, MutationId, PhotoPayload, TaskId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Payload-shape version written with every queued row.
pub const QUEUE_SCHEMA_VERSION: i64 = 1;

/// A captured photo on its way to the durable queue; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMutationDraft {
    pub client_ref: Uuid,
    pub task_id: TaskId,
    pub stage: EvidenceStage,
    pub payload: PhotoPayload,
    pub location: GeoLocation,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedMutationDraft {
    pub fn new(
        task_id: TaskId,
        stage: EvidenceStage,
        payload: PhotoPayload,
        location: GeoLocation,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client_ref: Uuid::new_v4(),
            task_id,
            stage,
            payload,
            location,
            enqueued_at,
        }
    }

    pub fn with_client_ref(mut self, client_ref: Uuid) -> Self {
        self.client_ref = client_ref;
        self
    }

    pub fn into_mutation(self, id: MutationId) -> QueuedMutation {
        QueuedMutation {
            id,
            client_ref: self.client_ref,
            task_id: self.task_id,
            stage: self.stage,
            payload: self.payload,
            location: self.location,
            enqueued_at: self.enqueued_at,
        }
    }
}

/// A pending evidence upload held by the durable queue. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMutation {
    pub id: MutationId,
    pub client_ref: Uuid,
    pub task_id: TaskId,
    pub stage: EvidenceStage,
    pub payload: PhotoPayload,
    pub location: GeoLocation,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedMutation {
    pub fn to_upload(&self) -> EvidenceUpload {
        EvidenceUpload {
            client_ref: self.client_ref,
            task_id: self.task_id.clone(),
            stage: self.stage,
            photo: self.payload.clone(),
            location: self.location,
            captured_at: self.enqueued_at,
        }
    }
}

/// One upload attempt against the evidence service.
///
/// `client_ref` stays the same across retries so the server can treat a
/// repeated delivery as the same capture.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceUpload {
    pub client_ref: Uuid,
    pub task_id: TaskId,
    pub stage: EvidenceStage,
    pub photo: PhotoPayload,
    pub location: GeoLocation,
    pub captured_at: DateTime<Utc>,
}

impl From<&QueuedMutationDraft> for EvidenceUpload {
    fn from(draft: &QueuedMutationDraft) -> Self {
        Self {
            client_ref: draft.client_ref,
            task_id: draft.task_id.clone(),
            stage: draft.stage,
            photo: draft.payload.clone(),
            location: draft.location,
            captured_at: draft.enqueued_at,
        }
    }
}
