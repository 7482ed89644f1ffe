use crate::domain::value_objects::{EvidenceId, EvidenceStage, GeoLocation, PhotoRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QueuedMutation;

/// UI-facing view of one captured proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub id: EvidenceId,
    pub stage: EvidenceStage,
    pub photo_ref: PhotoRef,
    pub captured_at: DateTime<Utc>,
    pub location: GeoLocation,
    pub sync_pending: bool,
}

impl EvidenceRecord {
    /// Record for a server-confirmed upload.
    pub fn confirmed(
        id: EvidenceId,
        stage: EvidenceStage,
        photo_url: String,
        captured_at: DateTime<Utc>,
        location: GeoLocation,
    ) -> Self {
        Self {
            id,
            stage,
            photo_ref: PhotoRef::Remote(photo_url),
            captured_at,
            location,
            sync_pending: false,
        }
    }

    /// Temporary record shown while `mutation` waits in the queue.
    pub fn pending_from(mutation: &QueuedMutation) -> Self {
        Self {
            id: EvidenceId::local(mutation.id),
            stage: mutation.stage,
            photo_ref: PhotoRef::Queued(mutation.id),
            captured_at: mutation.enqueued_at,
            location: mutation.location,
            sync_pending: true,
        }
    }
}
