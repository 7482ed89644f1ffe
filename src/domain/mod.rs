pub mod entities;
pub mod value_objects;

pub use entities::{EvidenceRecord, QueuedMutation, TaskEvidence, TaskEvidenceSnapshot};
pub use value_objects::{EvidenceId, EvidenceStage, GeoLocation, MutationId, TaskId};
