pub mod evidence_record;
pub mod queued_mutation;
pub mod task_evidence;

pub use evidence_record::EvidenceRecord;
pub use queued_mutation::{
    EvidenceUpload, QUEUE_SCHEMA_VERSION, QueuedMutation, QueuedMutationDraft,
};
pub use task_evidence::{ConfirmOutcome, SlotState, TaskEvidence, TaskEvidenceSnapshot};
