pub mod evidence;

pub use evidence::{
    ConfirmOutcome, EvidenceRecord, EvidenceUpload, QUEUE_SCHEMA_VERSION, QueuedMutation,
    QueuedMutationDraft, SlotState, TaskEvidence, TaskEvidenceSnapshot,
};
