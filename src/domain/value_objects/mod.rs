pub mod evidence;

pub use evidence::{
    EvidenceId, EvidenceStage, GeoLocation, MutationId, PhotoPayload, PhotoRef, TaskId,
};
