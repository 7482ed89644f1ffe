pub mod evidence_id;
pub mod geo_location;
pub mod mutation_id;
pub mod photo_payload;
pub mod photo_ref;
pub mod stage;
pub mod task_id;

pub use evidence_id::EvidenceId;
pub use geo_location::GeoLocation;
pub use mutation_id::MutationId;
pub use photo_payload::PhotoPayload;
pub use photo_ref::PhotoRef;
pub use stage::EvidenceStage;
pub use task_id::TaskId;
