pub mod connectivity;
pub mod evidence_gateway;
pub mod location_provider;
pub mod mutation_queue;
pub mod photo_source;
pub mod task_updates;

pub use connectivity::ConnectivityStatus;
pub use evidence_gateway::{EvidenceGateway, UploadError};
pub use location_provider::LocationProvider;
pub use mutation_queue::MutationQueue;
pub use photo_source::PhotoSource;
pub use task_updates::TaskUpdateSink;
