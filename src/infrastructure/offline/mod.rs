mod mappers;
pub mod metrics;
mod rows;
pub mod sqlite_queue;
pub mod sync_engine;

pub use metrics::{DrainMetrics, DrainMetricsSnapshot, DrainOutcomeStatus};
pub use sqlite_queue::{PendingSummary, SqliteMutationQueue};
pub use sync_engine::{DrainReport, DrainTrigger, SyncEngine, SyncEngineHandle};
