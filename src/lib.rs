pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{CaptureOutcome, CapturePipeline, EvidenceReconciler};
pub use infrastructure::connectivity::ConnectivityMonitor;
pub use infrastructure::offline::{DrainReport, DrainTrigger, SqliteMutationQueue, SyncEngine};
pub use shared::{AppConfig, AppError, Result};
pub use state::{AppState, PlatformPorts};

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldsync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
