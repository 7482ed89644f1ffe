use crate::application::ports::{
    EvidenceGateway, LocationProvider, MutationQueue, PhotoSource, TaskUpdateSink,
};
use crate::application::services::{CaptureOutcome, CapturePipeline, EvidenceReconciler};
use crate::domain::entities::{EvidenceRecord, TaskEvidenceSnapshot};
use crate::domain::value_objects::{EvidenceStage, TaskId};
use crate::infrastructure::connectivity::ConnectivityMonitor;
use crate::infrastructure::evidence::HttpEvidenceGateway;
use crate::infrastructure::offline::{
    DrainMetricsSnapshot, DrainReport, DrainTrigger, SqliteMutationQueue, SyncEngine,
    SyncEngineHandle,
};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Device integrations supplied by the host application.
#[derive(Clone)]
pub struct PlatformPorts {
    pub photos: Arc<dyn PhotoSource>,
    pub location: Arc<dyn LocationProvider>,
    pub task_updates: Option<Arc<dyn TaskUpdateSink>>,
}

/// Everything the host needs to capture and sync evidence, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub queue: Arc<SqliteMutationQueue>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub reconciler: Arc<EvidenceReconciler>,
    pub capture: CapturePipeline,
    pub sync_engine: Arc<SyncEngine>,
    engine_handle: Arc<Mutex<Option<SyncEngineHandle>>>,
}

impl AppState {
    /// Opens the durable queue, restores pending evidence into the reconciler
    /// and, with `auto_sync`, starts the background sync loop.
    pub async fn initialize(
        config: AppConfig,
        gateway: Arc<dyn EvidenceGateway>,
        platform: PlatformPorts,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;

        let queue = Arc::new(SqliteMutationQueue::open(&config.database).await?);
        let connectivity = Arc::new(ConnectivityMonitor::from_config(&config.connectivity));
        let reconciler = Arc::new(EvidenceReconciler::new(platform.task_updates.clone()));

        let pending = queue.list_all().await?;
        let restored_tasks = reconciler.restore_pending(&pending).await;
        tracing::info!(
            target: "fieldsync::queue",
            pending = pending.len(),
            tasks = restored_tasks,
            "restored queued evidence"
        );

        let capture = CapturePipeline::new(
            platform.photos,
            platform.location,
            gateway.clone(),
            queue.clone(),
            connectivity.clone(),
            reconciler.clone(),
        )
        .with_timeouts(config.capture.gps_timeout(), config.sync.upload_timeout());

        let sync_engine = Arc::new(
            SyncEngine::new(queue.clone(), gateway, connectivity.clone(), reconciler.clone())
                .with_upload_timeout(config.sync.upload_timeout())
                .with_rejection_policy(config.sync.rejection_policy),
        );

        let engine_handle = if config.sync.auto_sync {
            Some(sync_engine.spawn(connectivity.subscribe(), config.sync.interval()))
        } else {
            tracing::info!(target: "fieldsync::sync", "auto sync disabled");
            None
        };

        Ok(Self {
            config: Arc::new(config),
            queue,
            connectivity,
            reconciler,
            capture,
            sync_engine,
            engine_handle: Arc::new(Mutex::new(engine_handle)),
        })
    }

    /// [`AppState::initialize`] with the HTTP evidence service from `config`.
    pub async fn with_http_gateway(
        config: AppConfig,
        platform: PlatformPorts,
    ) -> Result<Self, AppError> {
        let gateway = HttpEvidenceGateway::new(&config.evidence_service, config.sync.upload_timeout())?;
        Self::initialize(config, Arc::new(gateway), platform).await
    }

    pub async fn capture(
        &self,
        task_id: TaskId,
        stage: EvidenceStage,
    ) -> Result<CaptureOutcome, AppError> {
        self.capture.capture(task_id, stage).await
    }

    /// Platform connectivity signal.
    pub fn report_connectivity(&self, online: bool) {
        self.connectivity.report(online);
    }

    /// "Sync now" from the UI.
    pub async fn request_sync(&self) -> Result<Option<DrainReport>, AppError> {
        self.sync_engine.request_drain(DrainTrigger::Manual).await
    }

    pub async fn open_task(
        &self,
        task_id: &TaskId,
        server_records: Vec<EvidenceRecord>,
    ) -> Option<TaskEvidenceSnapshot> {
        self.reconciler.seed_confirmed(task_id, server_records).await;
        self.reconciler.snapshot(task_id).await
    }

    pub async fn complete_task(&self, task_id: &TaskId) -> Result<(), AppError> {
        self.reconciler.ensure_completable(task_id).await
    }

    pub fn sync_metrics(&self) -> DrainMetricsSnapshot {
        self.sync_engine.metrics()
    }

    /// Stops the sync loop and closes the queue. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.engine_handle.lock().await.take() {
            handle.shutdown().await;
        }
        self.queue.close().await;
        tracing::info!(target: "fieldsync::sync", "fieldsync shut down");
    }
}
