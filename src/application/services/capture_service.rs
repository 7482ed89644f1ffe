use crate::application::ports::{
    ConnectivityStatus, EvidenceGateway, LocationProvider, MutationQueue, PhotoSource, UploadError,
};
use crate::application::services::evidence_reconciler::EvidenceReconciler;
use crate::domain::entities::{EvidenceRecord, EvidenceUpload, QueuedMutationDraft};
use crate::domain::value_objects::{EvidenceStage, GeoLocation, MutationId, PhotoPayload, TaskId};
use crate::shared::error::AppError;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_GPS_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The user backed out of image selection. Nothing was recorded.
    Cancelled,
    /// Uploaded during capture; the slot is already confirmed.
    Uploaded(EvidenceRecord),
    /// Stored in the durable queue; the slot shows a pending record.
    Queued {
        mutation_id: MutationId,
        record: EvidenceRecord,
    },
}

impl CaptureOutcome {
    pub fn record(&self) -> Option<&EvidenceRecord> {
        match self {
            CaptureOutcome::Cancelled => None,
            CaptureOutcome::Uploaded(record) => Some(record),
            CaptureOutcome::Queued { record, .. } => Some(record),
        }
    }
}

/// Photo + GPS acquisition and routing to the evidence service or the queue.
#[derive(Clone)]
pub struct CapturePipeline {
    photos: Arc<dyn PhotoSource>,
    location: Arc<dyn LocationProvider>,
    gateway: Arc<dyn EvidenceGateway>,
    queue: Arc<dyn MutationQueue>,
    connectivity: Arc<dyn ConnectivityStatus>,
    reconciler: Arc<EvidenceReconciler>,
    gps_timeout: Duration,
    upload_timeout: Duration,
}

impl CapturePipeline {
    pub fn new(
        photos: Arc<dyn PhotoSource>,
        location: Arc<dyn LocationProvider>,
        gateway: Arc<dyn EvidenceGateway>,
        queue: Arc<dyn MutationQueue>,
        connectivity: Arc<dyn ConnectivityStatus>,
        reconciler: Arc<EvidenceReconciler>,
    ) -> Self {
        Self {
            photos,
            location,
            gateway,
            queue,
            connectivity,
            reconciler,
            gps_timeout: DEFAULT_GPS_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, gps_timeout: Duration, upload_timeout: Duration) -> Self {
        self.gps_timeout = gps_timeout;
        self.upload_timeout = upload_timeout;
        self
    }

    /// Asks the photo source for an image, then captures it.
    pub async fn capture(
        &self,
        task_id: TaskId,
        stage: EvidenceStage,
    ) -> Result<CaptureOutcome, AppError> {
        let Some(bytes) = self.photos.select_image().await? else {
            tracing::debug!(
                target: "fieldsync::capture",
                task_id = %task_id,
                stage = %stage,
                "image selection cancelled"
            );
            return Ok(CaptureOutcome::Cancelled);
        };
        self.capture_photo(task_id, stage, bytes).await
    }

    /// Captures an already-taken photo.
    ///
    /// From here on the capture cannot be cancelled: the work runs on its own
    /// task and completes even if the caller drops this future.
    pub async fn capture_photo(
        &self,
        task_id: TaskId,
        stage: EvidenceStage,
        photo: Bytes,
    ) -> Result<CaptureOutcome, AppError> {
        let payload = PhotoPayload::new(photo).map_err(AppError::ValidationError)?;
        let pipeline = self.clone();

        tokio::spawn(async move { pipeline.locate_and_route(task_id, stage, payload).await })
            .await
            .map_err(|err| AppError::Internal(format!("Capture task failed: {err}")))?
    }

    async fn locate_and_route(
        &self,
        task_id: TaskId,
        stage: EvidenceStage,
        payload: PhotoPayload,
    ) -> Result<CaptureOutcome, AppError> {
        let location = self.acquire_location().await?;
        let draft = QueuedMutationDraft::new(task_id, stage, payload, location, Utc::now());

        if self.connectivity.is_online() {
            match self.upload_direct(&draft).await {
                Ok(record) => {
                    self.reconciler
                        .record_confirmed(&draft.task_id, record.clone())
                        .await;
                    tracing::info!(
                        target: "fieldsync::capture",
                        task_id = %draft.task_id,
                        stage = %stage,
                        evidence_id = %record.id,
                        "evidence uploaded during capture"
                    );
                    return Ok(CaptureOutcome::Uploaded(record));
                }
                Err(err) => {
                    tracing::warn!(
                        target: "fieldsync::capture",
                        task_id = %draft.task_id,
                        stage = %stage,
                        error = %err,
                        "direct upload failed, queueing capture"
                    );
                }
            }
        }

        let task_id = draft.task_id.clone();
        let (mutation, record) = self
            .reconciler
            .queue_local(self.queue.as_ref(), draft)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    target: "fieldsync::capture",
                    task_id = %task_id,
                    stage = %stage,
                    error = %err,
                    "failed to queue capture"
                );
            })?;
        let mutation_id = mutation.id;

        tracing::info!(
            target: "fieldsync::capture",
            task_id = %mutation.task_id,
            stage = %stage,
            mutation_id = %mutation_id,
            "capture queued for sync"
        );
        Ok(CaptureOutcome::Queued {
            mutation_id,
            record,
        })
    }

    async fn acquire_location(&self) -> Result<GeoLocation, AppError> {
        match tokio::time::timeout(self.gps_timeout, self.location.current_position()).await {
            // Provider-built values are not range-checked.
            Ok(Ok(location)) => {
                GeoLocation::new(location.lat, location.lng).map_err(AppError::ValidationError)
            }
            Ok(Err(AppError::GpsUnavailable(msg))) => Err(AppError::GpsUnavailable(msg)),
            Ok(Err(err)) => Err(AppError::GpsUnavailable(err.to_string())),
            Err(_) => Err(AppError::GpsUnavailable(format!(
                "no fix within {}s",
                self.gps_timeout.as_secs()
            ))),
        }
    }

    async fn upload_direct(&self, draft: &QueuedMutationDraft) -> Result<EvidenceRecord, UploadError> {
        let upload = EvidenceUpload::from(draft);
        let mut record = tokio::time::timeout(self.upload_timeout, self.gateway.upload(&upload))
            .await
            .map_err(|_| {
                UploadError::Transient(format!(
                    "upload timed out after {}s",
                    self.upload_timeout.as_secs()
                ))
            })??;
        record.stage = draft.stage;
        Ok(record)
    }
}
