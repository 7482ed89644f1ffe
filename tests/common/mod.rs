#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use fieldsync_lib::application::ports::{
    EvidenceGateway, LocationProvider, PhotoSource, TaskUpdateSink, UploadError,
};
use fieldsync_lib::domain::entities::{EvidenceRecord, EvidenceUpload, TaskEvidenceSnapshot};
use fieldsync_lib::domain::value_objects::{EvidenceId, EvidenceStage, GeoLocation, TaskId};
use fieldsync_lib::shared::config::{AppConfig, DatabaseConfig};
use fieldsync_lib::shared::error::AppError;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};

pub fn task(id: &str) -> TaskId {
    TaskId::new(id.into()).expect("task id")
}

pub fn database_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("queue.db").display()),
        max_connections: 2,
        connection_timeout: 5,
        max_pending: None,
    }
}

/// Offline-first test configuration: no background loop, starts offline.
pub fn app_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database = database_config(dir);
    config.sync.auto_sync = false;
    config.connectivity.assume_online_at_start = false;
    config.capture.gps_timeout = 2;
    config.sync.upload_timeout = 2;
    config
}

/// Evidence service double. Accepts everything unless a stage is scripted to
/// fail; optionally holds each upload until released.
pub struct ScriptedGateway {
    failures: Mutex<HashMap<EvidenceStage, UploadError>>,
    uploads: Mutex<Vec<EvidenceUpload>>,
    accepted: AtomicUsize,
    hold: Option<Semaphore>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub entered: Notify,
}

impl ScriptedGateway {
    pub fn accepting() -> Self {
        Self::build(None)
    }

    /// Every upload waits for a [`ScriptedGateway::release`] permit.
    pub fn holding() -> Self {
        Self::build(Some(Semaphore::new(0)))
    }

    fn build(hold: Option<Semaphore>) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
            accepted: AtomicUsize::new(0),
            hold,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            entered: Notify::new(),
        }
    }

    pub fn fail_stage(&self, stage: EvidenceStage, error: UploadError) {
        self.failures.lock().unwrap().insert(stage, error);
    }

    pub fn heal_stage(&self, stage: EvidenceStage) {
        self.failures.lock().unwrap().remove(&stage);
    }

    pub fn release(&self, permits: usize) {
        if let Some(hold) = &self.hold {
            hold.add_permits(permits);
        }
    }

    pub fn uploads(&self) -> Vec<EvidenceUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceGateway for ScriptedGateway {
    async fn upload(&self, upload: &EvidenceUpload) -> Result<EvidenceRecord, UploadError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.uploads.lock().unwrap().push(upload.clone());
        self.entered.notify_one();

        if let Some(hold) = &self.hold {
            hold.acquire().await.expect("semaphore open").forget();
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.failures.lock().unwrap().get(&upload.stage).cloned() {
            return Err(error);
        }

        let n = self.accepted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(EvidenceRecord::confirmed(
            EvidenceId::new(format!("srv-{n}")).expect("evidence id"),
            upload.stage,
            format!("https://cdn.example.com/srv-{n}.jpg"),
            upload.captured_at,
            upload.location,
        ))
    }
}

pub struct FixedLocation(pub GeoLocation);

impl FixedLocation {
    pub fn depot() -> Self {
        Self(GeoLocation::new(47.3769, 8.5417).expect("location"))
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<GeoLocation, AppError> {
        Ok(self.0)
    }
}

pub struct FixedPhoto(pub &'static [u8]);

#[async_trait]
impl PhotoSource for FixedPhoto {
    async fn select_image(&self) -> Result<Option<Bytes>, AppError> {
        Ok(Some(Bytes::from_static(self.0)))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<TaskEvidenceSnapshot>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<TaskEvidenceSnapshot> {
        self.updates.lock().unwrap().clone()
    }
}

impl TaskUpdateSink for RecordingSink {
    fn on_update_task(&self, update: &TaskEvidenceSnapshot) {
        self.updates.lock().unwrap().push(update.clone());
    }
}
