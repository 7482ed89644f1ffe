mod common;

use common::{FixedLocation, FixedPhoto, RecordingSink, ScriptedGateway, app_config, task};
use fieldsync_lib::application::ports::{MutationQueue, TaskUpdateSink, UploadError};
use fieldsync_lib::domain::entities::SlotState;
use fieldsync_lib::domain::value_objects::EvidenceStage;
use fieldsync_lib::{AppError, AppState, CaptureOutcome, PlatformPorts};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn platform(sink: Option<Arc<RecordingSink>>) -> PlatformPorts {
    PlatformPorts {
        photos: Arc::new(FixedPhoto(b"\xff\xd8\xff\xe0jpeg")),
        location: Arc::new(FixedLocation::depot()),
        task_updates: sink.map(|sink| sink as Arc<dyn TaskUpdateSink>),
    }
}

#[tokio::test]
async fn offline_capture_is_drained_when_back_online() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(ScriptedGateway::accepting());
    let sink = Arc::new(RecordingSink::default());
    let state = AppState::initialize(app_config(&dir), gateway.clone(), platform(Some(sink.clone())))
        .await
        .unwrap();
    let t = task("visit-1");

    let outcome = state.capture(t.clone(), EvidenceStage::Before).await.unwrap();
    assert!(matches!(outcome, CaptureOutcome::Queued { .. }));
    assert!(gateway.uploads().is_empty());
    assert_eq!(state.queue.pending_count().await.unwrap(), 1);

    state.report_connectivity(true);
    let report = state.request_sync().await.unwrap().unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.remaining, 0);

    assert_eq!(
        state.reconciler.slot_state(&t, EvidenceStage::Before).await,
        SlotState::Confirmed
    );
    let updates = sink.updates();
    assert_eq!(updates.len(), 2);
    assert!(updates[0].records[0].sync_pending);
    assert_eq!(updates[1].records[0].id.as_str(), "srv-1");

    state.shutdown().await;
}

#[tokio::test]
async fn recapture_ignores_stale_confirmation() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(ScriptedGateway::accepting());
    let state = AppState::initialize(app_config(&dir), gateway.clone(), platform(None))
        .await
        .unwrap();
    let t = task("visit-2");

    let first = state.capture(t.clone(), EvidenceStage::During).await.unwrap();
    let second = state.capture(t.clone(), EvidenceStage::During).await.unwrap();
    let (CaptureOutcome::Queued { mutation_id: m1, .. }, CaptureOutcome::Queued { mutation_id: m2, .. }) =
        (first, second)
    else {
        panic!("both captures should be queued while offline");
    };
    assert!(m1 < m2);

    state.report_connectivity(true);
    let report = state.request_sync().await.unwrap().unwrap();

    // Both uploads reach the server, the slot keeps the newer one.
    assert_eq!(report.uploaded, 2);
    assert_eq!(gateway.uploads().len(), 2);
    let snapshot = state.reconciler.snapshot(&t).await.unwrap();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].id.as_str(), "srv-2");
    assert!(!snapshot.records[0].sync_pending);

    state.shutdown().await;
}

#[tokio::test]
async fn completion_waits_for_after_photo() {
    let dir = TempDir::new().unwrap();
    let state = AppState::initialize(
        app_config(&dir),
        Arc::new(ScriptedGateway::accepting()),
        platform(None),
    )
    .await
    .unwrap();
    let t = task("visit-3");

    state.capture(t.clone(), EvidenceStage::Before).await.unwrap();
    state.capture(t.clone(), EvidenceStage::During).await.unwrap();
    let err = state.complete_task(&t).await.unwrap_err();
    assert!(matches!(err, AppError::IncompleteEvidence(ref missing) if missing == &vec![EvidenceStage::After]));

    // Pending evidence counts toward completion.
    state.capture(t.clone(), EvidenceStage::After).await.unwrap();
    assert!(state.complete_task(&t).await.is_ok());

    state.shutdown().await;
}

#[tokio::test]
async fn queued_evidence_survives_restart() {
    let dir = TempDir::new().unwrap();
    let t = task("visit-4");

    let state = AppState::initialize(
        app_config(&dir),
        Arc::new(ScriptedGateway::accepting()),
        platform(None),
    )
    .await
    .unwrap();
    let mut queued_ids = Vec::new();
    for stage in [EvidenceStage::Before, EvidenceStage::After] {
        match state.capture(t.clone(), stage).await.unwrap() {
            CaptureOutcome::Queued { mutation_id, .. } => queued_ids.push(mutation_id),
            other => panic!("expected a queued capture, got {other:?}"),
        }
    }
    state.shutdown().await;
    drop(state);

    let gateway = Arc::new(ScriptedGateway::accepting());
    let restarted = AppState::initialize(app_config(&dir), gateway.clone(), platform(None))
        .await
        .unwrap();
    let restored: Vec<_> = restarted
        .queue
        .list_all()
        .await
        .unwrap()
        .iter()
        .map(|mutation| mutation.id)
        .collect();
    assert_eq!(restored, queued_ids);
    let snapshot = restarted.reconciler.snapshot(&t).await.unwrap();
    assert_eq!(snapshot.records[0].id.as_str(), format!("local-{}", queued_ids[0]));
    assert_eq!(
        restarted.reconciler.slot_state(&t, EvidenceStage::After).await,
        SlotState::LocalPending
    );

    restarted.report_connectivity(true);
    restarted.request_sync().await.unwrap();
    let stages: Vec<_> = gateway.uploads().iter().map(|u| u.stage).collect();
    assert_eq!(stages, vec![EvidenceStage::Before, EvidenceStage::After]);
    assert_eq!(restarted.queue.pending_count().await.unwrap(), 0);

    restarted.shutdown().await;
}

#[tokio::test]
async fn middle_failure_is_retried_on_next_pass() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(ScriptedGateway::accepting());
    let state = AppState::initialize(app_config(&dir), gateway.clone(), platform(None))
        .await
        .unwrap();
    let t = task("visit-5");
    for stage in EvidenceStage::ALL {
        state.capture(t.clone(), stage).await.unwrap();
    }

    gateway.fail_stage(EvidenceStage::During, UploadError::Transient("502".into()));
    state.report_connectivity(true);
    let report = state.request_sync().await.unwrap().unwrap();
    assert_eq!(report.uploaded, 2);
    assert_eq!(report.transient_failures, 1);
    assert_eq!(
        state.reconciler.slot_state(&t, EvidenceStage::During).await,
        SlotState::LocalPending
    );

    gateway.heal_stage(EvidenceStage::During);
    let report = state.request_sync().await.unwrap().unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.uploaded, 1);
    assert_eq!(
        state.reconciler.slot_state(&t, EvidenceStage::During).await,
        SlotState::Confirmed
    );

    state.shutdown().await;
}

#[tokio::test]
async fn full_queue_rejects_capture() {
    let dir = TempDir::new().unwrap();
    let mut config = app_config(&dir);
    config.database.max_pending = Some(1);
    let state = AppState::initialize(config, Arc::new(ScriptedGateway::accepting()), platform(None))
        .await
        .unwrap();
    let t = task("visit-6");

    state.capture(t.clone(), EvidenceStage::Before).await.unwrap();
    let err = state.capture(t.clone(), EvidenceStage::During).await.unwrap_err();
    assert!(matches!(err, AppError::StorageFull(_)));
    assert_eq!(
        state.reconciler.slot_state(&t, EvidenceStage::During).await,
        SlotState::Empty
    );

    state.shutdown().await;
}

#[tokio::test]
async fn background_loop_drains_on_reconnect() {
    let dir = TempDir::new().unwrap();
    let mut config = app_config(&dir);
    config.sync.auto_sync = true;
    config.sync.sync_interval = 3600;
    let gateway = Arc::new(ScriptedGateway::accepting());
    let state = AppState::initialize(config, gateway.clone(), platform(None))
        .await
        .unwrap();

    state.capture(task("visit-7"), EvidenceStage::Before).await.unwrap();
    state.report_connectivity(true);

    tokio::time::timeout(Duration::from_secs(5), async {
        while state.queue.pending_count().await.unwrap() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue drained after reconnect");
    assert_eq!(gateway.uploads().len(), 1);

    state.shutdown().await;
}
