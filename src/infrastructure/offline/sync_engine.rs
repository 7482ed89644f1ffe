use super::metrics::{DrainMetrics, DrainMetricsSnapshot, DrainOutcomeStatus, DrainTally};
use crate::application::ports::{ConnectivityStatus, EvidenceGateway, MutationQueue, UploadError};
use crate::application::services::EvidenceReconciler;
use crate::domain::entities::{ConfirmOutcome, EvidenceRecord, QueuedMutation};
use crate::domain::value_objects::MutationId;
use crate::infrastructure::connectivity::OnlineTransitions;
use crate::shared::config::RejectionPolicy;
use crate::shared::error::AppError;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainTrigger {
    Startup,
    Interval,
    Connectivity,
    Manual,
    /// Pass owed to a trigger that arrived while another pass was running.
    FollowUp,
}

impl DrainTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainTrigger::Startup => "startup",
            DrainTrigger::Interval => "interval",
            DrainTrigger::Connectivity => "connectivity",
            DrainTrigger::Manual => "manual",
            DrainTrigger::FollowUp => "follow_up",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub trigger: DrainTrigger,
    pub skipped_offline: bool,
    pub attempted: usize,
    pub uploaded: usize,
    pub transient_failures: usize,
    pub rejected: usize,
    pub dropped: Vec<MutationId>,
    /// Uploaded but still queued because the store refused the removal.
    pub remove_failures: usize,
    pub remaining: u64,
    pub duration_ms: u64,
}

impl DrainReport {
    fn empty(trigger: DrainTrigger) -> Self {
        Self {
            trigger,
            skipped_offline: false,
            attempted: 0,
            uploaded: 0,
            transient_failures: 0,
            rejected: 0,
            dropped: Vec::new(),
            remove_failures: 0,
            remaining: 0,
            duration_ms: 0,
        }
    }

    fn status(&self) -> DrainOutcomeStatus {
        if self.skipped_offline {
            DrainOutcomeStatus::Skipped
        } else if self.transient_failures + self.rejected + self.dropped.len() + self.remove_failures
            == 0
        {
            DrainOutcomeStatus::Success
        } else {
            DrainOutcomeStatus::Failure
        }
    }

    fn tally(&self) -> DrainTally {
        DrainTally {
            uploaded: self.uploaded as u64,
            failed: (self.transient_failures + self.rejected + self.remove_failures) as u64,
            dropped: self.dropped.len() as u64,
            remaining: self.remaining,
            duration_ms: self.duration_ms,
        }
    }
}

/// Background uploader for the durable queue.
///
/// The only component that removes queued mutations. At most one drain pass
/// runs at a time; triggers that arrive during a pass are folded into a single
/// follow-up pass.
pub struct SyncEngine {
    queue: Arc<dyn MutationQueue>,
    gateway: Arc<dyn EvidenceGateway>,
    connectivity: Arc<dyn ConnectivityStatus>,
    reconciler: Arc<EvidenceReconciler>,
    upload_timeout: Duration,
    rejection_policy: RejectionPolicy,
    gate: Mutex<()>,
    pending: AtomicBool,
    metrics: DrainMetrics,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<dyn MutationQueue>,
        gateway: Arc<dyn EvidenceGateway>,
        connectivity: Arc<dyn ConnectivityStatus>,
        reconciler: Arc<EvidenceReconciler>,
    ) -> Self {
        Self {
            queue,
            gateway,
            connectivity,
            reconciler,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            rejection_policy: RejectionPolicy::default(),
            gate: Mutex::new(()),
            pending: AtomicBool::new(false),
            metrics: DrainMetrics::new(),
        }
    }

    pub fn with_upload_timeout(mut self, upload_timeout: Duration) -> Self {
        self.upload_timeout = upload_timeout;
        self
    }

    pub fn with_rejection_policy(mut self, rejection_policy: RejectionPolicy) -> Self {
        self.rejection_policy = rejection_policy;
        self
    }

    pub fn metrics(&self) -> DrainMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Fire-and-forget variant of [`SyncEngine::request_drain`].
    pub fn trigger(self: &Arc<Self>, trigger: DrainTrigger) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.drain_logged(trigger).await;
        });
    }

    /// Asks for a drain pass.
    ///
    /// Runs the pass (plus any follow-up owed to triggers that arrived
    /// meanwhile) and returns the last report. If a pass is already running
    /// the request is recorded for that runner and `Ok(None)` is returned
    /// right away.
    pub async fn request_drain(
        &self,
        trigger: DrainTrigger,
    ) -> Result<Option<DrainReport>, AppError> {
        self.pending.store(true, Ordering::SeqCst);
        let mut last = None;
        let mut next_trigger = trigger;

        loop {
            let Ok(guard) = self.gate.try_lock() else {
                tracing::debug!(
                    target: "fieldsync::sync",
                    trigger = trigger.as_str(),
                    "drain already running, coalescing trigger"
                );
                return Ok(last);
            };

            while self.pending.swap(false, Ordering::SeqCst) {
                last = Some(self.drain_pass(next_trigger).await?);
                next_trigger = DrainTrigger::FollowUp;
            }
            drop(guard);

            // A trigger may have landed between the last swap and the unlock.
            if !self.pending.load(Ordering::SeqCst) {
                return Ok(last);
            }
        }
    }

    async fn drain_logged(&self, trigger: DrainTrigger) {
        if let Err(err) = self.request_drain(trigger).await {
            tracing::error!(
                target: "fieldsync::sync",
                trigger = trigger.as_str(),
                error = %err,
                "drain pass failed"
            );
        }
    }

    async fn drain_pass(&self, trigger: DrainTrigger) -> Result<DrainReport, AppError> {
        let started = Instant::now();
        let mut report = DrainReport::empty(trigger);
        let mutations = self.queue.list_all().await?;

        if !self.connectivity.is_online() {
            report.skipped_offline = true;
            report.remaining = mutations.len() as u64;
            tracing::debug!(
                target: "fieldsync::sync",
                trigger = trigger.as_str(),
                queued = mutations.len(),
                "offline, skipping drain"
            );
            self.metrics
                .record(report.status(), trigger.as_str(), &report.tally());
            return Ok(report);
        }

        for mutation in &mutations {
            report.attempted += 1;
            match self.upload(mutation).await {
                Ok(record) => {
                    report.uploaded += 1;
                    if let Err(err) = self.queue.remove(mutation.id).await {
                        // The server holds the record; the next pass re-sends it
                        // under the same client_ref.
                        report.remove_failures += 1;
                        tracing::warn!(
                            target: "fieldsync::sync",
                            mutation_id = %mutation.id,
                            task_id = %mutation.task_id,
                            error = %err,
                            "uploaded mutation could not be removed"
                        );
                    }
                    if self.reconciler.apply_confirmation(mutation, record).await
                        == ConfirmOutcome::Applied
                    {
                        tracing::debug!(
                            target: "fieldsync::sync",
                            mutation_id = %mutation.id,
                            "slot confirmed"
                        );
                    }
                }
                Err(UploadError::Transient(reason)) => {
                    report.transient_failures += 1;
                    tracing::warn!(
                        target: "fieldsync::sync",
                        mutation_id = %mutation.id,
                        task_id = %mutation.task_id,
                        reason = %reason,
                        "upload failed, keeping mutation queued"
                    );
                }
                Err(UploadError::Permanent(reason)) => {
                    self.handle_rejection(mutation, &reason, &mut report).await;
                }
            }
        }

        report.remaining = match self.queue.pending_count().await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(target: "fieldsync::sync", error = %err, "could not count queue after drain");
                (mutations.len() + report.remove_failures)
                    .saturating_sub(report.uploaded + report.dropped.len()) as u64
            }
        };
        report.duration_ms = started.elapsed().as_millis() as u64;
        self.metrics
            .record(report.status(), trigger.as_str(), &report.tally());

        tracing::info!(
            target: "fieldsync::sync",
            trigger = trigger.as_str(),
            attempted = report.attempted,
            uploaded = report.uploaded,
            failed = report.transient_failures + report.rejected,
            dropped = report.dropped.len(),
            remaining = report.remaining,
            duration_ms = report.duration_ms,
            "drain pass finished"
        );
        Ok(report)
    }

    async fn upload(&self, mutation: &QueuedMutation) -> Result<EvidenceRecord, UploadError> {
        let upload = mutation.to_upload();
        let mut record = tokio::time::timeout(self.upload_timeout, self.gateway.upload(&upload))
            .await
            .map_err(|_| {
                UploadError::Transient(format!(
                    "upload timed out after {}s",
                    self.upload_timeout.as_secs()
                ))
            })??;
        record.stage = mutation.stage;
        Ok(record)
    }

    async fn handle_rejection(
        &self,
        mutation: &QueuedMutation,
        reason: &str,
        report: &mut DrainReport,
    ) {
        match self.rejection_policy {
            RejectionPolicy::Retain => {
                report.rejected += 1;
                tracing::warn!(
                    target: "fieldsync::sync",
                    mutation_id = %mutation.id,
                    task_id = %mutation.task_id,
                    reason = %reason,
                    "upload rejected, keeping mutation queued"
                );
            }
            RejectionPolicy::Drop => {
                if let Err(err) = self.queue.remove(mutation.id).await {
                    report.rejected += 1;
                    tracing::warn!(
                        target: "fieldsync::sync",
                        mutation_id = %mutation.id,
                        error = %err,
                        "rejected mutation could not be dropped"
                    );
                    return;
                }
                report.dropped.push(mutation.id);
                tracing::error!(
                    target: "fieldsync::sync",
                    mutation_id = %mutation.id,
                    task_id = %mutation.task_id,
                    stage = %mutation.stage,
                    reason = %reason,
                    "upload rejected, mutation dropped"
                );
            }
        }
    }

    /// Starts the background loop: one startup pass, then a pass on every
    /// interval tick and every debounced `became-online` edge.
    pub fn spawn(
        self: &Arc<Self>,
        transitions: OnlineTransitions,
        interval: Duration,
    ) -> SyncEngineHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = Arc::clone(self);
        let task = tokio::spawn(async move {
            engine.run(transitions, interval, shutdown_rx).await;
        });
        SyncEngineHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(
        &self,
        mut transitions: OnlineTransitions,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(
            target: "fieldsync::sync",
            interval_secs = interval.as_secs(),
            "sync engine started"
        );
        self.drain_logged(DrainTrigger::Startup).await;

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut edges_open = true;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.drain_logged(DrainTrigger::Interval).await;
                }
                edge = transitions.next_became_online(), if edges_open => {
                    match edge {
                        Some(()) => self.drain_logged(DrainTrigger::Connectivity).await,
                        None => edges_open = false,
                    }
                }
            }
        }

        tracing::info!(target: "fieldsync::sync", "sync engine stopped");
    }
}

/// Owner of the background loop started by [`SyncEngine::spawn`].
pub struct SyncEngineHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncEngineHandle {
    /// Stops the loop after the pass in progress, if any, completes.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(target: "fieldsync::sync", error = %err, "sync engine task ended abnormally");
        }
    }
}
