use crate::application::ports::{MutationQueue, TaskUpdateSink};
use crate::domain::entities::{
    ConfirmOutcome, EvidenceRecord, QueuedMutation, QueuedMutationDraft, SlotState, TaskEvidence,
    TaskEvidenceSnapshot,
};
use crate::domain::value_objects::{EvidenceStage, TaskId};
use crate::shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory evidence state of every task the session touched.
///
/// Merges locally queued captures with server-confirmed ones so the UI never
/// shows a duplicate or a missing proof photo. Each change is published to the
/// task update channel while the state lock is held, so observers see updates
/// in the order they were applied.
pub struct EvidenceReconciler {
    tasks: RwLock<HashMap<TaskId, TaskEvidence>>,
    task_updates: Option<Arc<dyn TaskUpdateSink>>,
}

impl EvidenceReconciler {
    pub fn new(task_updates: Option<Arc<dyn TaskUpdateSink>>) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            task_updates,
        }
    }

    /// `EMPTY | LOCAL_PENDING | CONFIRMED -> LOCAL_PENDING` after an enqueue.
    pub async fn record_local(&self, mutation: &QueuedMutation) -> EvidenceRecord {
        let mut tasks = self.tasks.write().await;
        self.occupy_local(&mut tasks, mutation)
    }

    /// Enqueues `draft` and occupies its slot under one write lock.
    ///
    /// A drain pass may upload the row as soon as it is committed; its
    /// confirmation waits here until the pending record is in place.
    pub async fn queue_local(
        &self,
        queue: &dyn MutationQueue,
        draft: QueuedMutationDraft,
    ) -> Result<(QueuedMutation, EvidenceRecord), AppError> {
        let mut tasks = self.tasks.write().await;
        let mutation_id = queue.enqueue(&draft).await?;
        let mutation = draft.into_mutation(mutation_id);
        let record = self.occupy_local(&mut tasks, &mutation);
        Ok((mutation, record))
    }

    fn occupy_local(
        &self,
        tasks: &mut HashMap<TaskId, TaskEvidence>,
        mutation: &QueuedMutation,
    ) -> EvidenceRecord {
        let evidence = tasks
            .entry(mutation.task_id.clone())
            .or_insert_with(|| TaskEvidence::new(mutation.task_id.clone()));

        if evidence.record_local(mutation) {
            self.publish(evidence);
            return EvidenceRecord::pending_from(mutation);
        }

        tracing::debug!(
            target: "fieldsync::reconcile",
            task_id = %mutation.task_id,
            stage = %mutation.stage,
            mutation_id = %mutation.id,
            "newer capture already occupies the slot"
        );
        evidence
            .record(mutation.stage)
            .cloned()
            .unwrap_or_else(|| EvidenceRecord::pending_from(mutation))
    }

    /// Direct upload confirmed during capture; the slot lands in `CONFIRMED`.
    pub async fn record_confirmed(&self, task_id: &TaskId, record: EvidenceRecord) {
        let mut tasks = self.tasks.write().await;
        let evidence = tasks
            .entry(task_id.clone())
            .or_insert_with(|| TaskEvidence::new(task_id.clone()));
        evidence.record_confirmed(record);
        self.publish(evidence);
    }

    /// Sync engine success callback for `mutation`.
    pub async fn apply_confirmation(
        &self,
        mutation: &QueuedMutation,
        record: EvidenceRecord,
    ) -> ConfirmOutcome {
        let mut tasks = self.tasks.write().await;
        let Some(evidence) = tasks.get_mut(&mutation.task_id) else {
            tracing::debug!(
                target: "fieldsync::reconcile",
                task_id = %mutation.task_id,
                mutation_id = %mutation.id,
                "confirmation for a task without evidence state"
            );
            return ConfirmOutcome::Stale;
        };

        let outcome = evidence.confirm(mutation.stage, mutation.id, record);
        match outcome {
            ConfirmOutcome::Applied => self.publish(evidence),
            ConfirmOutcome::Stale => tracing::debug!(
                target: "fieldsync::reconcile",
                task_id = %mutation.task_id,
                stage = %mutation.stage,
                mutation_id = %mutation.id,
                "ignoring confirmation of superseded capture"
            ),
            ConfirmOutcome::AlreadyConfirmed => {}
        }
        outcome
    }

    /// Rebuilds pending slots from the durable queue after a restart.
    /// Returns the number of tasks that now carry pending evidence.
    pub async fn restore_pending(&self, mutations: &[QueuedMutation]) -> usize {
        let mut tasks = self.tasks.write().await;
        let mut touched: Vec<TaskId> = Vec::new();

        for mutation in mutations {
            let evidence = tasks
                .entry(mutation.task_id.clone())
                .or_insert_with(|| TaskEvidence::new(mutation.task_id.clone()));
            if evidence.record_local(mutation) && !touched.contains(&mutation.task_id) {
                touched.push(mutation.task_id.clone());
            }
        }

        for task_id in &touched {
            if let Some(evidence) = tasks.get(task_id) {
                self.publish(evidence);
            }
        }
        touched.len()
    }

    /// Hydrates evidence the server already holds. Only empty slots are filled.
    pub async fn seed_confirmed(&self, task_id: &TaskId, records: Vec<EvidenceRecord>) -> usize {
        let mut tasks = self.tasks.write().await;
        let evidence = tasks
            .entry(task_id.clone())
            .or_insert_with(|| TaskEvidence::new(task_id.clone()));

        let seeded = records
            .into_iter()
            .filter(|record| evidence.seed_confirmed(record.clone()))
            .count();
        if seeded > 0 {
            self.publish(evidence);
        }
        seeded
    }

    pub async fn snapshot(&self, task_id: &TaskId) -> Option<TaskEvidenceSnapshot> {
        self.tasks.read().await.get(task_id).map(TaskEvidence::snapshot)
    }

    pub async fn slot_state(&self, task_id: &TaskId, stage: EvidenceStage) -> SlotState {
        self.tasks
            .read()
            .await
            .get(task_id)
            .map(|evidence| evidence.state(stage))
            .unwrap_or(SlotState::Empty)
    }

    /// Completion gate: all three stages need a record, synced or not.
    pub async fn ensure_completable(&self, task_id: &TaskId) -> Result<(), AppError> {
        let tasks = self.tasks.read().await;
        let missing = tasks
            .get(task_id)
            .map(TaskEvidence::missing_stages)
            .unwrap_or_else(|| EvidenceStage::ALL.to_vec());

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::IncompleteEvidence(missing))
        }
    }

    fn publish(&self, evidence: &TaskEvidence) {
        if let Some(sink) = &self.task_updates {
            sink.on_update_task(&evidence.snapshot());
        }
    }
}
