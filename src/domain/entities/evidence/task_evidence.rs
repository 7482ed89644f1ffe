use crate::domain::value_objects::{EvidenceStage, MutationId, TaskId};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{EvidenceRecord, QueuedMutation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Empty,
    LocalPending,
    Confirmed,
}

/// Result of applying a sync confirmation to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The slot moved from `LocalPending` to `Confirmed`.
    Applied,
    /// A newer capture occupies the slot; the confirmation is ignored.
    Stale,
    /// The slot already holds this mutation's confirmed record.
    AlreadyConfirmed,
}

#[derive(Debug, Clone, PartialEq)]
struct EvidenceSlot {
    record: EvidenceRecord,
    // Mutation the occupying record came from; `None` for direct uploads and seeded records.
    origin: Option<MutationId>,
}

/// Evidence of one task, at most one record per stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEvidence {
    task_id: TaskId,
    slots: BTreeMap<EvidenceStage, EvidenceSlot>,
}

impl TaskEvidence {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            slots: BTreeMap::new(),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn state(&self, stage: EvidenceStage) -> SlotState {
        match self.slots.get(&stage) {
            None => SlotState::Empty,
            Some(slot) if slot.record.sync_pending => SlotState::LocalPending,
            Some(_) => SlotState::Confirmed,
        }
    }

    pub fn record(&self, stage: EvidenceStage) -> Option<&EvidenceRecord> {
        self.slots.get(&stage).map(|slot| &slot.record)
    }

    /// Records ordered by stage.
    pub fn records(&self) -> Vec<EvidenceRecord> {
        self.slots.values().map(|slot| slot.record.clone()).collect()
    }

    pub fn origin(&self, stage: EvidenceStage) -> Option<MutationId> {
        self.slots.get(&stage).and_then(|slot| slot.origin)
    }

    pub fn missing_stages(&self) -> Vec<EvidenceStage> {
        EvidenceStage::ALL
            .into_iter()
            .filter(|stage| !self.slots.contains_key(stage))
            .collect()
    }

    /// Completion is local readiness: pending records count.
    pub fn is_completable(&self) -> bool {
        self.missing_stages().is_empty()
    }

    /// Occupies the stage slot with the pending record of `mutation`.
    ///
    /// Returns `false` when the slot already belongs to a newer mutation, which
    /// only happens when queued items are replayed out of order.
    pub fn record_local(&mut self, mutation: &QueuedMutation) -> bool {
        if let Some(current) = self.origin(mutation.stage)
            && current > mutation.id
        {
            return false;
        }
        self.slots.insert(
            mutation.stage,
            EvidenceSlot {
                record: EvidenceRecord::pending_from(mutation),
                origin: Some(mutation.id),
            },
        );
        true
    }

    /// Occupies the slot with a record the server confirmed during capture.
    pub fn record_confirmed(&mut self, record: EvidenceRecord) {
        let mut record = record;
        record.sync_pending = false;
        self.slots.insert(
            record.stage,
            EvidenceSlot {
                record,
                origin: None,
            },
        );
    }

    /// Fills an empty slot with a server-known record. Occupied slots are kept.
    pub fn seed_confirmed(&mut self, record: EvidenceRecord) -> bool {
        if self.slots.contains_key(&record.stage) {
            return false;
        }
        self.record_confirmed(record);
        true
    }

    /// Applies the server's confirmation of `mutation_id` to `stage`.
    pub fn confirm(
        &mut self,
        stage: EvidenceStage,
        mutation_id: MutationId,
        record: EvidenceRecord,
    ) -> ConfirmOutcome {
        let Some(slot) = self.slots.get_mut(&stage) else {
            return ConfirmOutcome::Stale;
        };
        if slot.origin != Some(mutation_id) {
            return ConfirmOutcome::Stale;
        }
        if !slot.record.sync_pending {
            return ConfirmOutcome::AlreadyConfirmed;
        }

        let mut record = record;
        record.stage = stage;
        record.sync_pending = false;
        slot.record = record;
        ConfirmOutcome::Applied
    }

    pub fn snapshot(&self) -> TaskEvidenceSnapshot {
        TaskEvidenceSnapshot {
            task_id: self.task_id.clone(),
            records: self.records(),
            completable: self.is_completable(),
        }
    }
}

/// Copy of a task's evidence list handed to the task update channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvidenceSnapshot {
    pub task_id: TaskId,
    pub records: Vec<EvidenceRecord>,
    pub completable: bool,
}

impl TaskEvidenceSnapshot {
    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|record| record.sync_pending).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::evidence::QueuedMutationDraft;
    use crate::domain::value_objects::{EvidenceId, GeoLocation, PhotoPayload};
    use bytes::Bytes;
    use chrono::Utc;

    fn task() -> TaskId {
        TaskId::new("task-1".into()).unwrap()
    }

    fn mutation(id: i64, stage: EvidenceStage) -> QueuedMutation {
        QueuedMutationDraft::new(
            task(),
            stage,
            PhotoPayload::new(Bytes::from(vec![id as u8; 4])).unwrap(),
            GeoLocation::new(1.0, 2.0).unwrap(),
            Utc::now(),
        )
        .into_mutation(MutationId::new(id).unwrap())
    }

    fn server_record(id: &str, stage: EvidenceStage) -> EvidenceRecord {
        EvidenceRecord::confirmed(
            EvidenceId::new(id.into()).unwrap(),
            stage,
            format!("https://cdn.example.com/{id}.jpg"),
            Utc::now(),
            GeoLocation::new(1.0, 2.0).unwrap(),
        )
    }

    #[test]
    fn slot_walks_empty_pending_confirmed() {
        let mut evidence = TaskEvidence::new(task());
        assert_eq!(evidence.state(EvidenceStage::Before), SlotState::Empty);

        evidence.record_local(&mutation(1, EvidenceStage::Before));
        assert_eq!(evidence.state(EvidenceStage::Before), SlotState::LocalPending);
        assert!(evidence.record(EvidenceStage::Before).unwrap().id.is_local());

        let outcome = evidence.confirm(
            EvidenceStage::Before,
            MutationId::new(1).unwrap(),
            server_record("ev-1", EvidenceStage::Before),
        );
        assert_eq!(outcome, ConfirmOutcome::Applied);
        assert_eq!(evidence.state(EvidenceStage::Before), SlotState::Confirmed);
        assert_eq!(evidence.record(EvidenceStage::Before).unwrap().id.as_str(), "ev-1");
    }

    #[test]
    fn recapture_supersedes_and_stale_confirmation_is_ignored() {
        let mut evidence = TaskEvidence::new(task());
        evidence.record_local(&mutation(1, EvidenceStage::Before));
        evidence.record_local(&mutation(2, EvidenceStage::Before));
        assert_eq!(evidence.records().len(), 1);
        assert_eq!(evidence.origin(EvidenceStage::Before), MutationId::new(2).ok());

        let stale = evidence.confirm(
            EvidenceStage::Before,
            MutationId::new(1).unwrap(),
            server_record("ev-1", EvidenceStage::Before),
        );
        assert_eq!(stale, ConfirmOutcome::Stale);
        assert_eq!(evidence.state(EvidenceStage::Before), SlotState::LocalPending);
        assert_eq!(
            evidence.record(EvidenceStage::Before).unwrap().id.as_str(),
            "local-2"
        );
    }

    #[test]
    fn older_mutation_cannot_replace_newer_slot() {
        let mut evidence = TaskEvidence::new(task());
        assert!(evidence.record_local(&mutation(5, EvidenceStage::During)));
        assert!(!evidence.record_local(&mutation(3, EvidenceStage::During)));
        assert_eq!(evidence.origin(EvidenceStage::During), MutationId::new(5).ok());
    }

    #[test]
    fn direct_upload_supersedes_pending_slot() {
        let mut evidence = TaskEvidence::new(task());
        evidence.record_local(&mutation(1, EvidenceStage::After));
        evidence.record_confirmed(server_record("ev-direct", EvidenceStage::After));

        let outcome = evidence.confirm(
            EvidenceStage::After,
            MutationId::new(1).unwrap(),
            server_record("ev-1", EvidenceStage::After),
        );
        assert_eq!(outcome, ConfirmOutcome::Stale);
        assert_eq!(
            evidence.record(EvidenceStage::After).unwrap().id.as_str(),
            "ev-direct"
        );
    }

    #[test]
    fn repeated_confirmation_is_idempotent() {
        let mut evidence = TaskEvidence::new(task());
        evidence.record_local(&mutation(4, EvidenceStage::During));
        let id = MutationId::new(4).unwrap();
        evidence.confirm(EvidenceStage::During, id, server_record("ev-4", EvidenceStage::During));
        let again =
            evidence.confirm(EvidenceStage::During, id, server_record("ev-4", EvidenceStage::During));
        assert_eq!(again, ConfirmOutcome::AlreadyConfirmed);
    }

    #[test]
    fn completable_only_with_all_three_stages() {
        let mut evidence = TaskEvidence::new(task());
        evidence.record_local(&mutation(1, EvidenceStage::Before));
        evidence.record_confirmed(server_record("ev-2", EvidenceStage::During));
        assert!(!evidence.is_completable());
        assert_eq!(evidence.missing_stages(), vec![EvidenceStage::After]);

        evidence.record_local(&mutation(3, EvidenceStage::After));
        assert!(evidence.is_completable());
        assert_eq!(evidence.snapshot().pending_count(), 2);
    }

    #[test]
    fn seeding_never_overwrites_local_capture() {
        let mut evidence = TaskEvidence::new(task());
        evidence.record_local(&mutation(1, EvidenceStage::Before));
        assert!(!evidence.seed_confirmed(server_record("old", EvidenceStage::Before)));
        assert!(evidence.seed_confirmed(server_record("ev-d", EvidenceStage::During)));
        assert_eq!(evidence.state(EvidenceStage::Before), SlotState::LocalPending);
        assert_eq!(evidence.state(EvidenceStage::During), SlotState::Confirmed);
    }
}
