use crate::domain::entities::TaskEvidenceSnapshot;

/// Hosting application's task-update path (`onUpdateTask`).
///
/// Called synchronously whenever a task's evidence list changes; implementations
/// must not block.
pub trait TaskUpdateSink: Send + Sync {
    fn on_update_task(&self, update: &TaskEvidenceSnapshot);
}
