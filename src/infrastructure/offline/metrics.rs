use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcomeStatus {
    /// Every attempted mutation was confirmed.
    Success,
    /// At least one attempted mutation stayed queued or was dropped.
    Failure,
    /// Offline at drain time; nothing was attempted.
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrainMetricsSnapshot {
    pub total_passes: u64,
    pub total_uploaded: u64,
    pub total_failed: u64,
    pub total_dropped: u64,
    pub consecutive_failed_passes: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_outcome: Option<DrainOutcomeStatus>,
    pub last_trigger: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub last_remaining: Option<u64>,
}

/// Counts from a single drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainTally {
    pub uploaded: u64,
    pub failed: u64,
    pub dropped: u64,
    pub remaining: u64,
    pub duration_ms: u64,
}

#[derive(Default, Clone)]
struct LastDrain {
    outcome: Option<DrainOutcomeStatus>,
    trigger: Option<String>,
    duration_ms: Option<u64>,
    remaining: Option<u64>,
}

/// Running totals for the sync engine's drain passes.
pub struct DrainMetrics {
    passes: AtomicU64,
    uploaded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    consecutive_failed: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    last: Mutex<LastDrain>,
}

impl Default for DrainMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DrainMetrics {
    pub fn new() -> Self {
        Self {
            passes: AtomicU64::new(0),
            uploaded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            consecutive_failed: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            last: Mutex::new(LastDrain::default()),
        }
    }

    pub fn record(
        &self,
        status: DrainOutcomeStatus,
        trigger: &str,
        tally: &DrainTally,
    ) -> DrainMetricsSnapshot {
        self.passes.fetch_add(1, Ordering::Relaxed);
        self.uploaded.fetch_add(tally.uploaded, Ordering::Relaxed);
        self.failed.fetch_add(tally.failed, Ordering::Relaxed);
        self.dropped.fetch_add(tally.dropped, Ordering::Relaxed);

        match status {
            DrainOutcomeStatus::Success => {
                self.last_success_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failed.store(0, Ordering::Relaxed);
            }
            DrainOutcomeStatus::Failure => {
                self.last_failure_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failed.fetch_add(1, Ordering::Relaxed);
            }
            DrainOutcomeStatus::Skipped => {}
        }

        if let Ok(mut guard) = self.last.lock() {
            guard.outcome = Some(status);
            guard.trigger = Some(trigger.to_string());
            guard.duration_ms = Some(tally.duration_ms);
            guard.remaining = Some(tally.remaining);
        }

        self.snapshot()
    }

    pub fn snapshot(&self) -> DrainMetricsSnapshot {
        let last = self
            .last
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        DrainMetricsSnapshot {
            total_passes: self.passes.load(Ordering::Relaxed),
            total_uploaded: self.uploaded.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            total_dropped: self.dropped.load(Ordering::Relaxed),
            consecutive_failed_passes: self.consecutive_failed.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_outcome: last.outcome,
            last_trigger: last.trigger,
            last_duration_ms: last.duration_ms,
            last_remaining: last.remaining,
        }
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
