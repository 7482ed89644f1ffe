pub mod capture_service;
pub mod evidence_reconciler;

pub use capture_service::{CaptureOutcome, CapturePipeline};
pub use evidence_reconciler::EvidenceReconciler;
