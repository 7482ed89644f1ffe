use super::MutationId;
use serde::{Deserialize, Serialize};
use std::fmt;

const LOCAL_PREFIX: &str = "local-";

/// Id of a reconciled evidence record: either server-assigned, or a temporary
/// `local-<mutation id>` id used until the queued upload is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceId(String);

impl EvidenceId {
    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Evidence ID cannot be empty".to_string());
        }
        if value.starts_with(LOCAL_PREFIX) {
            return Err(format!("Server evidence ID cannot start with '{LOCAL_PREFIX}'"));
        }
        Ok(Self(value))
    }

    pub fn local(mutation_id: MutationId) -> Self {
        Self(format!("{LOCAL_PREFIX}{mutation_id}"))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EvidenceId> for String {
    fn from(value: EvidenceId) -> Self {
        value.0
    }
}
