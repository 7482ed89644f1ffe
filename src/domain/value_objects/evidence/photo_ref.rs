use super::MutationId;
use serde::{Deserialize, Serialize};

/// Where the UI loads the photo from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PhotoRef {
    /// Bytes still held by the durable queue.
    Queued(MutationId),
    Remote(String),
}

impl PhotoRef {
    pub fn is_remote(&self) -> bool {
        matches!(self, PhotoRef::Remote(_))
    }
}
