use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct QueuedMutationRow {
    pub id: i64,
    pub schema_version: i64,
    pub client_ref: String,
    pub task_id: String,
    pub stage: String,
    pub payload: Vec<u8>,
    pub checksum: String,
    pub latitude: f64,
    pub longitude: f64,
    pub enqueued_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PendingSummaryRow {
    pub task_id: String,
    pub stage: String,
    pub pending: i64,
    pub oldest_enqueued_at: i64,
}
