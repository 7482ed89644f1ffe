use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the sync engine does with a mutation the server rejected for good.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Keep the mutation queued and retry it like a transient failure.
    #[default]
    Retain,
    /// Remove the mutation and report it in the drain report.
    Drop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub connectivity: ConnectivityConfig,
    pub capture: CaptureConfig,
    pub evidence_service: EvidenceServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    /// Upper bound on queued mutations; `None` means limited only by disk.
    #[serde(default)]
    pub max_pending: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval: u64,
    pub upload_timeout: u64,
    #[serde(default)]
    pub rejection_policy: RejectionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    pub debounce_ms: u64,
    pub assume_online_at_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub gps_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceServiceConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
                connection_timeout: 30,
                max_pending: None,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval: 30,
                upload_timeout: 20,
                rejection_policy: RejectionPolicy::Retain,
            },
            connectivity: ConnectivityConfig {
                debounce_ms: 0,
                assume_online_at_start: false,
            },
            capture: CaptureConfig { gps_timeout: 15 },
            evidence_service: EvidenceServiceConfig {
                base_url: "http://localhost:8080/api".to_string(),
                api_token: None,
            },
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout)
    }
}

impl ConnectivityConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl CaptureConfig {
    pub fn gps_timeout(&self) -> Duration {
        Duration::from_secs(self.gps_timeout)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("FIELDSYNC_DATABASE_URL")
            && !v.trim().is_empty()
        {
            cfg.database.url = v.trim().to_string();
        }
        if let Some(v) = lookup("FIELDSYNC_DATABASE_MAX_CONNECTIONS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.database.max_connections = value.min(u64::from(u32::MAX)) as u32;
        }
        if let Some(v) = lookup("FIELDSYNC_QUEUE_MAX_PENDING") {
            cfg.database.max_pending = parse_u64(&v).filter(|value| *value > 0);
        }

        if let Some(v) = lookup("FIELDSYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(v) = lookup("FIELDSYNC_SYNC_INTERVAL_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.sync_interval = value;
        }
        if let Some(v) = lookup("FIELDSYNC_UPLOAD_TIMEOUT_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.upload_timeout = value;
        }
        if let Some(v) = lookup("FIELDSYNC_REJECTION_POLICY") {
            cfg.sync.rejection_policy = match v.trim().to_ascii_lowercase().as_str() {
                "drop" => RejectionPolicy::Drop,
                "retain" => RejectionPolicy::Retain,
                _ => cfg.sync.rejection_policy,
            };
        }

        if let Some(v) = lookup("FIELDSYNC_CONNECTIVITY_DEBOUNCE_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.connectivity.debounce_ms = value;
        }
        if let Some(v) = lookup("FIELDSYNC_ASSUME_ONLINE") {
            cfg.connectivity.assume_online_at_start =
                parse_bool(&v, cfg.connectivity.assume_online_at_start);
        }

        if let Some(v) = lookup("FIELDSYNC_GPS_TIMEOUT_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.capture.gps_timeout = value;
        }

        if let Some(v) = lookup("FIELDSYNC_EVIDENCE_URL")
            && !v.trim().is_empty()
        {
            cfg.evidence_service.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("FIELDSYNC_EVIDENCE_TOKEN")
            && !v.trim().is_empty()
        {
            cfg.evidence_service.api_token = Some(v.trim().to_string());
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.database.max_pending == Some(0) {
            return Err("Queue max_pending must be greater than 0".to_string());
        }
        if self.sync.sync_interval == 0 {
            return Err("Sync interval must be greater than 0".to_string());
        }
        if self.sync.upload_timeout == 0 {
            return Err("Upload timeout must be greater than 0".to_string());
        }
        if self.capture.gps_timeout == 0 {
            return Err("GPS timeout must be greater than 0".to_string());
        }
        if self.evidence_service.base_url.trim().is_empty() {
            return Err("Evidence service base_url cannot be empty".to_string());
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    let dir = dirs::data_local_dir()
        .map(|dir| dir.join("fieldsync"))
        .unwrap_or_else(|| std::path::PathBuf::from("./data"));
    format!("sqlite://{}?mode=rwc", dir.join("evidence_queue.db").display())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
