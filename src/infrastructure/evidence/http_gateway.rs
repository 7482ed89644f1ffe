use crate::application::ports::{EvidenceGateway, UploadError};
use crate::domain::entities::{EvidenceRecord, EvidenceUpload};
use crate::domain::value_objects::{EvidenceId, GeoLocation};
use crate::shared::config::EvidenceServiceConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody<'a> {
    client_ref: String,
    stage: &'a str,
    photo: String,
    location: GeoLocation,
    captured_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    id: String,
    photo_url: String,
    #[serde(default)]
    captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    location: Option<GeoLocation>,
}

/// `EvidenceGateway` speaking JSON over HTTP to the evidence service.
pub struct HttpEvidenceGateway {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpEvidenceGateway {
    pub fn new(config: &EvidenceServiceConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn endpoint(&self, upload: &EvidenceUpload) -> String {
        format!("{}/tasks/{}/evidence", self.base_url, upload.task_id)
    }
}

#[async_trait]
impl EvidenceGateway for HttpEvidenceGateway {
    async fn upload(&self, upload: &EvidenceUpload) -> Result<EvidenceRecord, UploadError> {
        let client_ref = upload.client_ref.to_string();
        let body = UploadBody {
            client_ref: client_ref.clone(),
            stage: upload.stage.as_str(),
            photo: STANDARD.encode(upload.photo.as_bytes()),
            location: upload.location,
            captured_at: upload.captured_at,
        };

        let mut request = self
            .client
            .post(self.endpoint(upload))
            .header(IDEMPOTENCY_HEADER, &client_ref)
            .json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, detail.trim()));
        }

        let payload: UploadResponse = response
            .json()
            .await
            .map_err(|err| UploadError::Transient(format!("unreadable response: {err}")))?;
        let id = EvidenceId::new(payload.id).map_err(UploadError::Permanent)?;

        tracing::debug!(
            target: "fieldsync::sync",
            task_id = %upload.task_id,
            evidence_id = %id,
            "evidence service accepted upload"
        );
        Ok(EvidenceRecord::confirmed(
            id,
            upload.stage,
            payload.photo_url,
            payload.captured_at.unwrap_or(upload.captured_at),
            payload.location.unwrap_or(upload.location),
        ))
    }
}

/// Auth failures count as transient: a refreshed token lets the same upload through.
pub fn classify_status(status: StatusCode, detail: &str) -> UploadError {
    let message = if detail.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), detail)
    };

    match status {
        StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN => UploadError::Transient(message),
        s if s.is_server_error() => UploadError::Transient(message),
        s if s.is_client_error() => UploadError::Permanent(message),
        _ => UploadError::Transient(message),
    }
}

fn classify_transport_error(err: reqwest::Error) -> UploadError {
    if err.is_builder() {
        UploadError::Permanent(err.to_string())
    } else {
        UploadError::Transient(err.to_string())
    }
}
