//! Status endpoint client.

use crate::client::{build_http_client, map_send_error};
use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::models::{JobId, StatusEnvelope, StatusReport};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::{debug, error};

/// Fetches the current status of an analysis job.
#[async_trait]
pub trait StatusClient: Send + Sync {
    /// Fetch one status report for `job_id`.
    async fn fetch_status(&self, job_id: &JobId) -> Result<StatusReport, ClientError>;
}

/// `StatusClient` backed by the remote properties API.
pub struct HttpStatusClient {
    http_client: reqwest::Client,
    url_template: String,
    timeout: Duration,
}

impl HttpStatusClient {
    /// Create a client from the API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http_client: build_http_client(config.timeout())?,
            url_template: config.status_url.clone(),
            timeout: config.timeout(),
        })
    }

    /// Status URL for a job.
    pub fn status_url(&self, job_id: &JobId) -> String {
        self.url_template.replace("{job_id}", job_id.as_str())
    }
}

#[async_trait]
impl StatusClient for HttpStatusClient {
    async fn fetch_status(&self, job_id: &JobId) -> Result<StatusReport, ClientError> {
        let url = self.status_url(job_id);
        debug!("Requesting status for {} from {}", job_id, url);

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status();
        debug!("Status endpoint answered {} for {}", status, job_id);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Status request for {} failed with {}: {}", job_id, status, body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;
        let envelope: StatusEnvelope = serde_json::from_str(&text)?;

        Ok(envelope.into_report())
    }
}
