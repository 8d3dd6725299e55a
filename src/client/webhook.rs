//! Webhook submission client.
//!
//! The webhook takes the listing URL plus the user's strategy and goal as
//! query parameters and answers with the id of the accepted job.

use crate::client::{build_http_client, map_send_error};
use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::models::{AnalysisRequest, JobId, WebhookReply};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, error, info};

/// Characters of an unparseable body quoted in the error message.
const SNIPPET_LEN: usize = 100;

/// Submits analysis requests.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Submit a request and return the job id assigned to it.
    async fn submit(&self, request: &AnalysisRequest) -> Result<JobId, ClientError>;
}

/// `WebhookClient` that issues a GET against the configured webhook.
pub struct HttpWebhookClient {
    http_client: reqwest::Client,
    webhook_url: Url,
    timeout: Duration,
}

impl HttpWebhookClient {
    /// Create a client from the API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let webhook_url = Url::parse(&config.webhook_url)
            .map_err(|_| ClientError::InvalidUrl(config.webhook_url.clone()))?;

        Ok(Self {
            http_client: build_http_client(config.timeout())?,
            webhook_url,
            timeout: config.timeout(),
        })
    }

    /// Full webhook URL for a request, query parameters encoded.
    pub fn request_url(&self, request: &AnalysisRequest) -> Url {
        let mut url = self.webhook_url.clone();
        url.query_pairs_mut()
            .extend_pairs(request.query_pairs().iter().map(|(k, v)| (*k, v.as_str())));
        url
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn submit(&self, request: &AnalysisRequest) -> Result<JobId, ClientError> {
        let url = self.request_url(request);
        info!(
            "Submitting {} analysis for {}",
            request.strategy, request.url
        );
        debug!("Webhook request: {}", url);

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status();
        debug!("Webhook answered {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Webhook rejected request with {}: {}", status, body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;
        debug!("Webhook raw response ({} bytes): {}", text.len(), text);

        let endpoint = self.webhook_url.to_string();
        if text.trim().is_empty() {
            return Err(ClientError::EmptyResponse(endpoint));
        }

        let reply: WebhookReply =
            serde_json::from_str(&text).map_err(|_| ClientError::InvalidJson {
                url: endpoint,
                snippet: text.chars().take(SNIPPET_LEN).collect(),
            })?;

        let job_id = reply.job_id()?;
        info!("Analysis accepted as job {}", job_id);
        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Strategy;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpWebhookClient {
        let config = ApiConfig {
            webhook_url: format!("{}/webhook/production", server.uri()),
            timeout_seconds: 2,
            ..ApiConfig::default()
        };
        HttpWebhookClient::new(&config).unwrap()
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(
            "https://www.rightmove.co.uk/properties/123?channel=RES_BUY",
            Strategy::Btl,
            "7% yield",
        )
    }

    #[test]
    fn test_invalid_webhook_url() {
        let config = ApiConfig {
            webhook_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            HttpWebhookClient::new(&config),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_request_url_encodes_listing_url() {
        let client = HttpWebhookClient::new(&ApiConfig::default()).unwrap();
        let url = client.request_url(&request());
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0].0, "url");
        assert_eq!(
            pairs[0].1,
            "https://www.rightmove.co.uk/properties/123?channel=RES_BUY"
        );
        assert_eq!(pairs[1], ("strategy".to_string(), "btl".to_string()));
        assert_eq!(pairs[2], ("goal".to_string(), "7% yield".to_string()));
        assert!(!url.as_str().contains("?channel"));
    }

    #[tokio::test]
    async fn test_submit_returns_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webhook/production"))
            .and(query_param("strategy", "btl"))
            .and(query_param("goal", "7% yield"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unique_id": "abc123"})))
            .expect(1)
            .mount(&server)
            .await;

        let job_id = assert_ok!(client_for(&server).submit(&request()).await);
        assert_eq!(job_id.as_str(), "abc123");
    }

    #[tokio::test]
    async fn test_submit_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = assert_err!(client_for(&server).submit(&request()).await);
        assert!(matches!(err, ClientError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn test_submit_invalid_json_quotes_snippet() {
        let server = MockServer::start().await;
        let body = "x".repeat(250);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        match client_for(&server).submit(&request()).await {
            Err(ClientError::InvalidJson { snippet, .. }) => assert_eq!(snippet.len(), 100),
            other => panic!("expected InvalidJson, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_missing_unique_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let err = assert_err!(client_for(&server).submit(&request()).await);
        assert!(matches!(err, ClientError::MissingJobId));
    }

    #[tokio::test]
    async fn test_submit_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = assert_err!(client_for(&server).submit(&request()).await);
        assert!(matches!(err, ClientError::Status { status: 500, .. }));
    }
}
