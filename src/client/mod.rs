//! HTTP clients for the analysis backend.
//!
//! The webhook accepts new analysis requests; the status endpoint reports
//! progress of an accepted job.

pub mod status;
pub mod webhook;

pub use status::{HttpStatusClient, StatusClient};
pub use webhook::{HttpWebhookClient, WebhookClient};

use crate::error::ClientError;
use std::time::Duration;

/// Build the shared reqwest client with a per-request timeout.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("dealwizard/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Map a transport error, singling out timeouts.
pub(crate) fn map_send_error(e: reqwest::Error, timeout: Duration) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(timeout.as_secs())
    } else {
        ClientError::Http(e)
    }
}
