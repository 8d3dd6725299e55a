//! Error types for the remote clients and the status poller.

use thiserror::Error;

/// Failures talking to the webhook or the status endpoint.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("empty response received from {0}")]
    EmptyResponse(String),

    #[error("invalid JSON response from {url}. Response: {snippet}...")]
    InvalidJson { url: String, snippet: String },

    #[error("response missing unique_id")]
    MissingJobId,

    #[error("job id must be non-empty and contain only letters, digits, '-' or '_'")]
    InvalidJobId,

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

/// Terminal failure of a polling session, delivered through `on_error`.
#[derive(Debug, Error)]
pub enum PollError {
    /// The status check itself failed.
    #[error("failed to check analysis status: {0}")]
    Transport(#[from] ClientError),

    /// The remote side reported the analysis as failed.
    #[error("{0}")]
    Remote(String),

    /// Attempt budget exhausted without a terminal status.
    #[error("polling timeout exceeded after {attempts} attempts")]
    Timeout { attempts: u32 },
}

/// Fallback message when the remote reports `error` without details.
pub const GENERIC_REMOTE_ERROR: &str = "Analysis failed";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ClientError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 503");

        let err = PollError::Remote("boom".to_string());
        assert_eq!(err.to_string(), "boom");

        let err = PollError::Timeout { attempts: 60 };
        assert!(err.to_string().contains("60 attempts"));

        let err = PollError::from(ClientError::Timeout(10));
        assert!(matches!(err, PollError::Transport(ClientError::Timeout(10))));
    }
}
