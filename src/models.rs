//! Data models for the deal analysis workflow.
//!
//! This module contains the core data structures shared by the
//! webhook submission, status polling, and settings layers.

use crate::error::ClientError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque identifier assigned by the remote system to an accepted analysis request.
///
/// A `JobId` is never empty and only holds ASCII letters, digits, `-` and
/// `_`, so it can be placed in a URL path as is. Construct one with
/// [`JobId::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a job id, rejecting blank input and characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn new(id: impl Into<String>) -> Result<Self, ClientError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty()
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ClientError::InvalidJobId);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Investment strategy the analysis is run under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Buy, renovate, resell
    Flip,
    /// Buy to let
    Btl,
    /// House in multiple occupation
    Hmo,
}

impl Strategy {
    /// Wire value sent to the webhook.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Flip => "flip",
            Strategy::Btl => "btl",
            Strategy::Hmo => "hmo",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Flip => write!(f, "FLIP"),
            Strategy::Btl => write!(f, "BTL"),
            Strategy::Hmo => write!(f, "HMO"),
        }
    }
}

/// Everything the webhook needs to kick off an analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    /// Listing page URL.
    pub url: String,
    /// Selected strategy.
    pub strategy: Strategy,
    /// Free-form investment goal, may be empty.
    pub goal: String,
    /// Submission time.
    pub timestamp: DateTime<Utc>,
}

impl AnalysisRequest {
    /// Build a request stamped with the current time.
    pub fn new(url: impl Into<String>, strategy: Strategy, goal: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            strategy,
            goal: goal.into(),
            timestamp: Utc::now(),
        }
    }

    /// Query parameters in the order the webhook expects them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("url", self.url.clone()),
            ("strategy", self.strategy.as_str().to_string()),
            ("goal", self.goal.clone()),
            ("timestamp", self.timestamp.to_rfc3339()),
        ]
    }
}

/// Body returned by the webhook once a request is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookReply {
    #[serde(default)]
    pub unique_id: Option<Value>,
}

impl WebhookReply {
    /// Extract the job id, accepting string or numeric ids.
    pub fn job_id(&self) -> Result<JobId, ClientError> {
        let raw = match &self.unique_id {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ClientError::MissingJobId),
        };
        JobId::new(raw).map_err(|_| ClientError::MissingJobId)
    }
}

/// Remote-reported state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTag {
    /// No status yet (absent or empty tag).
    Empty,
    /// Report is being generated.
    Generating,
    /// Report is ready.
    Available,
    /// Generation failed remotely.
    Error,
    /// Any tag this client doesn't know about.
    Other(String),
}

impl From<Option<&str>> for StatusTag {
    fn from(tag: Option<&str>) -> Self {
        match tag {
            None | Some("") => StatusTag::Empty,
            Some("generating") => StatusTag::Generating,
            Some("available") => StatusTag::Available,
            Some("error") => StatusTag::Error,
            Some(other) => StatusTag::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusTag::Empty => write!(f, "unknown"),
            StatusTag::Generating => write!(f, "generating"),
            StatusTag::Available => write!(f, "available"),
            StatusTag::Error => write!(f, "error"),
            StatusTag::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Keys that may carry the identifier of a generated report, in lookup order.
const RESULT_REFERENCE_KEYS: [&str; 4] = ["_id", "unique_id", "uniqueId", "id"];

/// Status payload for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Raw status tag.
    #[serde(
        rename = "reportstatus_text",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_text: Option<String>,
    /// Remote error message, set alongside the `error` tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every other field of the remote object.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StatusReport {
    /// Convenience constructor used by mocks and tests.
    #[allow(dead_code)] // Used by test doubles
    pub fn with_status(status: &str) -> Self {
        Self {
            status_text: Some(status.to_string()),
            ..Self::default()
        }
    }

    /// Interpreted status tag.
    pub fn status(&self) -> StatusTag {
        StatusTag::from(self.status_text.as_deref())
    }

    /// Identifier of the generated report, if the payload carries one.
    pub fn result_reference(&self) -> Option<String> {
        RESULT_REFERENCE_KEYS.iter().find_map(|key| {
            match self.fields.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            }
        })
    }
}

/// Envelope around the status object; `response` may be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEnvelope {
    #[serde(default)]
    pub response: Option<StatusReport>,
}

impl StatusEnvelope {
    /// Unwrap the report, treating a missing `response` as "no status yet".
    pub fn into_report(self) -> StatusReport {
        self.response.unwrap_or_default()
    }
}

/// Lifecycle state of an [`AnalysisPoller`](crate::poller::AnalysisPoller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Idle,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl PollState {
    /// Whether this state ends a polling session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Completed | PollState::Failed | PollState::TimedOut
        )
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Idle => write!(f, "idle"),
            PollState::Polling => write!(f, "polling"),
            PollState::Completed => write!(f, "completed"),
            PollState::Failed => write!(f, "failed"),
            PollState::TimedOut => write!(f, "timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_id_rejects_blank() {
        assert!(JobId::new("").is_err());
        assert!(JobId::new("   ").is_err());
        assert_eq!(JobId::new(" abc123 ").unwrap().as_str(), "abc123");
    }

    #[test]
    fn test_job_id_is_path_safe() {
        assert_eq!(
            JobId::new("1700000000000x123").unwrap().as_str(),
            "1700000000000x123"
        );
        assert!(JobId::new("job-1_a").is_ok());
        assert!(JobId::new("a/b?x=1").is_err());
        assert!(JobId::new("a b").is_err());
        assert!(JobId::new("../etc").is_err());
        assert!("a%2Fb".parse::<JobId>().is_err());
    }

    #[test]
    fn test_status_tag_from_str() {
        assert_eq!(StatusTag::from(None), StatusTag::Empty);
        assert_eq!(StatusTag::from(Some("")), StatusTag::Empty);
        assert_eq!(StatusTag::from(Some("generating")), StatusTag::Generating);
        assert_eq!(StatusTag::from(Some("available")), StatusTag::Available);
        assert_eq!(StatusTag::from(Some("error")), StatusTag::Error);
        assert_eq!(
            StatusTag::from(Some("queued")),
            StatusTag::Other("queued".to_string())
        );
        // Tags are compared verbatim.
        assert_eq!(
            StatusTag::from(Some(" available")),
            StatusTag::Other(" available".to_string())
        );
        assert_eq!(
            StatusTag::from(Some("Available")),
            StatusTag::Other("Available".to_string())
        );
    }

    #[test]
    fn test_envelope_without_response_is_empty() {
        let envelope: StatusEnvelope = serde_json::from_value(json!({})).unwrap();
        let report = envelope.into_report();
        assert_eq!(report.status(), StatusTag::Empty);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_status_report_parsing() {
        let envelope: StatusEnvelope = serde_json::from_value(json!({
            "response": {
                "reportstatus_text": "error",
                "error": "boom",
                "_id": "1700000000x42"
            }
        }))
        .unwrap();
        let report = envelope.into_report();
        assert_eq!(report.status(), StatusTag::Error);
        assert_eq!(report.error.as_deref(), Some("boom"));
        assert_eq!(report.result_reference().as_deref(), Some("1700000000x42"));
    }

    #[test]
    fn test_result_reference_order() {
        let report: StatusReport = serde_json::from_value(json!({
            "reportstatus_text": "available",
            "id": "abc123",
            "_id": "internal"
        }))
        .unwrap();
        assert_eq!(report.result_reference().as_deref(), Some("internal"));

        let report: StatusReport = serde_json::from_value(json!({
            "reportstatus_text": "available",
            "unique_id": "run-77",
            "_id": "1700x1"
        }))
        .unwrap();
        assert_eq!(report.result_reference().as_deref(), Some("1700x1"));

        let report: StatusReport =
            serde_json::from_value(json!({"reportstatus_text": "available", "id": "abc123"}))
                .unwrap();
        assert_eq!(report.result_reference().as_deref(), Some("abc123"));

        assert!(StatusReport::with_status("available")
            .result_reference()
            .is_none());
    }

    #[test]
    fn test_webhook_reply_job_id() {
        let reply: WebhookReply =
            serde_json::from_value(json!({"unique_id": "job-1", "extra": true})).unwrap();
        assert_eq!(reply.job_id().unwrap().as_str(), "job-1");

        let reply: WebhookReply = serde_json::from_value(json!({"unique_id": 42})).unwrap();
        assert_eq!(reply.job_id().unwrap().as_str(), "42");

        let reply: WebhookReply = serde_json::from_value(json!({"other": 1})).unwrap();
        assert!(matches!(reply.job_id(), Err(ClientError::MissingJobId)));

        let reply: WebhookReply = serde_json::from_value(json!({"unique_id": ""})).unwrap();
        assert!(matches!(reply.job_id(), Err(ClientError::MissingJobId)));
    }

    #[test]
    fn test_strategy_display_and_wire_value() {
        assert_eq!(Strategy::Btl.to_string(), "BTL");
        assert_eq!(Strategy::Hmo.as_str(), "hmo");
    }

    #[test]
    fn test_query_pairs() {
        let request = AnalysisRequest::new("https://example.com/listing/1", Strategy::Flip, "");
        let pairs = request.query_pairs();
        assert_eq!(pairs[0], ("url", "https://example.com/listing/1".to_string()));
        assert_eq!(pairs[1], ("strategy", "flip".to_string()));
        assert_eq!(pairs[2], ("goal", String::new()));
        assert_eq!(pairs[3].0, "timestamp");
    }

    #[test]
    fn test_poll_state_terminal() {
        assert!(!PollState::Idle.is_terminal());
        assert!(!PollState::Polling.is_terminal());
        assert!(PollState::Completed.is_terminal());
        assert!(PollState::Failed.is_terminal());
        assert!(PollState::TimedOut.is_terminal());
    }
}
