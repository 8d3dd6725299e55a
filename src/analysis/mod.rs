//! Analysis workflow.
//!
//! Ties the webhook submission and the status poller together into the
//! submit-then-wait flow behind the `analyze` and `watch` commands.

pub mod workflow;

pub use workflow::{submit_and_wait, wait_for_report, AnalysisOutcome, WaitOptions};
