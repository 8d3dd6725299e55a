//! Submit an analysis and wait for its report.

use crate::client::WebhookClient;
use crate::error::PollError;
use crate::models::{AnalysisRequest, JobId, StatusReport};
use crate::poller::AnalysisPoller;
use crate::report::completed_report_url;
use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// How to wait for a report.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Delay between status checks.
    pub interval: Duration,
    /// Report page template with a `{job_id}` placeholder.
    pub report_url_template: String,
    /// Show a spinner while waiting.
    pub show_progress: bool,
}

/// Result of waiting on one job.
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// The report is ready.
    Ready {
        job_id: JobId,
        report_url: String,
        report: StatusReport,
    },
    /// The analysis failed or timed out.
    Failed { job_id: JobId, error: PollError },
    /// Waiting was cancelled by the caller.
    Cancelled { job_id: JobId },
}

impl AnalysisOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalysisOutcome::Ready { .. } => 0,
            AnalysisOutcome::Failed { .. } => 2,
            AnalysisOutcome::Cancelled { .. } => 1,
        }
    }
}

type OutcomeSender = Arc<Mutex<Option<oneshot::Sender<Result<StatusReport, PollError>>>>>;

fn deliver(sender: &OutcomeSender, outcome: Result<StatusReport, PollError>) {
    let sender = sender
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    if let Some(sender) = sender {
        let _ = sender.send(outcome);
    }
}

fn spinner(job_id: &JobId) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Working on the deal (job {})...", job_id));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Poll `job_id` until it reaches a terminal outcome or `cancel` resolves.
pub async fn wait_for_report<F>(
    poller: &AnalysisPoller,
    job_id: JobId,
    options: &WaitOptions,
    cancel: F,
) -> Result<AnalysisOutcome>
where
    F: Future<Output = ()>,
{
    let (tx, rx) = oneshot::channel();
    let tx: OutcomeSender = Arc::new(Mutex::new(Some(tx)));
    let err_tx = Arc::clone(&tx);

    let started = poller.start_polling_with_interval(
        job_id.clone(),
        move |report| deliver(&tx, Ok(report)),
        move |err| deliver(&err_tx, Err(err)),
        options.interval,
    );
    if !started {
        bail!("Another analysis is already being tracked");
    }

    let progress = options.show_progress.then(|| spinner(&job_id));

    let received = tokio::select! {
        biased;
        outcome = rx => Some(outcome),
        _ = cancel => None,
    };

    let outcome = match received {
        None => {
            warn!("Cancelled while waiting for job {}", job_id);
            poller.stop_polling();
            if let Some(pb) = progress {
                pb.abandon_with_message("Cancelled");
            }
            return Ok(AnalysisOutcome::Cancelled { job_id });
        }
        Some(outcome) => {
            outcome.map_err(|_| anyhow!("Polling for job {} ended without a result", job_id))?
        }
    };

    match outcome {
        Ok(report) => {
            let report_url =
                completed_report_url(&options.report_url_template, &job_id, &report);
            info!("Report for job {} is ready at {}", job_id, report_url);
            if let Some(pb) = progress {
                pb.finish_with_message("Deal ready!");
            }
            Ok(AnalysisOutcome::Ready {
                job_id,
                report_url,
                report,
            })
        }
        Err(error) => {
            if let Some(pb) = progress {
                pb.abandon_with_message("Analysis failed");
            }
            Ok(AnalysisOutcome::Failed { job_id, error })
        }
    }
}

/// Submit `request` to the webhook, then wait for the resulting report.
pub async fn submit_and_wait<F>(
    webhook: &dyn WebhookClient,
    poller: &AnalysisPoller,
    request: &AnalysisRequest,
    options: &WaitOptions,
    cancel: F,
) -> Result<AnalysisOutcome>
where
    F: Future<Output = ()>,
{
    let job_id = webhook
        .submit(request)
        .await
        .context("Failed to start analysis")?;

    wait_for_report(poller, job_id, options, cancel).await
}
