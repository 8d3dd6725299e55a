//! Status polling for a submitted analysis.
//!
//! An [`AnalysisPoller`] owns at most one polling session at a time. A
//! session checks the job status immediately, then once per interval, until
//! the report is available, the remote side reports an error, a status check
//! fails, or the attempt budget runs out. Exactly one of the two callbacks
//! handed to [`AnalysisPoller::start_polling`] fires per session, and never
//! after [`AnalysisPoller::stop_polling`].

use crate::client::StatusClient;
use crate::error::{ClientError, PollError, GENERIC_REMOTE_ERROR};
use crate::models::{JobId, PollState, StatusReport, StatusTag};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Default delay between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default number of status checks per session.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Default bound on a single status check.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Tuning knobs for a poller.
#[derive(Debug, Clone)]
pub struct PollerOptions {
    /// Status checks per session before the session times out.
    pub max_attempts: u32,
    /// Upper bound on one status check.
    pub request_timeout: Duration,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl From<&crate::config::Config> for PollerOptions {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            max_attempts: config.polling.max_attempts,
            request_timeout: config.api.timeout(),
        }
    }
}

/// Mutable state shared between the poller handle and its session task.
#[derive(Debug, Default)]
struct Session {
    state: PollState,
    /// Bumped on every start and stop; a task only acts while it matches.
    generation: u64,
    attempts: u32,
    task: Option<JoinHandle<()>>,
}

/// How a session ended.
enum Outcome {
    Completed(StatusReport),
    Failed(PollError),
    TimedOut(PollError),
}

impl Outcome {
    fn state(&self) -> PollState {
        match self {
            Outcome::Completed(_) => PollState::Completed,
            Outcome::Failed(_) => PollState::Failed,
            Outcome::TimedOut(_) => PollState::TimedOut,
        }
    }
}

/// Drives repeated status checks for one job until a terminal outcome.
pub struct AnalysisPoller {
    client: Arc<dyn StatusClient>,
    options: PollerOptions,
    session: Arc<Mutex<Session>>,
}

impl AnalysisPoller {
    /// Create an idle poller.
    pub fn new(client: Arc<dyn StatusClient>, options: PollerOptions) -> Self {
        info!(
            "Analysis poller initialized (max {} attempts)",
            options.max_attempts
        );
        Self {
            client,
            options,
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    /// Start polling `job_id` at the default interval.
    ///
    /// See [`start_polling_with_interval`](Self::start_polling_with_interval).
    #[allow(dead_code)] // The CLI always passes its configured interval
    pub fn start_polling<C, E>(&self, job_id: JobId, on_complete: C, on_error: E) -> bool
    where
        C: FnOnce(StatusReport) + Send + 'static,
        E: FnOnce(PollError) + Send + 'static,
    {
        self.start_polling_with_interval(job_id, on_complete, on_error, DEFAULT_POLL_INTERVAL)
    }

    /// Start polling `job_id`, checking once immediately and then every `interval`.
    ///
    /// Returns `false` without touching the running session if one is
    /// already active. Must be called from within a Tokio runtime.
    pub fn start_polling_with_interval<C, E>(
        &self,
        job_id: JobId,
        on_complete: C,
        on_error: E,
        interval: Duration,
    ) -> bool
    where
        C: FnOnce(StatusReport) + Send + 'static,
        E: FnOnce(PollError) + Send + 'static,
    {
        let mut session = self.lock();

        if session.state == PollState::Polling {
            warn!(
                "Polling already in progress, ignoring request for job {}",
                job_id
            );
            return false;
        }

        if session.state.is_terminal() {
            debug!("Previous session ended as {}, starting fresh", session.state);
        }

        session.generation += 1;
        session.attempts = 0;
        session.state = PollState::Polling;

        let interval = interval.max(Duration::from_millis(1));
        info!(
            "Starting to poll job {} every {}ms",
            job_id,
            interval.as_millis()
        );

        let task = tokio::spawn(run_session(
            Arc::clone(&self.client),
            Arc::clone(&self.session),
            session.generation,
            job_id,
            interval,
            self.options.clone(),
            on_complete,
            on_error,
        ));
        session.task = Some(task);

        true
    }

    /// Cancel the active session, if any, and return to `Idle`.
    ///
    /// Pending timers and an in-flight status check are dropped; neither
    /// callback fires afterwards. A no-op when nothing is polling.
    pub fn stop_polling(&self) {
        let mut session = self.lock();

        if session.state != PollState::Polling {
            debug!("No active polling to stop (state: {})", session.state);
            return;
        }

        session.generation += 1;
        session.state = PollState::Idle;
        if let Some(task) = session.task.take() {
            task.abort();
        }
        info!("Polling stopped after {} attempts", session.attempts);
    }

    /// Whether a session is currently running.
    pub fn is_polling_active(&self) -> bool {
        self.lock().state == PollState::Polling
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PollState {
        self.lock().state
    }

    /// Status checks issued by the current (or most recent) session.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        lock_session(&self.session)
    }
}

impl Drop for AnalysisPoller {
    fn drop(&mut self) {
        let mut session = self.lock();
        session.generation += 1;
        if let Some(task) = session.task.take() {
            task.abort();
        }
    }
}

fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Count one attempt, unless the session has been superseded.
fn begin_attempt(session: &Mutex<Session>, generation: u64) -> Option<u32> {
    let mut session = lock_session(session);
    if session.generation != generation {
        return None;
    }
    session.attempts += 1;
    Some(session.attempts)
}

/// Move to a terminal state, unless the session has been superseded.
fn finish(session: &Mutex<Session>, generation: u64, state: PollState) -> bool {
    let mut session = lock_session(session);
    if session.generation != generation {
        return false;
    }
    session.state = state;
    // Detach: this task is the one holding the handle.
    session.task = None;
    true
}

#[allow(clippy::too_many_arguments)]
async fn run_session<C, E>(
    client: Arc<dyn StatusClient>,
    session: Arc<Mutex<Session>>,
    generation: u64,
    job_id: JobId,
    interval: Duration,
    options: PollerOptions,
    on_complete: C,
    on_error: E,
) where
    C: FnOnce(StatusReport) + Send + 'static,
    E: FnOnce(PollError) + Send + 'static,
{
    let max_attempts = options.max_attempts.max(1);
    let mut ticker = tokio::time::interval(interval);
    // Next check is scheduled only after the previous one resolved.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let outcome = loop {
        ticker.tick().await;

        let attempt = match begin_attempt(&session, generation) {
            Some(attempt) => attempt,
            None => return,
        };
        info!(
            "Checking status of job {} (attempt {}/{})",
            job_id, attempt, max_attempts
        );

        let result =
            match tokio::time::timeout(options.request_timeout, client.fetch_status(&job_id))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout(options.request_timeout.as_secs())),
            };

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!("Error checking status of job {}: {}", job_id, e);
                break Outcome::Failed(PollError::Transport(e));
            }
        };

        match report.status() {
            StatusTag::Available => {
                info!("Analysis for job {} completed", job_id);
                break Outcome::Completed(report);
            }
            StatusTag::Error => {
                let message = report
                    .error
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_REMOTE_ERROR.to_string());
                error!("Analysis for job {} failed: {}", job_id, message);
                break Outcome::Failed(PollError::Remote(message));
            }
            StatusTag::Generating => {
                info!("Job {} still generating", job_id);
            }
            StatusTag::Empty => {
                info!("No status yet for job {}", job_id);
            }
            StatusTag::Other(tag) => {
                warn!("Unknown status '{}' received for job {}", tag, job_id);
            }
        }

        if attempt >= max_attempts {
            error!(
                "Polling timeout exceeded for job {} after {} attempts",
                job_id, attempt
            );
            break Outcome::TimedOut(PollError::Timeout { attempts: attempt });
        }
    };

    if !finish(&session, generation, outcome.state()) {
        debug!("Discarding stale result for job {}", job_id);
        return;
    }

    match outcome {
        Outcome::Completed(report) => on_complete(report),
        Outcome::Failed(err) | Outcome::TimedOut(err) => on_error(err),
    }
}
