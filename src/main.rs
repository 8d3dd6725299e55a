//! Deal Wizard - property investment analysis client
//!
//! Submits a listing URL with the chosen strategy and goal to the analysis
//! webhook, then polls the status endpoint until the report is ready.
//!
//! Exit codes:
//!   0 - Success (report ready, or command completed)
//!   1 - Runtime error (connection, config, invalid input, cancelled)
//!   2 - Analysis failed remotely or timed out

mod analysis;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod poller;
mod report;
mod settings;

use analysis::{AnalysisOutcome, WaitOptions};
use anyhow::{Context, Result};
use cli::{Args, Command, GoalAction, StrategyAction};
use client::{HttpStatusClient, HttpWebhookClient, StatusClient, WebhookClient};
use config::Config;
use models::{AnalysisRequest, JobId, Strategy};
use poller::{AnalysisPoller, PollerOptions};
use settings::SettingsStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Deal Wizard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .dealwizard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    println!("   Edit it to point at your webhook and status endpoints.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch a subcommand. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let store = SettingsStore::new(config.general.settings_path.clone());
    debug!("Settings file: {}", store.path().display());

    match args.command.clone() {
        Command::Analyze {
            url,
            strategy,
            goal,
            no_wait,
        } => run_analyze(&config, &store, &args, url, strategy, goal, no_wait).await,
        Command::Watch { job_id } => run_watch(&config, &args, job_id).await,
        Command::Status { job_id, json } => run_status(&config, job_id, json).await,
        Command::Strategy { action } => run_strategy(&store, action),
        Command::Goal { action } => run_goal(&store, action),
        Command::InitConfig => handle_init_config().map(|_| 0),
    }
}

/// Build a poller over the HTTP status client.
fn build_poller(config: &Config) -> Result<AnalysisPoller> {
    let status_client =
        HttpStatusClient::new(&config.api).context("Failed to create status client")?;
    Ok(AnalysisPoller::new(
        Arc::new(status_client),
        PollerOptions::from(config),
    ))
}

fn wait_options(config: &Config, args: &Args) -> WaitOptions {
    WaitOptions {
        interval: config.polling.interval(),
        report_url_template: config.api.report_url.clone(),
        show_progress: !args.quiet,
    }
}

/// Resolves on Ctrl-C; never resolves if the handler can't be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_analyze(
    config: &Config,
    store: &SettingsStore,
    args: &Args,
    url: String,
    strategy: Option<Strategy>,
    goal: Option<String>,
    no_wait: bool,
) -> Result<i32> {
    let saved = store.load()?;

    let strategy = match strategy.or(saved.selected_strategy) {
        Some(strategy) => strategy,
        None => {
            eprintln!("⚠️  Please select a strategy (FLIP, BTL, or HMO) first.");
            eprintln!("   Use --strategy or `dealwizard strategy set <STRATEGY>`.");
            return Ok(1);
        }
    };
    let goal = goal.or(saved.investment_goal).unwrap_or_default();

    let request = AnalysisRequest::new(url, strategy, goal);
    let webhook = HttpWebhookClient::new(&config.api).context("Failed to create webhook client")?;

    println!("🧙 Analyzing {} with the {} strategy", request.url, strategy);
    if !request.goal.is_empty() {
        println!("   Goal: {}", request.goal);
    }

    if let Err(e) = store.touch() {
        warn!("Failed to update settings: {:#}", e);
    }

    if no_wait {
        let job_id = webhook
            .submit(&request)
            .await
            .context("Failed to start analysis")?;
        println!("✅ Submitted. Job id: {}", job_id);
        println!("   Run `dealwizard watch {}` to wait for the report.", job_id);
        return Ok(0);
    }

    println!("⏳ I'm working on the deal... Give me about two minutes...\n");
    let poller = build_poller(config)?;
    let outcome = analysis::submit_and_wait(
        &webhook,
        &poller,
        &request,
        &wait_options(config, args),
        ctrl_c(),
    )
    .await?;

    Ok(print_outcome(&outcome))
}

async fn run_watch(config: &Config, args: &Args, job_id: JobId) -> Result<i32> {
    println!("⏳ Waiting for the report of job {}...\n", job_id);
    let poller = build_poller(config)?;
    let outcome =
        analysis::wait_for_report(&poller, job_id, &wait_options(config, args), ctrl_c()).await?;
    Ok(print_outcome(&outcome))
}

async fn run_status(config: &Config, job_id: JobId, json: bool) -> Result<i32> {
    let client = HttpStatusClient::new(&config.api).context("Failed to create status client")?;
    let report = client
        .fetch_status(&job_id)
        .await
        .with_context(|| format!("Failed to check status of job {}", job_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(0);
    }

    println!("📋 Job {}: {}", job_id, report.status());
    if let Some(ref message) = report.error {
        println!("   Error: {}", message);
    }
    if report.status() == models::StatusTag::Available {
        println!(
            "   Report: {}",
            crate::report::completed_report_url(&config.api.report_url, &job_id, &report)
        );
    }
    Ok(0)
}

fn run_strategy(store: &SettingsStore, action: Option<StrategyAction>) -> Result<i32> {
    match action.unwrap_or(StrategyAction::Show) {
        StrategyAction::Set { strategy } => {
            store.save_strategy(strategy)?;
            println!("✅ Strategy set to {}", strategy);
        }
        StrategyAction::Clear => {
            store.clear_strategy()?;
            println!("✅ Strategy cleared");
        }
        StrategyAction::Show => match store.load()?.selected_strategy {
            Some(strategy) => println!("{}", strategy),
            None => println!("(no strategy selected)"),
        },
    }
    Ok(0)
}

fn run_goal(store: &SettingsStore, action: Option<GoalAction>) -> Result<i32> {
    match action.unwrap_or(GoalAction::Show) {
        GoalAction::Set { goal } => {
            let settings = store.save_goal(&goal)?;
            match settings.investment_goal {
                Some(goal) => println!("✅ Goal set to: {}", goal),
                None => println!("✅ Goal cleared"),
            }
        }
        GoalAction::Clear => {
            store.clear_goal()?;
            println!("✅ Goal cleared");
        }
        GoalAction::Show => match store.load()?.investment_goal {
            Some(goal) => println!("{}", goal),
            None => println!("(no goal set)"),
        },
    }
    Ok(0)
}

/// Print the user-facing result of waiting on a job and return its exit code.
fn print_outcome(outcome: &AnalysisOutcome) -> i32 {
    match outcome {
        AnalysisOutcome::Ready {
            job_id,
            report_url,
            report,
        } => {
            debug!("Final status payload: {:?}", report);
            println!("\n✅ Deal ready! (job {})", job_id);
            println!("   Open your report: {}", report_url);
        }
        AnalysisOutcome::Failed { job_id, error } => {
            eprintln!("\n⛔ Analysis failed for job {}: {}", job_id, error);
            eprintln!("   Please try again.");
        }
        AnalysisOutcome::Cancelled { job_id } => {
            eprintln!("\n⚠️  Stopped waiting for job {}.", job_id);
            eprintln!("   Resume with `dealwizard watch {}`.", job_id);
        }
    }
    outcome.exit_code()
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
