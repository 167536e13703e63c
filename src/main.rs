#![forbid(unsafe_code)]

//! `task-funnel` server binary.
//!
//! Bootstraps configuration and credentials, then runs the three
//! ingestion paths: the email polling loop, the webhook HTTP listener,
//! and the Slack Socket Mode listener.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use task_funnel::agent::TaskAgent;
use task_funnel::config::GlobalConfig;
use task_funnel::pipeline::AppState;
use task_funnel::sink::NotionSink;
use task_funnel::slack::client::SlackService;
use task_funnel::{mail, webhook, AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "task-funnel", about = "Multi-channel task capture", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("task-funnel bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration and secrets ──────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;

    // Missing credentials are a configuration error, fatal at startup.
    config.load_credentials().await?;

    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Build the stateless adapters ────────────────────
    let agent = TaskAgent::new(&config.agent);
    let sink = NotionSink::new(&config.notion)?;
    let (slack_service, slack_queue_task) = SlackService::connect(&config.slack)?;
    let slack = Arc::new(slack_service);

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        agent,
        sink,
        slack: Some(Arc::clone(&slack)),
    });

    // ── Start the three ingestion paths ─────────────────
    let ct = CancellationToken::new();

    let mail_handle = tokio::spawn(mail::poller::run(Arc::clone(&state), ct.clone()));

    let webhook_state = Arc::clone(&state);
    let webhook_ct = ct.clone();
    let webhook_handle = tokio::spawn(async move {
        if let Err(err) = webhook::serve(webhook_state, webhook_ct).await {
            error!(%err, "webhook listener failed");
        }
    });

    let socket_task = slack.start_socket_mode(Arc::clone(&state));

    info!("task-funnel ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    // Socket Mode and the sender queue have no cancellation hook.
    socket_task.abort();
    slack_queue_task.abort();

    let _ = tokio::join!(mail_handle, webhook_handle);
    info!("task-funnel shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
