//! Homework Bot - homework review status notifier.
//!
//! This binary polls the homework status endpoint and announces review status
//! changes in a Telegram chat until it receives SIGINT or SIGTERM.
//!
//! # Environment Variables
//!
//! See the [`config`](homework_bot::config) module for available configuration options.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use homework_bot::config::{Config, ConfigError};
use homework_bot::fetcher::PracticumClient;
use homework_bot::notifier::TelegramMessenger;
use homework_bot::poller::PollLoop;
use homework_bot::types::initial_cursor;

fn main() -> Result<ExitCode> {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            report_config_error(&err);
            return Ok(ExitCode::from(1));
        }
    };

    // The loop is strictly sequential, one thread is all it needs.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run_bot(config))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the collaborators and runs the poll loop until shutdown.
async fn run_bot(config: Config) -> Result<()> {
    info!(
        endpoint = %config.endpoint,
        chat_id = %config.telegram_chat_id,
        interval_secs = config.poll_interval.as_secs(),
        lookback_days = config.lookback_days,
        "Starting Homework Bot"
    );

    let source = PracticumClient::new(config.endpoint.clone(), &config.practicum_token)
        .context("Failed to create status endpoint client")?;

    let messenger = TelegramMessenger::new(
        config.telegram_api_url.clone(),
        config.telegram_token.clone(),
        config.telegram_chat_id.clone(),
    )
    .context("Failed to create Telegram client")?;

    let mut poll_loop = PollLoop::new(
        source,
        messenger,
        initial_cursor(config.lookback_days),
        config.poll_interval,
    );

    poll_loop.run(shutdown_signal()).await;

    info!("Homework Bot stopped");
    Ok(())
}

/// Logs a configuration failure, naming the offending variable.
fn report_config_error(err: &ConfigError) {
    match err {
        ConfigError::MissingEnvVar(name) => {
            error!(
                variable = %name,
                "Missing required environment variable, shutting down"
            );
        }
        ConfigError::InvalidValue { key, message } => {
            error!(variable = %key, reason = %message, "Invalid environment variable, shutting down");
        }
    }

    eprintln!("Error: {err}");
    eprintln!();
    eprintln!("Required environment variables:");
    eprintln!("  PRACTICUM_TOKEN   - OAuth token for the homework status API");
    eprintln!("  TELEGRAM_TOKEN    - Telegram bot token");
    eprintln!("  TELEGRAM_CHAT_ID  - Chat that receives notifications");
}

/// Initializes the logging subsystem.
///
/// Uses `RUST_LOG` for filtering (default `info`). Setting
/// `HOMEWORK_LOG_FORMAT=json` switches to JSON output.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("HOMEWORK_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_level(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
