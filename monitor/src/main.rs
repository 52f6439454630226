//! void-mc Monitor - Minecraft server log and status watcher.
//!
//! This binary follows the server log and polls the server's status,
//! announcing player activity and outages in Discord.
//!
//! # Commands
//!
//! - `void-monitor run [--json-logs]`: Start both monitoring loops
//! - `void-monitor status`: Query the server once and print a summary
//! - `void-monitor deaths`: Print the death leaderboard
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use void_monitor::activity::{ActivityWatcherConfig, PlayerActivityWatcher};
use void_monitor::config::Config;
use void_monitor::counters::CounterStore;
use void_monitor::dispatch::NotificationDispatcher;
use void_monitor::messaging::DiscordClient;
use void_monitor::status::{
    render_status_summary, StatusPoller, StatusPollerConfig, StatusProvider, TcpStatusProvider,
};
use void_monitor::tailer::LogTailer;
use void_monitor::types::ServerStatus;
use void_monitor::utils::stop_signal;

/// Time allowed for the loops to finish their in-flight tick on shutdown.
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// void-mc Monitor - Minecraft server log and status watcher.
///
/// Follows the Minecraft server log and status, and posts joins, leaves,
/// deaths and outages to Discord.
#[derive(Parser, Debug)]
#[command(name = "void-monitor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    DISCORD_TOKEN              Discord bot token (required for 'run')
    SERVER_IP                  Minecraft server host (required)
    MINECRAFT_PORT             Minecraft server port (default: 25565)
    STATUS_CHANNEL_ID          Channel for outage broadcasts (default: 0, disabled)
    PLAYER_EVENTS_CHANNEL_ID   Channel for player events (default: 0, disabled)
    SERVER_LOG_PATH            Server log (default: logs/latest.log)
    DEATH_COUNTS_PATH          Death counter file

EXAMPLES:
    # Start monitoring
    export DISCORD_TOKEN=... SERVER_IP=mc.example.com
    void-monitor run

    # Check the server once
    void-monitor status
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the log watcher and status poller.
    ///
    /// Runs until interrupted with Ctrl+C or SIGTERM.
    Run {
        /// Emit logs as JSON lines instead of human-readable text.
        #[arg(long)]
        json_logs: bool,
    },

    /// Query the server once and print a status summary.
    Status,

    /// Print the death leaderboard.
    Deaths {
        /// Death counter file (defaults to DEATH_COUNTS_PATH).
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Deaths { file } => run_deaths(file),
        command => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            match command {
                Command::Run { json_logs } => runtime.block_on(run_monitor(json_logs)),
                _ => runtime.block_on(run_status()),
            }
        }
    }
}

/// Prints the death leaderboard.
fn run_deaths(file: Option<PathBuf>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => {
            Config::from_env()
                .context("Failed to load configuration")?
                .death_counts_path
        }
    };

    let store = CounterStore::load(&path);
    let leaderboard = store.leaderboard();

    if leaderboard.is_empty() {
        println!("No deaths recorded yet.");
        return Ok(());
    }

    for (rank, (player, count)) in leaderboard.iter().enumerate() {
        println!("{:>3}. {player:<16} {count}", rank + 1);
    }

    Ok(())
}

/// Queries the server once and prints a summary.
async fn run_status() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let provider = TcpStatusProvider::new(config.status_timeout);

    let status = provider
        .query(&config.server)
        .await
        .unwrap_or_else(|_| ServerStatus::unreachable());

    println!("{}", render_status_summary(&status));
    Ok(())
}

/// Runs both monitoring loops until a shutdown signal arrives.
async fn run_monitor(json_logs: bool) -> Result<()> {
    init_logging(json_logs);

    info!("Starting void-mc Monitor");

    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        server = %config.server,
        log_path = %config.log_path.display(),
        death_counts = %config.death_counts_path.display(),
        status_channel = %config.status_channel,
        player_events_channel = %config.player_events_channel,
        "Configuration loaded"
    );

    if config.status_channel.is_unset() {
        warn!("STATUS_CHANNEL_ID not set, status notifications disabled");
    }
    if config.player_events_channel.is_unset() {
        warn!("PLAYER_EVENTS_CHANNEL_ID not set, player event notifications disabled");
    }

    let token = config
        .discord_token
        .as_deref()
        .context("DISCORD_TOKEN must be set to run the monitor")?;
    let client = Arc::new(
        DiscordClient::new(&config.discord_api_url, token)
            .context("Failed to create Discord client")?,
    );
    let dispatcher = NotificationDispatcher::new(Arc::clone(&client));

    let watcher = PlayerActivityWatcher::new(
        ActivityWatcherConfig {
            destination: config.player_events_channel,
            interval: config.log_poll_interval,
        },
        LogTailer::new(&config.log_path),
        CounterStore::load(&config.death_counts_path),
        dispatcher.clone(),
    );

    let poller = StatusPoller::new(
        StatusPollerConfig {
            address: config.server.clone(),
            destination: config.status_channel,
            server_name: config.server_name.clone(),
            interval: config.status_interval,
        },
        TcpStatusProvider::new(config.status_timeout),
        dispatcher,
    );

    // Both loops block on the client's ready signal until connect succeeds
    let (stop, stop_token) = stop_signal();
    let watcher_task = tokio::spawn(watcher.run(stop_token.clone()));
    let poller_task = tokio::spawn(poller.run(stop_token));

    if let Err(e) = client.connect().await.context("Failed to connect to Discord") {
        stop.stop();
        watcher_task.abort();
        poller_task.abort();
        return Err(e);
    }

    info!("Monitor running. Press Ctrl+C to stop.");

    wait_for_shutdown().await;
    info!("Shutdown signal received");
    stop.stop();

    let shutdown = async {
        for (name, task) in [("activity", watcher_task), ("status", poller_task)] {
            if let Err(e) = task.await {
                error!(task = name, error = %e, "Monitoring task ended abnormally");
            }
        }
    };

    if tokio::time::timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), shutdown)
        .await
        .is_err()
    {
        error!("Timeout while waiting for monitoring loops to stop");
    }

    info!("Monitor stopped");
    Ok(())
}

/// Initializes the logging subsystem.
///
/// Filtering comes from `RUST_LOG` (default `info`). With `json` set, each
/// event is written as one JSON object per line.
fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_level(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
