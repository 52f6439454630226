//! Configuration module for the void-mc Monitor.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `DISCORD_TOKEN` | For `run` | - | Discord bot token |
//! | `SERVER_IP` | Yes | - | Minecraft server host |
//! | `MINECRAFT_PORT` | No | 25565 | Minecraft server port |
//! | `STATUS_CHANNEL_ID` | No | 0 (disabled) | Channel for online/offline broadcasts |
//! | `PLAYER_EVENTS_CHANNEL_ID` | No | 0 (disabled) | Channel for join/leave/death messages |
//! | `SERVER_LOG_PATH` | No | `logs/latest.log` | Server log to follow |
//! | `DEATH_COUNTS_PATH` | No | `<data dir>/void-monitor/death_counts.json` | Death counter file |
//! | `SERVER_NAME` | No | `void-mc` | Display name in broadcasts |
//! | `STATUS_CHECK_INTERVAL_SECS` | No | 30 | Seconds between status polls |
//! | `LOG_POLL_INTERVAL_MS` | No | 1000 | Milliseconds between log polls |
//! | `STATUS_TIMEOUT_SECS` | No | 5 | Status query timeout |
//! | `DISCORD_API_URL` | No | `https://discord.com/api/v10` | Discord API base URL |
//!
//! # Example
//!
//! ```no_run
//! use void_monitor::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Watching: {}", config.log_path.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

use crate::messaging::DEFAULT_DISCORD_API_URL;
use crate::status::ServerAddress;
use crate::types::ChannelId;

/// Default Minecraft server port.
const DEFAULT_MINECRAFT_PORT: u16 = 25565;

/// Default server log location, relative to the working directory.
const DEFAULT_LOG_PATH: &str = "logs/latest.log";

/// Directory under the user data dir holding monitor state.
const DATA_DIR_NAME: &str = "void-monitor";

/// Death counter file name.
const DEATH_COUNTS_FILE: &str = "death_counts.json";

/// Default server display name.
const DEFAULT_SERVER_NAME: &str = "void-mc";

/// Default status poll interval (in seconds).
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 30;

/// Default log poll interval (in milliseconds).
const DEFAULT_LOG_POLL_INTERVAL_MS: u64 = 1000;

/// Default status query timeout (in seconds).
const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 5;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Configuration for the void-mc Monitor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token. Only needed when notifications are sent.
    pub discord_token: Option<String>,

    /// Discord API base URL.
    pub discord_api_url: String,

    /// Minecraft server address.
    pub server: ServerAddress,

    /// Display name used in broadcast messages.
    pub server_name: String,

    /// Destination for online/offline broadcasts.
    pub status_channel: ChannelId,

    /// Destination for join/leave/death notifications.
    pub player_events_channel: ChannelId,

    /// Server log file to follow.
    pub log_path: PathBuf,

    /// Death counter file.
    pub death_counts_path: PathBuf,

    /// Time between status polls.
    pub status_interval: Duration,

    /// Time between log polls.
    pub log_poll_interval: Duration,

    /// Time allowed for one status query.
    pub status_timeout: Duration,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `SERVER_IP` is not set
    /// - a numeric variable is set but cannot be parsed, or an interval is 0
    /// - `DEATH_COUNTS_PATH` is unset and the home directory cannot be determined
    pub fn from_env() -> Result<Self, ConfigError> {
        // Required: SERVER_IP
        let host = env::var("SERVER_IP")
            .map_err(|_| ConfigError::MissingEnvVar("SERVER_IP".to_string()))?;

        let port = parse_var("MINECRAFT_PORT", DEFAULT_MINECRAFT_PORT)?;

        let discord_token = env::var("DISCORD_TOKEN").ok().filter(|t| !t.is_empty());

        let discord_api_url =
            env::var("DISCORD_API_URL").unwrap_or_else(|_| DEFAULT_DISCORD_API_URL.to_string());

        let server_name =
            env::var("SERVER_NAME").unwrap_or_else(|_| DEFAULT_SERVER_NAME.to_string());

        let status_channel = ChannelId(parse_var("STATUS_CHANNEL_ID", 0)?);
        let player_events_channel = ChannelId(parse_var("PLAYER_EVENTS_CHANNEL_ID", 0)?);

        let log_path = env::var("SERVER_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_PATH));

        let death_counts_path = match env::var("DEATH_COUNTS_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs
                    .data_dir()
                    .join(DATA_DIR_NAME)
                    .join(DEATH_COUNTS_FILE)
            }
        };

        let status_interval = Duration::from_secs(parse_positive(
            "STATUS_CHECK_INTERVAL_SECS",
            DEFAULT_STATUS_INTERVAL_SECS,
        )?);
        let log_poll_interval = Duration::from_millis(parse_positive(
            "LOG_POLL_INTERVAL_MS",
            DEFAULT_LOG_POLL_INTERVAL_MS,
        )?);
        let status_timeout = Duration::from_secs(parse_positive(
            "STATUS_TIMEOUT_SECS",
            DEFAULT_STATUS_TIMEOUT_SECS,
        )?);

        Ok(Self {
            discord_token,
            discord_api_url,
            server: ServerAddress::new(host, port),
            server_name,
            status_channel,
            player_events_channel,
            log_path,
            death_counts_path,
            status_interval,
            log_poll_interval,
            status_timeout,
        })
    }
}

/// Parses an optional variable, falling back to `default` when unset.
fn parse_var<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(val) => val.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected non-negative integer, got '{val}'"),
        }),
        Err(_) => Ok(default),
    }
}

/// Like [`parse_var`] but rejects 0.
fn parse_positive(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = parse_var(key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than 0".to_string(),
        });
    }
    Ok(value)
}
