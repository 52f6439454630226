//! void-mc Monitor - Minecraft server log and status watcher.
//!
//! This crate watches a Minecraft server and reports what happens on it to a
//! Discord channel.
//!
//! # Overview
//!
//! Two independent loops run for the lifetime of the process:
//!
//! - The [`activity`] watcher follows the server's `latest.log`, classifies
//!   join, leave and death lines, keeps persistent per-player death counts,
//!   and announces each event.
//! - The [`status`] poller queries the server on a fixed interval and
//!   broadcasts when it goes offline or comes back online.
//!
//! Both reach the chat service through the [`dispatch`] module, which drops
//! (and logs) anything it cannot deliver. No failure inside either loop ends
//! the loop.
//!
//! # Modules
//!
//! - [`types`]: Events, status snapshots and channel identifiers
//! - [`parser`]: Log line classification
//! - [`tailer`]: Offset-tracking log reader
//! - [`counters`]: Durable death counters
//! - [`status`]: Status provider and online/offline poller
//! - [`activity`]: Player activity watcher
//! - [`messaging`]: Messaging client traits and the Discord client
//! - [`dispatch`]: Best-effort notification dispatch
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for monitor operations
//! - [`utils`]: Shared utilities (stop signal)

pub mod activity;
pub mod config;
pub mod counters;
pub mod dispatch;
pub mod error;
pub mod messaging;
pub mod parser;
pub mod status;
pub mod tailer;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use activity::{ActivityWatcherConfig, PlayerActivityWatcher};
pub use config::Config;
pub use counters::{CounterError, CounterStore};
pub use dispatch::{DispatchOutcome, NotificationDispatcher};
pub use error::{MonitorError, Result};
pub use messaging::{Channel, DiscordClient, MessagingClient, MessagingError};
pub use parser::classify;
pub use status::{
    ServerAddress, StatusError, StatusPoller, StatusPollerConfig, StatusProvider,
    TcpStatusProvider,
};
pub use tailer::{LogTailer, TailerError};
pub use types::{ChannelId, Event, PlayerSample, ServerStatus, StatusState};
pub use utils::{stop_signal, StopHandle, StopToken};
