//! Server status polling and online/offline transition detection.
//!
//! # State Machine
//!
//! ```text
//! Unknown --(first poll)--> Online | Offline     (silent)
//! Online  --(unreachable)--> Offline             (notifies)
//! Offline --(reachable)---> Online               (notifies)
//! same outcome as current state                  (no-op)
//! ```
//!
//! A provider failure of any kind (refused connection, timeout, malformed
//! answer) counts as "unreachable" and never escapes [`StatusPoller::check_once`].
//! A server that stays down therefore produces one offline notification
//! followed by silence.
//!
//! A hung provider stalls the loop; [`TcpStatusProvider`] bounds its own
//! connect time, other providers must do the same.

use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::dispatch::{DispatchOutcome, NotificationDispatcher};
use crate::messaging::MessagingClient;
use crate::types::{ChannelId, ServerStatus, StatusState};
use crate::utils::StopToken;

/// Default interval between status polls.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Default time allowed for a single status query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Placeholder name the server reports for players hiding their identity.
const ANONYMOUS_PLAYER: &str = "Anonymous Player";

/// Errors a status provider can report.
#[derive(Error, Debug)]
pub enum StatusError {
    /// The query did not complete in time.
    #[error("status query timed out after {0:?}")]
    Timeout(Duration),

    /// Network failure while querying.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server answered with something that is not a status response.
    #[error("malformed status response: {0}")]
    Malformed(String),
}

/// Network address of the game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Answers whether the server is reachable and who is online.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Queries the server at `address`.
    async fn query(&self, address: &ServerAddress) -> Result<ServerStatus, StatusError>;
}

/// Reachability-only provider: the server is up if it accepts a TCP
/// connection within the timeout.
///
/// Player counts and names are never filled in.
#[derive(Debug, Clone)]
pub struct TcpStatusProvider {
    timeout: Duration,
}

impl TcpStatusProvider {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpStatusProvider {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_TIMEOUT)
    }
}

#[async_trait]
impl StatusProvider for TcpStatusProvider {
    async fn query(&self, address: &ServerAddress) -> Result<ServerStatus, StatusError> {
        let connect = TcpStream::connect((address.host.as_str(), address.port));

        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => Ok(ServerStatus::reachable()),
            Ok(Err(e)) => Err(StatusError::Io(e)),
            Err(_) => Err(StatusError::Timeout(self.timeout)),
        }
    }
}

/// Renders a human-readable status summary.
///
/// Each "Anonymous Player" in the name sample is renumbered `[Bot 1]`,
/// `[Bot 2]`, ... in sample order.
#[must_use]
pub fn render_status_summary(status: &ServerStatus) -> String {
    if !status.reachable {
        return "🔴 **Server is offline or unreachable.**".to_string();
    }

    let mut msg = "🟢 **Server is online!**".to_string();

    if let (Some(online), Some(max)) = (status.online_count, status.max_count) {
        msg.push_str(&format!("\nPlayers: {online}/{max}"));
    }

    let mut bot_number = 0;
    let names: Vec<String> = status
        .sample
        .iter()
        .map(|player| {
            if player.name == ANONYMOUS_PLAYER {
                bot_number += 1;
                format!("[Bot {bot_number}]")
            } else {
                player.name.clone()
            }
        })
        .collect();

    if !names.is_empty() {
        msg.push_str(&format!("\nOnline: {}", names.join(", ")));
    }

    msg
}

/// Builds the broadcast message announcing a transition.
#[must_use]
pub fn transition_message(server_name: &str, state: StatusState) -> String {
    match state {
        StatusState::Online => format!("@everyone 🟢 **{server_name} server is now ONLINE!**"),
        _ => format!("@everyone 🔴 **{server_name} server is now OFFLINE.**"),
    }
}

/// Settings for a [`StatusPoller`].
#[derive(Debug, Clone)]
pub struct StatusPollerConfig {
    /// Server to poll.
    pub address: ServerAddress,

    /// Where transition notifications go; [`ChannelId::UNSET`] disables them.
    pub destination: ChannelId,

    /// Display name used in notifications.
    pub server_name: String,

    /// Time between the end of one poll and the start of the next.
    pub interval: Duration,
}

/// Periodically polls the server and announces online/offline transitions.
pub struct StatusPoller<P, C> {
    config: StatusPollerConfig,
    provider: P,
    dispatcher: NotificationDispatcher<C>,
    state: StatusState,
}

impl<P, C> StatusPoller<P, C>
where
    P: StatusProvider,
    C: MessagingClient,
{
    /// Creates a poller in the [`StatusState::Unknown`] state.
    pub fn new(
        config: StatusPollerConfig,
        provider: P,
        dispatcher: NotificationDispatcher<C>,
    ) -> Self {
        Self {
            config,
            provider,
            dispatcher,
            state: StatusState::Unknown,
        }
    }

    /// Returns the current tracked state.
    #[must_use]
    pub fn state(&self) -> StatusState {
        self.state
    }

    /// Queries the provider once. Any failure reads as unreachable.
    pub async fn check_once(&self) -> bool {
        match self.provider.query(&self.config.address).await {
            Ok(status) => status.reachable,
            Err(e) => {
                debug!(
                    address = %self.config.address,
                    error = %e,
                    "Status query failed, treating server as offline"
                );
                false
            }
        }
    }

    /// Feeds one poll outcome into the state machine.
    ///
    /// Returns the new state if this was an `Online`/`Offline` transition
    /// that should be announced. The first observation only records the
    /// initial state.
    pub fn observe(&mut self, reachable: bool) -> Option<StatusState> {
        let next = StatusState::from_reachable(reachable);
        let previous = std::mem::replace(&mut self.state, next);

        match previous {
            StatusState::Unknown => {
                info!(address = %self.config.address, state = %next, "Initial server state");
                None
            }
            prev if prev == next => None,
            prev => {
                if next == StatusState::Online {
                    info!(address = %self.config.address, from = %prev, to = %next, "Server came online");
                } else {
                    warn!(address = %self.config.address, from = %prev, to = %next, "Server went offline");
                }
                Some(next)
            }
        }
    }

    /// Runs one poll and dispatches a notification if the state flipped.
    ///
    /// Returns the dispatch outcome when a notification was attempted.
    pub async fn tick(&mut self) -> Option<DispatchOutcome> {
        let reachable = self.check_once().await;
        let transition = self.observe(reachable)?;

        let message = transition_message(&self.config.server_name, transition);
        Some(
            self.dispatcher
                .dispatch(self.config.destination, &message)
                .await,
        )
    }

    /// Polls until `stop` is raised.
    ///
    /// Waits for the messaging client to become ready first. Polls never
    /// overlap: the interval starts after each tick completes.
    pub async fn run(mut self, mut stop: StopToken) {
        self.dispatcher.wait_until_ready().await;

        info!(
            address = %self.config.address,
            interval_secs = self.config.interval.as_secs(),
            "Status monitoring started"
        );

        while !stop.is_stopped() {
            self.tick().await;

            if stop.sleep(self.config.interval).await {
                break;
            }
        }

        info!("Status monitoring stopped");
    }
}
