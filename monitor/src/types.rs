//! Core types for void-mc server monitoring.
//!
//! This module defines the events classified from the server log, the status
//! snapshots produced by the poller, and the identifiers used to address
//! notification destinations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A player event classified from a single server log line.
///
/// Events are immutable and consumed exactly once by the activity watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A player joined the game.
    Join { player: String },

    /// A player left the game.
    Leave { player: String },

    /// A player died.
    Death {
        player: String,
        /// The in-game death phrasing following the player name
        /// (e.g. `was slain by Zombie`).
        cause: String,
    },
}

impl Event {
    /// Returns the player the event is about.
    #[must_use]
    pub fn player(&self) -> &str {
        match self {
            Self::Join { player } | Self::Leave { player } | Self::Death { player, .. } => player,
        }
    }
}

/// A player entry from the status provider's name sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSample {
    pub name: String,
}

/// A point-in-time snapshot of the server's status.
///
/// Produced fresh on every poll and never persisted. Counts and the name
/// sample are optional because a provider may only be able to answer
/// reachability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    /// Whether the server answered the query.
    pub reachable: bool,

    /// Number of players currently online.
    pub online_count: Option<u32>,

    /// Maximum number of players the server accepts.
    pub max_count: Option<u32>,

    /// A sample of online player names, as reported by the server.
    pub sample: Vec<PlayerSample>,

    /// When the snapshot was taken.
    pub checked_at: DateTime<Utc>,
}

impl ServerStatus {
    /// Creates a snapshot for a server that could not be reached.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            online_count: None,
            max_count: None,
            sample: Vec::new(),
            checked_at: Utc::now(),
        }
    }

    /// Creates a snapshot for a reachable server with no player details.
    #[must_use]
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Self::unreachable()
        }
    }
}

/// The online/offline state tracked by the status poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusState {
    /// No poll has completed yet.
    Unknown,
    Online,
    Offline,
}

impl StatusState {
    /// Maps a reachability outcome to a concrete state.
    #[must_use]
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Identifier of a notification destination (a Discord channel).
///
/// The value `0` is the "unset" sentinel: notifications for the owning
/// watcher are disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// The "unset" sentinel that disables notifications.
    pub const UNSET: Self = Self(0);

    /// Returns true if this is the "unset" sentinel.
    #[must_use]
    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
