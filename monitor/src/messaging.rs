//! Messaging client abstraction and the Discord REST implementation.
//!
//! The monitors only need three things from a chat service:
//!
//! - a ready signal, so destinations are not resolved before the client has
//!   authenticated ([`MessagingClient::wait_until_ready`])
//! - destination resolution ([`MessagingClient::resolve`])
//! - message delivery on a resolved channel ([`Channel::send`])
//!
//! [`DiscordClient`] implements these over the Discord HTTP API with a bot
//! token. Delivery is at-most-once: nothing here retries.
//!
//! # Example
//!
//! ```no_run
//! use void_monitor::messaging::{Channel, DiscordClient, MessagingClient};
//! use void_monitor::types::ChannelId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DiscordClient::new("https://discord.com/api/v10", "bot-token")?;
//!     client.connect().await?;
//!
//!     let channel = client.resolve(ChannelId(123456789012345678)).await?;
//!     channel.send("hello from void-mc").await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::types::ChannelId;

/// Default Discord API base URL.
pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// HTTP request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while talking to the messaging service.
#[derive(Error, Debug)]
pub enum MessagingError {
    /// The destination does not exist or the bot cannot see it.
    #[error("channel {0} not found or inaccessible")]
    ChannelNotFound(ChannelId),

    /// The bot token was rejected (401).
    #[error("authentication failed: invalid bot token")]
    AuthFailed,

    /// The service answered with an unexpected status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// HTTP transport error (connect, timeout, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bot token contains characters not allowed in a header.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// A resolved, live notification destination.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Returns the identifier this channel was resolved from.
    fn id(&self) -> ChannelId;

    /// Delivers `text` to the channel.
    async fn send(&self, text: &str) -> Result<(), MessagingError>;
}

/// A connection to a messaging service.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Channel handle type returned by [`resolve`](Self::resolve).
    type Channel: Channel;

    /// Suspends until the client is connected and able to resolve channels.
    async fn wait_until_ready(&self);

    /// Resolves `id` to a live channel handle.
    ///
    /// Returns [`MessagingError::ChannelNotFound`] for unknown or inaccessible
    /// destinations.
    async fn resolve(&self, id: ChannelId) -> Result<Self::Channel, MessagingError>;
}

/// Account details returned when the bot token is verified.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
    allowed_mentions: AllowedMentions,
}

#[derive(Debug, Serialize)]
struct AllowedMentions {
    parse: [&'static str; 2],
}

/// Discord HTTP API client authenticated with a bot token.
#[derive(Debug)]
pub struct DiscordClient {
    http: Client,
    api_url: String,
    ready: watch::Sender<bool>,
}

impl DiscordClient {
    /// Creates a client for `api_url` (e.g. [`DEFAULT_DISCORD_API_URL`]).
    ///
    /// The client is not ready until [`connect`](Self::connect) succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(api_url: &str, token: &str) -> Result<Self, MessagingError> {
        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        let (ready, _) = watch::channel(false);

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            ready,
        })
    }

    /// Verifies the bot token and raises the ready signal.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::AuthFailed`] for a rejected token, or an
    /// HTTP/API error if the service cannot be reached.
    pub async fn connect(&self) -> Result<BotUser, MessagingError> {
        let url = format!("{}/users/@me", self.api_url);
        debug!(url = %url, "Verifying bot token");

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        match status {
            StatusCode::OK => {
                let user: BotUser = response.json().await?;
                info!(user = %user.username, id = %user.id, "Messaging client ready");
                self.ready.send_replace(true);
                Ok(user)
            }
            StatusCode::UNAUTHORIZED => Err(MessagingError::AuthFailed),
            _ => Err(api_error(response).await),
        }
    }

    /// Returns true once [`connect`](Self::connect) has succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }
}

#[async_trait]
impl MessagingClient for DiscordClient {
    type Channel = DiscordChannel;

    async fn wait_until_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in `self`, so this only ends once ready is raised
        let _ = rx.wait_for(|ready| *ready).await;
    }

    async fn resolve(&self, id: ChannelId) -> Result<DiscordChannel, MessagingError> {
        let url = format!("{}/channels/{}", self.api_url, id);
        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {
                debug!(channel_id = %id, "Resolved channel");
                Ok(DiscordChannel {
                    id,
                    http: self.http.clone(),
                    messages_url: format!("{url}/messages"),
                })
            }
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => {
                Err(MessagingError::ChannelNotFound(id))
            }
            StatusCode::UNAUTHORIZED => Err(MessagingError::AuthFailed),
            _ => Err(api_error(response).await),
        }
    }
}

/// A resolved Discord text channel.
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    id: ChannelId,
    http: Client,
    messages_url: String,
}

#[async_trait]
impl Channel for DiscordChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    async fn send(&self, text: &str) -> Result<(), MessagingError> {
        let body = CreateMessage {
            content: text,
            allowed_mentions: AllowedMentions {
                parse: ["everyone", "users"],
            },
        };

        let response = self.http.post(&self.messages_url).json(&body).send().await?;

        if response.status().is_success() {
            debug!(channel_id = %self.id, "Message delivered");
            Ok(())
        } else if response.status() == StatusCode::UNAUTHORIZED {
            Err(MessagingError::AuthFailed)
        } else {
            Err(api_error(response).await)
        }
    }
}

/// Builds an [`MessagingError::Api`] from a non-success response.
async fn api_error(response: reqwest::Response) -> MessagingError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    MessagingError::Api { status, message }
}
