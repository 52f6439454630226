//! Notification dispatch shared by both monitors.
//!
//! [`NotificationDispatcher::dispatch`] is best-effort and at-most-once:
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | destination is [`ChannelId::UNSET`] | no resolution, no send |
//! | destination cannot be resolved | `warn!`, message dropped |
//! | send fails | `warn!`, message dropped |
//!
//! No failure is retried or queued, and none is returned as an error: the
//! calling loop always moves on to its next notification.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::messaging::{Channel, MessagingClient};
use crate::types::ChannelId;

/// What happened to a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Notifications are disabled for this destination.
    Disabled,

    /// The message was accepted by the messaging service.
    Delivered,

    /// The destination could not be resolved; the message was dropped.
    Unresolved,

    /// The send call failed; the message was dropped.
    Failed,
}

/// Routes notification text to a messaging client.
pub struct NotificationDispatcher<C> {
    client: Arc<C>,
}

impl<C> Clone for NotificationDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: MessagingClient> NotificationDispatcher<C> {
    /// Creates a dispatcher backed by `client`.
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Suspends until the underlying client is ready.
    pub async fn wait_until_ready(&self) {
        self.client.wait_until_ready().await;
    }

    /// Sends `text` to `destination`, logging and dropping on any failure.
    pub async fn dispatch(&self, destination: ChannelId, text: &str) -> DispatchOutcome {
        if destination.is_unset() {
            debug!("Notifications disabled, skipping dispatch");
            return DispatchOutcome::Disabled;
        }

        let channel = match self.client.resolve(destination).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(
                    channel_id = %destination,
                    error = %e,
                    "Could not find notification channel, dropping message"
                );
                return DispatchOutcome::Unresolved;
            }
        };

        match channel.send(text).await {
            Ok(()) => {
                debug!(channel_id = %channel.id(), "Notification sent");
                DispatchOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    channel_id = %channel.id(),
                    error = %e,
                    "Failed to send notification, dropping message"
                );
                DispatchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingClient;

    #[tokio::test]
    async fn test_unset_destination_is_a_no_op() {
        let client = Arc::new(RecordingClient::new());
        let dispatcher = NotificationDispatcher::new(Arc::clone(&client));

        let outcome = dispatcher.dispatch(ChannelId::UNSET, "hello").await;

        assert_eq!(outcome, DispatchOutcome::Disabled);
        assert_eq!(client.resolve_calls(), 0);
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivers_to_resolved_channel() {
        let client = Arc::new(RecordingClient::new());
        let dispatcher = NotificationDispatcher::new(Arc::clone(&client));

        let outcome = dispatcher.dispatch(ChannelId(7), "hello").await;

        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(client.sent(), vec![(ChannelId(7), "hello".to_string())]);
    }

    #[tokio::test]
    async fn test_unknown_channel_drops_message() {
        let client = Arc::new(RecordingClient::new().with_unknown_channel(ChannelId(7)));
        let dispatcher = NotificationDispatcher::new(Arc::clone(&client));

        let outcome = dispatcher.dispatch(ChannelId(7), "hello").await;

        assert_eq!(outcome, DispatchOutcome::Unresolved);
        assert_eq!(client.resolve_calls(), 1);
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_drops_message_without_retry() {
        let client = Arc::new(RecordingClient::new().failing_sends());
        let dispatcher = NotificationDispatcher::new(Arc::clone(&client));

        let outcome = dispatcher.dispatch(ChannelId(7), "hello").await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(client.send_attempts(), 1);
        assert!(client.sent().is_empty());
    }
}
