//! In-memory messaging client for unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::messaging::{Channel, MessagingClient, MessagingError};
use crate::types::ChannelId;

#[derive(Debug, Default)]
struct State {
    resolve_calls: usize,
    send_attempts: usize,
    sent: Vec<(ChannelId, String)>,
}

/// Records every resolution and send instead of talking to a service.
#[derive(Debug, Default)]
pub struct RecordingClient {
    unknown: HashSet<ChannelId>,
    fail_sends: bool,
    state: Arc<Mutex<State>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `id` resolve as not found.
    pub fn with_unknown_channel(mut self, id: ChannelId) -> Self {
        self.unknown.insert(id);
        self
    }

    /// Makes every send fail.
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.state.lock().unwrap().resolve_calls
    }

    pub fn send_attempts(&self) -> usize {
        self.state.lock().unwrap().send_attempts
    }

    /// Messages delivered so far, in order.
    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Delivered message texts, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl MessagingClient for RecordingClient {
    type Channel = RecordingChannel;

    async fn wait_until_ready(&self) {}

    async fn resolve(&self, id: ChannelId) -> Result<RecordingChannel, MessagingError> {
        self.state.lock().unwrap().resolve_calls += 1;

        if self.unknown.contains(&id) {
            return Err(MessagingError::ChannelNotFound(id));
        }

        Ok(RecordingChannel {
            id,
            fail: self.fail_sends,
            state: Arc::clone(&self.state),
        })
    }
}

pub struct RecordingChannel {
    id: ChannelId,
    fail: bool,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Channel for RecordingChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    async fn send(&self, text: &str) -> Result<(), MessagingError> {
        let mut state = self.state.lock().unwrap();
        state.send_attempts += 1;

        if self.fail {
            return Err(MessagingError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        state.sent.push((self.id, text.to_string()));
        Ok(())
    }
}
