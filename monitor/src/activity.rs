//! Player activity watcher: joins, leaves and deaths from the server log.
//!
//! Each tick polls the [`LogTailer`], classifies every new line and, for
//! each event, dispatches a notification. Death events bump the player's
//! persistent counter first so the message can report the running total.
//!
//! Events are handled strictly in file order, and a tick (including all of
//! its dispatches) finishes before the next one starts.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::counters::CounterStore;
use crate::dispatch::{DispatchOutcome, NotificationDispatcher};
use crate::messaging::MessagingClient;
use crate::parser::classify;
use crate::tailer::LogTailer;
use crate::types::{ChannelId, Event};
use crate::utils::StopToken;

/// Default interval between log polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Builds the notification text for an event.
///
/// `death_count` is only used for [`Event::Death`].
#[must_use]
pub fn event_message(event: &Event, death_count: u64) -> String {
    match event {
        Event::Join { player } => format!("➡️ **{player}** joined the server"),
        Event::Leave { player } => format!("⬅️ **{player}** left the server"),
        Event::Death { player, cause } => {
            format!("💀 **{player}** {cause}\n*Total deaths: {death_count}*")
        }
    }
}

/// Settings for a [`PlayerActivityWatcher`].
#[derive(Debug, Clone)]
pub struct ActivityWatcherConfig {
    /// Where event notifications go; [`ChannelId::UNSET`] disables them.
    pub destination: ChannelId,

    /// Time between the end of one tick and the start of the next.
    pub interval: Duration,
}

/// Follows the server log and reports player activity.
///
/// Owns the death counters exclusively; nothing else mutates them while the
/// watcher runs.
pub struct PlayerActivityWatcher<C> {
    config: ActivityWatcherConfig,
    tailer: LogTailer,
    counters: CounterStore,
    dispatcher: NotificationDispatcher<C>,
}

impl<C: MessagingClient> PlayerActivityWatcher<C> {
    pub fn new(
        config: ActivityWatcherConfig,
        tailer: LogTailer,
        counters: CounterStore,
        dispatcher: NotificationDispatcher<C>,
    ) -> Self {
        Self {
            config,
            tailer,
            counters,
            dispatcher,
        }
    }

    /// Returns the death counters.
    #[must_use]
    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }

    /// Returns the log tailer.
    #[must_use]
    pub fn tailer(&self) -> &LogTailer {
        &self.tailer
    }

    /// Skips log content that existed before the watcher started.
    pub fn initialize(&mut self) {
        self.tailer.initialize();
    }

    /// Handles one event: updates counters for deaths, then dispatches.
    pub async fn handle_event(&mut self, event: &Event) -> DispatchOutcome {
        let death_count = match event {
            Event::Death { player, .. } => self.counters.increment(player),
            Event::Join { .. } | Event::Leave { .. } => 0,
        };

        debug!(?event, death_count, "Handling player event");

        let message = event_message(event, death_count);
        self.dispatcher
            .dispatch(self.config.destination, &message)
            .await
    }

    /// Processes every line appended since the last tick.
    ///
    /// Read failures are logged and leave the tailer where it was, so the
    /// same content is retried next tick. Returns the number of events
    /// handled.
    pub async fn tick(&mut self) -> usize {
        let lines = match self.tailer.poll() {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "Failed to read server log, will retry");
                return 0;
            }
        };

        let mut handled = 0;
        for event in lines.iter().filter_map(|line| classify(line)) {
            self.handle_event(&event).await;
            handled += 1;
        }

        handled
    }

    /// Watches the log until `stop` is raised.
    ///
    /// Waits for the messaging client to become ready, then positions the
    /// tailer at the end of the log before the first tick.
    pub async fn run(mut self, mut stop: StopToken) {
        self.dispatcher.wait_until_ready().await;
        self.initialize();

        info!(
            path = %self.tailer.path().display(),
            counters = %self.counters.path().display(),
            "Player activity monitoring started"
        );

        while !stop.is_stopped() {
            let handled = self.tick().await;
            if handled > 0 {
                debug!(events = handled, "Processed player events");
            }

            if stop.sleep(self.config.interval).await {
                break;
            }
        }

        info!("Player activity monitoring stopped");
    }
}
