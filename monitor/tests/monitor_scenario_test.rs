//! End-to-end scenarios for the monitoring loops.
//!
//! These tests wire the real [`DiscordClient`] to a wiremock server and drive
//! the activity watcher and status poller the way the binary does, checking
//! the exact messages that reach the chat service.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use void_monitor::activity::{ActivityWatcherConfig, PlayerActivityWatcher};
use void_monitor::counters::CounterStore;
use void_monitor::dispatch::NotificationDispatcher;
use void_monitor::messaging::DiscordClient;
use void_monitor::status::{
    ServerAddress, StatusError, StatusPoller, StatusPollerConfig, StatusProvider,
};
use void_monitor::tailer::LogTailer;
use void_monitor::types::{ChannelId, ServerStatus, StatusState};
use void_monitor::utils::stop_signal;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

const EVENTS_CHANNEL: ChannelId = ChannelId(1001);
const STATUS_CHANNEL: ChannelId = ChannelId(2002);

/// Starts a mock Discord API that accepts every channel and message.
async fn start_discord() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "42",
            "username": "void-bot"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/channels/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "type": 0 })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/channels/\d+/messages$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1" })))
        .mount(&server)
        .await;

    server
}

async fn connected_client(server: &MockServer) -> Arc<DiscordClient> {
    let client = DiscordClient::new(&server.uri(), "test-token").expect("client should build");
    client.connect().await.expect("mock accepts the token");
    Arc::new(client)
}

/// Returns `(path, content)` for every message posted so far, in order.
async fn posted_messages(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.method.as_str() == "POST")
        .map(|req| {
            let body: Value = serde_json::from_slice(&req.body).expect("JSON body");
            let content = body["content"].as_str().unwrap_or_default().to_string();
            (req.url.path().to_string(), content)
        })
        .collect()
}

/// Waits until at least `count` messages have been posted.
async fn wait_for_messages(server: &MockServer, count: usize) -> Vec<(String, String)> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let messages = posted_messages(server).await;
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("expected messages were not posted in time")
}

fn append_lines(path: &Path, lines: &[&str]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

fn watcher(
    dir: &TempDir,
    client: Arc<DiscordClient>,
    destination: ChannelId,
) -> PlayerActivityWatcher<DiscordClient> {
    PlayerActivityWatcher::new(
        ActivityWatcherConfig {
            destination,
            interval: Duration::from_millis(10),
        },
        LogTailer::new(dir.path().join("latest.log")),
        CounterStore::load(dir.path().join("death_counts.json")),
        NotificationDispatcher::new(client),
    )
}

/// Provider that replays scripted reachability, then reports unreachable.
struct ScriptedProvider {
    outcomes: Mutex<Vec<bool>>,
}

impl ScriptedProvider {
    fn new(mut outcomes: Vec<bool>) -> Self {
        outcomes.reverse();
        Self {
            outcomes: Mutex::new(outcomes),
        }
    }
}

#[async_trait]
impl StatusProvider for ScriptedProvider {
    async fn query(&self, _address: &ServerAddress) -> Result<ServerStatus, StatusError> {
        match self.outcomes.lock().unwrap().pop() {
            Some(true) => Ok(ServerStatus::reachable()),
            Some(false) => Ok(ServerStatus::unreachable()),
            None => Err(StatusError::Timeout(Duration::from_secs(5))),
        }
    }
}

fn poller(
    client: Arc<DiscordClient>,
    outcomes: Vec<bool>,
) -> StatusPoller<ScriptedProvider, DiscordClient> {
    StatusPoller::new(
        StatusPollerConfig {
            address: ServerAddress::new("mc.example.com", 25565),
            destination: STATUS_CHANNEL,
            server_name: "void-mc".to_string(),
            interval: Duration::from_millis(10),
        },
        ScriptedProvider::new(outcomes),
        NotificationDispatcher::new(client),
    )
}

// =============================================================================
// Player Activity
// =============================================================================

#[tokio::test]
async fn test_join_and_death_are_announced_in_order() {
    let server = start_discord().await;
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("latest.log");
    append_lines(&log, &["[09:00:00] [Server thread/INFO]: Old joined the game"]);

    let mut watcher = watcher(&dir, connected_client(&server).await, EVENTS_CHANNEL);
    watcher.initialize();

    append_lines(
        &log,
        &[
            "[10:00:00] [Server thread/INFO]: Steve joined the game",
            "[10:00:05] [Server thread/INFO]: <Steve> hello",
            "[10:00:10] [Server thread/INFO]: Steve drowned",
            "[10:00:20] [Server thread/INFO]: Alex left the game",
        ],
    );

    assert_eq!(watcher.tick().await, 3);

    let messages = posted_messages(&server).await;
    let contents: Vec<&str> = messages.iter().map(|(_, c)| c.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "➡️ **Steve** joined the server",
            "💀 **Steve** drowned\n*Total deaths: 1*",
            "⬅️ **Alex** left the server",
        ]
    );
    assert!(messages
        .iter()
        .all(|(path, _)| path == "/channels/1001/messages"));

    let persisted = std::fs::read_to_string(dir.path().join("death_counts.json")).unwrap();
    let persisted: Value = serde_json::from_str(&persisted).unwrap();
    assert_eq!(persisted, json!({ "Steve": 1 }));
}

#[tokio::test]
async fn test_death_totals_survive_restart() {
    let server = start_discord().await;
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("latest.log");

    {
        let client = connected_client(&server).await;
        let mut first = watcher(&dir, client, EVENTS_CHANNEL);
        first.initialize();
        append_lines(&log, &["[10:00:00] [Server thread/INFO]: Steve fell from a high place"]);
        assert_eq!(first.tick().await, 1);
    }

    let mut second = watcher(&dir, connected_client(&server).await, EVENTS_CHANNEL);
    second.initialize();
    append_lines(
        &log,
        &["[11:00:00] [Server thread/INFO]: Steve was slain by Zombie"],
    );
    assert_eq!(second.tick().await, 1);

    let messages = posted_messages(&server).await;
    assert_eq!(
        messages.last().map(|(_, c)| c.as_str()),
        Some("💀 **Steve** was slain by Zombie\n*Total deaths: 2*")
    );
    assert_eq!(second.counters().get("Steve"), 2);
}

#[tokio::test]
async fn test_disabled_destination_still_counts_deaths() {
    let server = start_discord().await;
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("latest.log");

    let mut watcher = watcher(&dir, connected_client(&server).await, ChannelId::UNSET);
    watcher.initialize();
    append_lines(&log, &["[10:00:00] [Server thread/INFO]: Alex starved to death"]);

    assert_eq!(watcher.tick().await, 1);
    assert!(posted_messages(&server).await.is_empty());
    assert_eq!(watcher.counters().get("Alex"), 1);
}

#[tokio::test]
async fn test_watcher_loop_stops_on_signal() {
    let server = start_discord().await;
    let dir = TempDir::new().unwrap();
    let watcher = watcher(&dir, connected_client(&server).await, EVENTS_CHANNEL);

    let (stop, token) = stop_signal();
    let task = tokio::spawn(watcher.run(token));

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.stop();

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("watcher should stop promptly")
        .unwrap();
}

// =============================================================================
// Server Status
// =============================================================================

#[tokio::test]
async fn test_status_transitions_are_broadcast() {
    let server = start_discord().await;
    let client = DiscordClient::new(&server.uri(), "test-token").unwrap();
    let client = Arc::new(client);

    let (stop, token) = stop_signal();
    // Online (initial, silent), offline, offline, online
    let task = tokio::spawn(poller(Arc::clone(&client), vec![true, false, false, true]).run(token));

    // The loop is parked until the client connects
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(posted_messages(&server).await.is_empty());

    client.connect().await.unwrap();

    let messages = wait_for_messages(&server, 2).await;
    stop.stop();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("poller should stop promptly")
        .unwrap();

    assert_eq!(messages[0].0, "/channels/2002/messages");
    assert_eq!(
        messages[0].1,
        "@everyone 🔴 **void-mc server is now OFFLINE.**"
    );
    assert_eq!(
        messages[1].1,
        "@everyone 🟢 **void-mc server is now ONLINE!**"
    );
}

#[tokio::test]
async fn test_initial_offline_state_is_silent() {
    let server = start_discord().await;
    let mut poller = poller(connected_client(&server).await, vec![false, false]);

    assert!(poller.tick().await.is_none());
    assert_eq!(poller.state(), StatusState::Offline);
    assert!(poller.tick().await.is_none());

    assert!(posted_messages(&server).await.is_empty());
}
