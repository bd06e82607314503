//! Shared fixtures for handler tests.

use std::sync::Arc;
use std::time::Duration;

use bantracker_proto::Message;
use tokio::sync::mpsc;

use super::Context;
use crate::config::Config;
use crate::db::Database;
use crate::state::Tracker;

/// Context over an in-memory store. `bot` and `expiry` are extra lines for
/// those TOML tables.
pub async fn context(bot: &str, expiry: &str) -> Arc<Context> {
    let config = Config::from_toml(&format!(
        "[server]\nhost = \"h\"\nnick = \"bot\"\n\n[bot]\nchannels = [\"#chan\"]\n{bot}\n\n[expiry]\n{expiry}\n"
    ))
    .unwrap();
    let db = Database::new(":memory:").await.unwrap();
    Arc::new(Context::new(config, db))
}

/// Tracker that has seen `lines`.
pub fn tracker(lines: &[&str]) -> Tracker {
    let mut tracker = Tracker::new("bot");
    for line in lines {
        tracker.apply(&line.parse().unwrap());
    }
    tracker
}

/// Next line the code under test sent, failing after a second of silence.
pub async fn next_sent(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("nothing sent")
        .expect("session closed")
}
