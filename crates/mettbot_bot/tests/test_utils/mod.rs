//! Shared fixtures for the bot integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use mettbot_bot::{
    BotConfig, ChannelTransport, ContentSource, HourClock, Outbound, SharedConfig,
};
use mettbot_error::{StorageError, StorageErrorKind, StorageResult};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

pub const ROOM: &str = "#metttest";

/// Config with stores under `dir` and no randomness in command handling.
pub fn config_in(dir: &Path) -> BotConfig {
    BotConfig::default()
        .with_quote_path(dir.join("quotes.txt"))
        .with_idle_content_path(dir.join("metts.txt"))
        .with_command_probability(0.0)
        .with_special_event_probability(0.0)
}

pub fn shared(config: &BotConfig) -> SharedConfig {
    SharedConfig::new(config.runtime().expect("valid runtime config"))
}

pub fn transport() -> (Arc<ChannelTransport>, mpsc::Receiver<Outbound>) {
    let (transport, rx) = ChannelTransport::new("rohmett", "Le MettBot", 256);
    (Arc::new(transport), rx)
}

/// Everything queued so far.
pub fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}

/// Clock pinned to an adjustable hour.
#[derive(Debug)]
pub struct FixedHour(AtomicU32);

impl FixedHour {
    pub fn new(hour: u32) -> Arc<Self> {
        Arc::new(Self(AtomicU32::new(hour)))
    }

    pub fn set(&self, hour: u32) {
        self.0.store(hour, Ordering::SeqCst);
    }
}

impl HourClock for FixedHour {
    fn current_hour(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-memory content that always yields its first line.
#[derive(Debug, Default)]
pub struct StaticContent(pub Vec<String>);

#[async_trait]
impl ContentSource for StaticContent {
    async fn random_line(&self) -> StorageResult<String> {
        self.0.first().cloned().ok_or_else(|| {
            StorageError::new(StorageErrorKind::NoContent("static".to_string()))
        })
    }
}
