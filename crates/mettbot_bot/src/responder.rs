//! Reactions to chat traffic.
//!
//! The chat connection feeds [`IncomingEvent`]s in; the responder stores and
//! recalls quotes, keeps the idle notifier informed and reports topic changes.

use crate::config::SharedConfig;
use crate::notifier::{ERROR_PLACEHOLDER, NotifierHandle};
use crate::shutdown::ShutdownListener;
use crate::topic::{diff_words, has_changes, render_irc};
use crate::transport::{ChatTransport, Outbound};
use crate::writer::StoreHandle;
use async_trait::async_trait;
use mettbot_error::MettbotResult;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Something that happened in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingEvent {
    /// A chat message
    Message {
        /// Room it was said in
        room: String,
        /// Who said it
        sender: String,
        /// What was said
        text: String,
    },
    /// The room topic is now `topic`
    Topic {
        /// Room whose topic changed
        room: String,
        /// New topic
        topic: String,
    },
}

/// Turns a recognized link into text worth posting.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Resolves `link`; `captures` are the link pattern's capture groups.
    async fn resolve(&self, link: &str, captures: &[Option<String>]) -> MettbotResult<String>;
}

/// Texts and formats the responder uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderPhrases {
    /// `chrono` format prefixed to stored quotes
    pub time_format: String,
    /// Special-event replies
    pub special_event_replies: Vec<String>,
}

/// Word that marks a message as on-topic.
const TOPIC_WORD: &str = "mett";

/// Current local time in `format`, or RFC 3339 if `format` is invalid.
fn timestamp(format: &str) -> String {
    use std::fmt::Write;

    let now = chrono::Local::now();
    let mut out = String::new();
    if write!(out, "{}", now.format(format)).is_err() {
        warn!(format, "Invalid time format, falling back to RFC 3339");
        return now.to_rfc3339();
    }
    out
}

/// Chat responder task.
pub struct Responder {
    config: SharedConfig,
    transport: Arc<dyn ChatTransport>,
    quotes: StoreHandle,
    metts: StoreHandle,
    notifier: NotifierHandle,
    resolver: Option<Arc<dyn LinkResolver>>,
    phrases: ResponderPhrases,
    topics: HashMap<String, String>,
}

impl Responder {
    /// Creates a responder.
    pub fn new(
        config: SharedConfig,
        transport: Arc<dyn ChatTransport>,
        quotes: StoreHandle,
        metts: StoreHandle,
        notifier: NotifierHandle,
        phrases: ResponderPhrases,
    ) -> Self {
        Self {
            config,
            transport,
            quotes,
            metts,
            notifier,
            resolver: None,
            phrases,
            topics: HashMap::new(),
        }
    }

    /// Attaches a link resolver.
    pub fn with_link_resolver(mut self, resolver: Arc<dyn LinkResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Handles events until the stream ends or shutdown is requested.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut events: mpsc::Receiver<IncomingEvent>, mut stop: ShutdownListener) {
        info!("Responder started");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                _ = stop.wait() => break,
            }
        }

        info!("Responder stopped");
    }

    /// Handles one event.
    pub async fn handle(&mut self, event: IncomingEvent) {
        match event {
            IncomingEvent::Message { room, sender, text } => {
                if let Some(command) = text.strip_prefix('!') {
                    self.command(&room, &sender, command).await;
                } else {
                    self.chatter(&room, &text).await;
                }
            }
            IncomingEvent::Topic { room, topic } => self.topic(room, topic).await,
        }
    }

    async fn command(&self, room: &str, sender: &str, command: &str) {
        let probability = self.config.read(|c| c.command_probability);
        if rand::thread_rng().gen_bool(probability) {
            debug!(%sender, command, "Ignoring command this time");
            return;
        }

        let (verb, arg) = match command.split_once(' ') {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (command, ""),
        };

        match (verb, arg.is_empty()) {
            ("quote", false) => self.add_line(room, &self.quotes, arg, "Quote").await,
            ("quote", true) => self.recall(room, &self.quotes).await,
            ("mett", false) => {
                self.add_line(room, &self.metts, arg, "Mett").await;
                self.notifier.suppress().await;
            }
            ("mett", true) => {
                self.recall(room, &self.metts).await;
                self.notifier.suppress().await;
            }
            ("dong", _) => self.notifier.force_trigger().await,
            _ => debug!(%sender, verb, "Unknown chat command"),
        }
    }

    async fn add_line(&self, room: &str, store: &StoreHandle, text: &str, label: &str) {
        let payload = format!(
            "{} {}\n",
            timestamp(&self.phrases.time_format),
            text.replace(['\r', '\n'], " ")
        );

        match store.append(payload).await {
            Ok(index) => {
                info!(store = %store.kind(), index, "Stored line");
                self.post(Outbound::notice(room, format!("{} #{} added", label, index)))
                    .await;
            }
            // The writer has already told the room about I/O failures.
            Err(e) => warn!(error = %e, "Storing line failed"),
        }
    }

    async fn recall(&self, room: &str, store: &StoreHandle) {
        let line = match store.random_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Recalling line failed");
                ERROR_PLACEHOLDER.to_string()
            }
        };
        self.post(Outbound::notice(room, line)).await;
    }

    async fn chatter(&self, room: &str, text: &str) {
        if text.to_lowercase().contains(TOPIC_WORD) {
            self.notifier.suppress().await;
        } else {
            self.notifier.observe_message().await;
        }

        self.resolve_links(room, text).await;

        if text.trim_end().ends_with('?') {
            self.maybe_special_event(room);
        }
    }

    async fn resolve_links(&self, room: &str, text: &str) {
        let Some(resolver) = &self.resolver else {
            return;
        };
        let links: Vec<(String, Vec<Option<String>>)> = self.config.read(|c| {
            c.link_pattern
                .captures_iter(text)
                .map(|caps| {
                    let link = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                    let groups = caps
                        .iter()
                        .skip(1)
                        .map(|m| m.map(|m| m.as_str().to_string()))
                        .collect();
                    (link.to_string(), groups)
                })
                .collect()
        });

        for (link, captures) in links {
            match resolver.resolve(&link, &captures).await {
                Ok(text) if !text.is_empty() => self.post(Outbound::notice(room, text)).await,
                Ok(_) => debug!(%link, "Link resolved to nothing"),
                Err(e) => warn!(error = %e, %link, "Link lookup failed"),
            }
        }
    }

    fn maybe_special_event(&self, room: &str) {
        let probability = self.config.read(|c| c.special_event_probability);
        let (reply, delay) = {
            let mut rng = rand::thread_rng();
            if !rng.gen_bool(probability) {
                return;
            }
            let Some(reply) = self.phrases.special_event_replies.choose(&mut rng) else {
                return;
            };
            (reply.clone(), Duration::from_secs(rng.gen_range(3..=5)))
        };

        let transport = Arc::clone(&self.transport);
        let message = Outbound::notice(room, reply);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = transport.send(message).await {
                warn!(error = %e, "Failed to send special-event reply");
            }
        });
    }

    async fn topic(&mut self, room: String, topic: String) {
        let Some(previous) = self.topics.insert(room.clone(), topic.clone()) else {
            debug!(%room, "First topic seen");
            return;
        };

        let spans = diff_words(&previous, &topic);
        if has_changes(&spans) {
            self.post(Outbound::notice(room, render_irc(&spans))).await;
        }
    }

    async fn post(&self, message: Outbound) {
        if let Err(e) = self.transport.send(message).await {
            warn!(error = %e, "Failed to queue reply");
        }
    }
}
