//! Idle timer that posts stored content when the room has been quiet.
//!
//! The loop waits on whichever comes first: a forced trigger, a suppressing
//! event, an off-topic message, or the idle deadline. Only suppressing events
//! and emissions move the deadline; a forced trigger answers immediately and
//! leaves the idle clock alone.

use crate::config::SharedConfig;
use crate::transport::{ChatTransport, Outbound};
use crate::writer::StoreHandle;
use async_trait::async_trait;
use chrono::Timelike;
use mettbot_error::StorageResult;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, warn};

/// First hour of the quiet window.
pub const QUIET_START_HOUR: u32 = 1;
/// First hour after the quiet window.
pub const QUIET_END_HOUR: u32 = 8;

/// Placeholder posted when no content could be selected.
pub const ERROR_PLACEHOLDER: &str = "Error";

/// Whether idle emissions are muted at `hour` (local, 0-23).
///
/// # Examples
///
/// ```
/// use mettbot_bot::is_quiet_hour;
///
/// assert!(!is_quiet_hour(0));
/// assert!(is_quiet_hour(1));
/// assert!(is_quiet_hour(7));
/// assert!(!is_quiet_hour(8));
/// ```
pub fn is_quiet_hour(hour: u32) -> bool {
    (QUIET_START_HOUR..QUIET_END_HOUR).contains(&hour)
}

/// Fills `template`'s first `{}` with `line`, or appends it.
pub fn render_template(template: &str, line: &str) -> String {
    if template.contains("{}") {
        template.replacen("{}", line, 1)
    } else {
        format!("{} {}", template, line)
    }
}

/// Source of the current local hour.
pub trait HourClock: Send + Sync {
    /// Hour of day, 0-23.
    fn current_hour(&self) -> u32;
}

/// Wall clock in the process's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl HourClock for LocalClock {
    fn current_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Where idle content comes from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// A uniformly random stored line.
    async fn random_line(&self) -> StorageResult<String>;
}

#[async_trait]
impl ContentSource for StoreHandle {
    async fn random_line(&self) -> StorageResult<String> {
        StoreHandle::random_line(self).await
    }
}

/// Inputs of the notifier loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierMessage {
    /// Something interesting happened; restart the idle window.
    Suppress,
    /// Answer with the acknowledgement now.
    ForceTrigger,
    /// An off-topic message was seen.
    Observe,
}

/// Texts the notifier posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierPhrases {
    /// Idle notice template; `{}` takes the selected line
    pub idle_template: String,
    /// Forced-trigger acknowledgement
    pub acknowledgement: String,
}

/// Idle bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IdleState {
    /// Last suppressing event (or start)
    last_suppressed_at: Instant,
    /// Off-topic messages since then
    messages_since: u64,
}

impl IdleState {
    fn reset(&mut self) {
        self.last_suppressed_at = Instant::now();
        self.messages_since = 0;
    }
}

/// Long-lived idle notifier task.
pub struct IdleNotifier {
    config: SharedConfig,
    transport: Arc<dyn ChatTransport>,
    content: Arc<dyn ContentSource>,
    clock: Arc<dyn HourClock>,
    phrases: NotifierPhrases,
    rx: mpsc::Receiver<NotifierMessage>,
    state: IdleState,
}

impl IdleNotifier {
    /// Creates a notifier reading from `rx`.
    pub fn new(
        config: SharedConfig,
        transport: Arc<dyn ChatTransport>,
        content: Arc<dyn ContentSource>,
        clock: Arc<dyn HourClock>,
        phrases: NotifierPhrases,
        rx: mpsc::Receiver<NotifierMessage>,
    ) -> Self {
        Self {
            config,
            transport,
            content,
            clock,
            phrases,
            rx,
            state: IdleState {
                last_suppressed_at: Instant::now(),
                messages_since: 0,
            },
        }
    }

    /// Spawns a notifier and returns its handle and task.
    pub fn spawn(
        config: SharedConfig,
        transport: Arc<dyn ChatTransport>,
        content: Arc<dyn ContentSource>,
        clock: Arc<dyn HourClock>,
        phrases: NotifierPhrases,
        capacity: usize,
    ) -> (NotifierHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let notifier = Self::new(config, transport, content, clock, phrases, rx);
        (NotifierHandle { tx }, tokio::spawn(notifier.run()))
    }

    fn next_deadline(&self) -> Instant {
        // Read on every restart so a changed threshold applies from the next cycle.
        Instant::now() + self.config.read(|c| c.idle_window())
    }

    /// Runs until every [`NotifierHandle`] is dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Idle notifier started");
        let mut deadline = self.next_deadline();

        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(NotifierMessage::ForceTrigger) => self.acknowledge().await,
                    Some(NotifierMessage::Suppress) => {
                        self.state.reset();
                        deadline = self.next_deadline();
                        debug!("Idle clock reset");
                    }
                    Some(NotifierMessage::Observe) => {
                        self.state.messages_since += 1;
                        let limit = self.config.read(|c| c.idle_messages);
                        if limit > 0 && self.state.messages_since >= limit {
                            debug!(messages = self.state.messages_since, "Off-topic threshold reached");
                            self.attempt_emission().await;
                            deadline = self.next_deadline();
                        }
                    }
                    None => break,
                },
                _ = sleep_until(deadline) => {
                    let quiet_for = self.state.last_suppressed_at.elapsed();
                    debug!(?quiet_for, "Idle threshold elapsed");
                    self.attempt_emission().await;
                    deadline = self.next_deadline();
                }
            }
        }

        info!("Idle notifier stopped");
    }

    async fn acknowledge(&self) {
        let room = self.config.room();
        self.post(Outbound::notice(room, self.phrases.acknowledgement.clone()))
            .await;
    }

    async fn attempt_emission(&mut self) {
        self.state.messages_since = 0;

        let hour = self.clock.current_hour();
        if is_quiet_hour(hour) {
            debug!(hour, "Quiet hours, skipping idle content");
            return;
        }

        let line = match self.content.random_line().await {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "Failed to select idle content");
                ERROR_PLACEHOLDER.to_string()
            }
        };

        let room = self.config.room();
        let text = render_template(&self.phrases.idle_template, &line);
        info!(room = %room, "Posting idle content");
        self.post(Outbound::notice(room, text)).await;
    }

    async fn post(&self, message: Outbound) {
        if let Err(e) = self.transport.send(message).await {
            warn!(error = %e, "Failed to queue notifier output");
        }
    }
}

/// Cloneable client of an [`IdleNotifier`].
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<NotifierMessage>,
}

impl NotifierHandle {
    /// Restarts the idle window without posting anything.
    pub async fn suppress(&self) {
        self.deliver(NotifierMessage::Suppress).await;
    }

    /// Posts the acknowledgement now; the idle window is unaffected.
    pub async fn force_trigger(&self) {
        self.deliver(NotifierMessage::ForceTrigger).await;
    }

    /// Counts one off-topic message.
    pub async fn observe_message(&self) {
        self.deliver(NotifierMessage::Observe).await;
    }

    async fn deliver(&self, msg: NotifierMessage) {
        if self.tx.send(msg).await.is_err() {
            debug!(?msg, "Notifier stopped, dropping input");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        assert_eq!(render_template("Mett: {}!", "Zwiebel"), "Mett: Zwiebel!");
        assert_eq!(render_template("{} and {}", "a"), "a and {}");
        assert_eq!(render_template("Mett:", "Zwiebel"), "Mett: Zwiebel");
    }

    #[test]
    fn test_quiet_window_bounds() {
        let quiet: Vec<u32> = (0..24).filter(|h| is_quiet_hour(*h)).collect();
        assert_eq!(quiet, vec![1, 2, 3, 4, 5, 6, 7]);
    }
}
