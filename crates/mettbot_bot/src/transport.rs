//! Seam between the bot core and the chat connection.
//!
//! The core never speaks the chat protocol itself. It asks for outbound
//! actions through [`ChatTransport`]; whatever owns the connection performs them.

use async_trait::async_trait;
use mettbot_error::{MettbotResult, TransportError};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

/// An action requested from the chat connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Notice to a room
    Notice {
        /// Target room
        target: String,
        /// Notice text
        text: String,
    },
    /// Regular message to a room
    Privmsg {
        /// Target room
        target: String,
        /// Message text
        text: String,
    },
    /// Action ("/me") to a room
    Action {
        /// Target room
        target: String,
        /// Action text
        text: String,
    },
    /// Join a room
    Join(String),
    /// Leave a room
    Part(String),
    /// End the session with a quit message
    Quit(String),
    /// Change nickname
    Nick(String),
    /// Pass a line to the server verbatim
    Raw(String),
    /// Toggle the connection's flood mode
    SetFlood(bool),
}

impl Outbound {
    /// Notice to `target`.
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Notice {
            target: target.into(),
            text: text.into(),
        }
    }

    /// Regular message to `target`.
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Privmsg {
            target: target.into(),
            text: text.into(),
        }
    }

    /// Action to `target`.
    pub fn action(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Action {
            target: target.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice { target, text } => write!(f, "NOTICE {} :{}", target, text),
            Self::Privmsg { target, text } => write!(f, "PRIVMSG {} :{}", target, text),
            Self::Action { target, text } => {
                write!(f, "PRIVMSG {} :\u{1}ACTION {}\u{1}", target, text)
            }
            Self::Join(room) => write!(f, "JOIN {}", room),
            Self::Part(room) => write!(f, "PART {}", room),
            Self::Quit(message) => write!(f, "QUIT :{}", message),
            Self::Nick(nick) => write!(f, "NICK {}", nick),
            Self::Raw(line) => f.write_str(line),
            Self::SetFlood(enabled) => {
                write!(f, "(flood mode {})", if *enabled { "on" } else { "off" })
            }
        }
    }
}

/// Outbound side of a chat connection.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Requests an outbound action. Returns once the request is queued, not
    /// once the server has seen it.
    async fn send(&self, message: Outbound) -> MettbotResult<()>;

    /// Human-readable connection state for the console dump.
    fn describe(&self) -> String;

    /// Shorthand for [`Outbound::notice`].
    async fn notice(&self, target: &str, text: &str) -> MettbotResult<()> {
        self.send(Outbound::notice(target, text)).await
    }
}

/// Connection state tracked from the requests passing through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportState {
    /// Nickname last requested
    pub nickname: String,
    /// Display name given at startup
    pub display_name: String,
    /// Rooms joined and not parted
    pub rooms: BTreeSet<String>,
    /// Whether flood mode is on
    pub flood: bool,
    /// Requests queued so far
    pub sent: u64,
}

/// Queue-backed transport: requests go into an `mpsc` queue drained by the
/// connection owner.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Outbound>,
    state: Mutex<TransportState>,
}

impl ChannelTransport {
    /// Creates the transport and the receiving end of its queue.
    pub fn new(
        nickname: impl Into<String>,
        display_name: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        let state = TransportState {
            nickname: nickname.into(),
            display_name: display_name.into(),
            ..TransportState::default()
        };
        (
            Self {
                tx,
                state: Mutex::new(state),
            },
            rx,
        )
    }

    /// Copy of the tracked state.
    pub fn state(&self) -> TransportState {
        self.state.lock().clone()
    }

    fn track(&self, message: &Outbound) {
        let mut state = self.state.lock();
        state.sent += 1;
        match message {
            Outbound::Join(room) => {
                state.rooms.insert(room.clone());
            }
            Outbound::Part(room) => {
                state.rooms.remove(room);
            }
            Outbound::Nick(nick) => state.nickname = nick.clone(),
            Outbound::SetFlood(enabled) => state.flood = *enabled,
            _ => {}
        }
    }
}

#[async_trait]
impl ChatTransport for ChannelTransport {
    async fn send(&self, message: Outbound) -> MettbotResult<()> {
        debug!(line = %message, "Queueing outbound request");
        let permit = self
            .tx
            .reserve()
            .await
            .map_err(|_| TransportError::new("outbound queue closed"))?;
        // Only requests that actually reach the queue are counted.
        self.track(&message);
        permit.send(message);
        Ok(())
    }

    fn describe(&self) -> String {
        let state = self.state.lock();
        let rooms: Vec<&str> = state.rooms.iter().map(String::as_str).collect();
        format!(
            "nick: {}\nname: {}\nrooms: {}\nflood: {}\nrequests sent: {}",
            state.nickname,
            state.display_name,
            rooms.join(" "),
            state.flood,
            state.sent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_renders_protocol_lines() {
        assert_eq!(
            Outbound::notice("#mett", "hi").to_string(),
            "NOTICE #mett :hi"
        );
        assert_eq!(
            Outbound::action("#mett", "waves").to_string(),
            "PRIVMSG #mett :\u{1}ACTION waves\u{1}"
        );
        assert_eq!(Outbound::Quit("bye".into()).to_string(), "QUIT :bye");
    }

    #[tokio::test]
    async fn test_channel_transport_tracks_state() {
        let (transport, mut rx) = ChannelTransport::new("rohmett", "Le MettBot", 8);
        transport.send(Outbound::Join("#a".into())).await.unwrap();
        transport.send(Outbound::Join("#b".into())).await.unwrap();
        transport.send(Outbound::Part("#a".into())).await.unwrap();
        transport.send(Outbound::SetFlood(true)).await.unwrap();

        let state = transport.state();
        assert_eq!(state.rooms.len(), 1);
        assert!(state.rooms.contains("#b"));
        assert!(state.flood);
        assert_eq!(state.sent, 4);
        assert_eq!(rx.recv().await, Some(Outbound::Join("#a".into())));
    }

    #[tokio::test]
    async fn test_send_fails_when_queue_closed() {
        let (transport, rx) = ChannelTransport::new("rohmett", "Le MettBot", 1);
        drop(rx);
        assert!(transport.notice("#mett", "hello").await.is_err());
        assert!(transport.send(Outbound::Join("#a".into())).await.is_err());

        let state = transport.state();
        assert_eq!(state.sent, 0);
        assert!(state.rooms.is_empty());
    }
}
