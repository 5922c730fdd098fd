//! Event coordination core of the Mettbot chat-room bot.
//!
//! Independent loops talk only through queues:
//! - **StoreWriter**: one per line store, serializes appends and reads
//! - **IdleNotifier**: posts stored content after a quiet period
//! - **CommandRouter**: executes administrative console lines
//! - **Responder**: reacts to chat traffic
//!
//! [`BotServer`] wires them together around a [`ChatTransport`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod notifier;
mod responder;
mod router;
mod server;
mod shutdown;
mod topic;
mod transport;
mod writer;

pub use config::{BotConfig, ConfigKey, MAX_IDLE_HOURS, RuntimeConfig, SharedConfig};
pub use notifier::{
    ContentSource, ERROR_PLACEHOLDER, HourClock, IdleNotifier, LocalClock,
    NotifierHandle, NotifierMessage, NotifierPhrases, QUIET_END_HOUR, QUIET_START_HOUR,
    is_quiet_hour, render_template,
};
pub use responder::{IncomingEvent, LinkResolver, Responder, ResponderPhrases};
pub use router::{CommandRouter, ConsoleLine, FLOOD_BURST, ParsedCommand, SENTINEL};
pub use server::BotServer;
pub use shutdown::{ShutdownListener, ShutdownSignal};
pub use topic::{DiffSpan, diff_words, has_changes, render_irc};
pub use transport::{ChannelTransport, ChatTransport, Outbound, TransportState};
pub use writer::{StoreHandle, StoreKind, StoreMessage, StoreWriter};
