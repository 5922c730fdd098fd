use crate::config::{BotConfig, SharedConfig};
use crate::notifier::{ContentSource, HourClock, IdleNotifier, LocalClock, NotifierPhrases};
use crate::responder::{IncomingEvent, LinkResolver, Responder, ResponderPhrases};
use crate::router::CommandRouter;
use crate::shutdown::ShutdownSignal;
use crate::transport::ChatTransport;
use crate::writer::{StoreKind, StoreWriter};
use mettbot_error::MettbotResult;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

const STORE_QUEUE: usize = 32;
const NOTIFIER_QUEUE: usize = 32;

/// Bot server that orchestrates the store writers, notifier, responder and
/// console router.
pub struct BotServer {
    config: BotConfig,
    transport: Arc<dyn ChatTransport>,
    clock: Arc<dyn HourClock>,
    resolver: Option<Arc<dyn LinkResolver>>,
    shutdown: ShutdownSignal,
}

impl BotServer {
    /// Creates a bot server talking through `transport`.
    pub fn new(config: BotConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            config,
            transport,
            clock: Arc::new(LocalClock),
            resolver: None,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Replaces the local wall clock used for quiet hours.
    pub fn with_clock(mut self, clock: Arc<dyn HourClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attaches a link resolver.
    pub fn with_link_resolver(mut self, resolver: Arc<dyn LinkResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Signal that stops the server, e.g. from a Ctrl-C handler.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Starts every loop and returns once shutdown has been requested and
    /// all of them have finished.
    #[instrument(skip_all)]
    pub async fn run(
        self,
        console: mpsc::Receiver<String>,
        incoming: mpsc::Receiver<IncomingEvent>,
    ) -> MettbotResult<()> {
        info!("Starting bot server");

        let shared = SharedConfig::new(self.config.runtime()?);

        let (quotes, quotes_task) = StoreWriter::spawn(
            StoreKind::Quotes,
            shared.clone(),
            Arc::clone(&self.transport),
            STORE_QUEUE,
        );
        let (metts, metts_task) = StoreWriter::spawn(
            StoreKind::IdleContent,
            shared.clone(),
            Arc::clone(&self.transport),
            STORE_QUEUE,
        );

        let content: Arc<dyn ContentSource> = Arc::new(metts.clone());
        let (notifier, notifier_task) = IdleNotifier::spawn(
            shared.clone(),
            Arc::clone(&self.transport),
            content,
            Arc::clone(&self.clock),
            NotifierPhrases {
                idle_template: self.config.idle_template().clone(),
                acknowledgement: self.config.force_ack().clone(),
            },
            NOTIFIER_QUEUE,
        );

        // The responder holds the only notifier and store handles, so once it
        // stops every downstream queue closes and those loops drain out.
        let mut responder = Responder::new(
            shared.clone(),
            Arc::clone(&self.transport),
            quotes,
            metts,
            notifier,
            ResponderPhrases {
                time_format: self.config.time_format().clone(),
                special_event_replies: self.config.special_event_replies().clone(),
            },
        );
        if let Some(resolver) = self.resolver {
            responder = responder.with_link_resolver(resolver);
        }
        let responder_task = tokio::spawn(responder.run(incoming, self.shutdown.listener()));

        let router = CommandRouter::new(
            shared,
            Arc::clone(&self.transport),
            self.config.flood_phrase().clone(),
            self.shutdown.clone(),
        );
        let router_task = tokio::spawn(router.run(console, self.shutdown.listener()));

        self.shutdown.listener().wait().await;
        info!("Shutdown requested");

        for (name, task) in [
            ("router", router_task),
            ("responder", responder_task),
            ("notifier", notifier_task),
            ("mett writer", metts_task),
            ("quote writer", quotes_task),
        ] {
            if let Err(e) = task.await {
                error!(task = name, error = %e, "Bot task failed");
            }
        }

        info!("Bot server stopped");
        Ok(())
    }
}
