//! Serialized access to the line stores.
//!
//! One [`StoreWriter`] task owns each store. Appends and reads queue up on its
//! channel and run strictly one at a time in arrival order, so a read never
//! observes a half-written line and two appends never interleave.

use crate::config::{RuntimeConfig, SharedConfig};
use crate::transport::ChatTransport;
use mettbot_error::{StorageError, StorageErrorKind, StorageResult};
use mettbot_store::LineStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// The stores the bot keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum StoreKind {
    /// Quote database
    #[strum(to_string = "quote")]
    Quotes,
    /// Idle-content database
    #[strum(to_string = "mett")]
    IdleContent,
}

impl StoreKind {
    /// Current path of this store.
    pub fn path(self, config: &RuntimeConfig) -> PathBuf {
        match self {
            Self::Quotes => config.quote_path.clone(),
            Self::IdleContent => config.idle_content_path.clone(),
        }
    }
}

/// Requests a [`StoreWriter`] serves.
#[derive(Debug)]
pub enum StoreMessage {
    /// Append a payload verbatim; the reply carries the pre-append line count.
    Append {
        /// Text to append, normally one `\n`-terminated line
        payload: String,
        /// Reply port for the line count
        reply: oneshot::Sender<StorageResult<usize>>,
    },
    /// Pick a uniformly random stored line.
    RandomLine {
        /// Reply port for the selected line
        reply: oneshot::Sender<StorageResult<String>>,
    },
    /// Count stored lines.
    LineCount {
        /// Reply port for the count
        reply: oneshot::Sender<StorageResult<usize>>,
    },
}

/// Task owning one line store.
pub struct StoreWriter {
    kind: StoreKind,
    config: SharedConfig,
    transport: Arc<dyn ChatTransport>,
    rx: mpsc::Receiver<StoreMessage>,
}

impl StoreWriter {
    /// Creates a writer for `kind` reading from `rx`.
    pub fn new(
        kind: StoreKind,
        config: SharedConfig,
        transport: Arc<dyn ChatTransport>,
        rx: mpsc::Receiver<StoreMessage>,
    ) -> Self {
        Self {
            kind,
            config,
            transport,
            rx,
        }
    }

    /// Spawns a writer and returns its handle and task.
    pub fn spawn(
        kind: StoreKind,
        config: SharedConfig,
        transport: Arc<dyn ChatTransport>,
        capacity: usize,
    ) -> (StoreHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let writer = Self::new(kind, config, transport, rx);
        let task = tokio::spawn(writer.run());
        (StoreHandle { kind, tx }, task)
    }

    /// Serves requests until every [`StoreHandle`] is dropped.
    #[instrument(skip(self), fields(store = %self.kind))]
    pub async fn run(mut self) {
        info!("Store writer started");

        while let Some(msg) = self.rx.recv().await {
            self.handle(msg).await;
        }

        info!("Store writer stopped");
    }

    async fn handle(&self, msg: StoreMessage) {
        // Resolved per request so a console path change applies to the next one.
        let store = LineStore::new(self.config.read(|c| self.kind.path(c)));

        match msg {
            StoreMessage::Append { payload, reply } => {
                let pending = match store.begin_append() {
                    Ok(pending) => pending,
                    Err(e) => {
                        self.report(&e, format!("Couldn't open {} database", self.kind))
                            .await;
                        let _ = reply.send(Err(e));
                        return;
                    }
                };

                let existing = pending.existing();
                if reply.send(Ok(existing)).is_err() {
                    debug!(existing, "Requester left before receiving the line count");
                }

                match pending.write(&payload) {
                    Ok(()) => debug!(line = existing, "Appended to line store"),
                    Err(e) => {
                        self.report(&e, format!("Couldn't write to {} database", self.kind))
                            .await
                    }
                }
            }
            StoreMessage::RandomLine { reply } => {
                let result = store.random_line();
                if let Err(e) = &result {
                    if !e.is_no_content() {
                        self.report(e, self.read_failure(e)).await;
                    }
                }
                let _ = reply.send(result);
            }
            StoreMessage::LineCount { reply } => {
                let result = store.line_count();
                if let Err(e) = &result {
                    self.report(e, self.read_failure(e)).await;
                }
                let _ = reply.send(result);
            }
        }
    }

    fn read_failure(&self, error: &StorageError) -> String {
        match error.kind {
            StorageErrorKind::Open(_) => format!("Failed to open {} database", self.kind),
            _ => format!("Failed to read from {} database", self.kind),
        }
    }

    async fn report(&self, error: &StorageError, notice: String) {
        error!(error = %error, "Line store operation failed");
        let room = self.config.room();
        if let Err(e) = self.transport.notice(&room, &notice).await {
            warn!(error = %e, "Could not report store failure to the room");
        }
    }
}

/// Cloneable client of a [`StoreWriter`].
#[derive(Debug, Clone)]
pub struct StoreHandle {
    kind: StoreKind,
    tx: mpsc::Sender<StoreMessage>,
}

impl StoreHandle {
    /// Which store this handle talks to.
    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Appends `payload` and returns the number of lines stored before it,
    /// which is also the new line's index.
    pub async fn append(&self, payload: impl Into<String>) -> StorageResult<usize> {
        let payload = payload.into();
        self.request(|reply| StoreMessage::Append { payload, reply })
            .await
    }

    /// Picks a uniformly random stored line.
    pub async fn random_line(&self) -> StorageResult<String> {
        self.request(|reply| StoreMessage::RandomLine { reply }).await
    }

    /// Counts stored lines.
    pub async fn line_count(&self) -> StorageResult<usize> {
        self.request(|reply| StoreMessage::LineCount { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<StorageResult<T>>) -> StoreMessage,
    ) -> StorageResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| self.unavailable())?;
        rx.await.map_err(|_| self.unavailable())?
    }

    fn unavailable(&self) -> StorageError {
        StorageError::new(StorageErrorKind::Unavailable(format!(
            "{} writer stopped",
            self.kind
        )))
    }
}
