//! Process shutdown flag shared by the bot loops.

use std::sync::Arc;
use tokio::sync::watch;

/// Raises the shutdown flag. Cloneable; all clones share one flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Creates a lowered flag.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raises the flag. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the flag is raised.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// A listener that resolves once the flag is raised.
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Waits for a [`ShutdownSignal`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolves once shutdown has been requested. Never resolves if every
    /// signal is dropped without triggering.
    pub async fn wait(&mut self) {
        let raised = self.rx.wait_for(|stop| *stop).await.is_ok();
        if !raised {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_sees_earlier_trigger() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        let mut listener = signal.listener();
        listener.wait().await;
        assert!(signal.is_triggered());
    }
}
