//! Mettbot binary.
//!
//! Runs the bot core with stdin as the administrative console. The chat
//! protocol client is not part of this crate: outbound requests are logged
//! and a `QUIT` ends the session.

use clap::Parser;
use mettbot_bot::{BotServer, ChannelTransport, ChatTransport, IncomingEvent, Outbound};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod cli;

const CONSOLE_QUEUE: usize = 4;
const OUTBOUND_QUEUE: usize = 256;

/// Reads stdin on a plain thread; blocking reads would otherwise hold up
/// runtime shutdown.
fn spawn_console_reader(tx: mpsc::Sender<String>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            // Nothing useful fits in a single character.
            if line.len() < 2 {
                continue;
            }
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = cli.bot_config()?;
    tracing::info!(
        host = %config.host(),
        room = %config.room(),
        nick = %config.nickname(),
        "Configuration loaded"
    );

    let (transport, mut outbound) =
        ChannelTransport::new(config.nickname(), config.display_name(), OUTBOUND_QUEUE);
    let transport = Arc::new(transport);
    transport.send(Outbound::Join(config.room().clone())).await?;

    // Stand-in for the connection owner: log what would go on the wire.
    let drain = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            tracing::info!(line = %message, "->");
            if matches!(message, Outbound::Quit(_)) {
                break;
            }
        }
    });

    let (console_tx, console_rx) = mpsc::channel(CONSOLE_QUEUE);
    spawn_console_reader(console_tx);

    // No protocol client feeds chat events here; keep the sender alive so the
    // responder waits instead of stopping.
    let (_incoming_tx, incoming_rx) = mpsc::channel::<IncomingEvent>(CONSOLE_QUEUE);

    let server = BotServer::new(config, transport);
    let shutdown = server.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted");
            shutdown.trigger();
        }
    });

    server.run(console_rx, incoming_rx).await?;
    drain.abort();

    Ok(())
}
