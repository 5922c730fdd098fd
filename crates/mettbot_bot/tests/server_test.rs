//! End-to-end tests for the bot server.

mod test_utils;

use mettbot_bot::{BotServer, IncomingEvent, Outbound};
use std::time::Duration;
use tempfile::TempDir;
use test_utils::{FixedHour, ROOM, config_in, drain, transport};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_console_quit_stops_every_loop() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let quote_path = config.quote_path().clone();
    let (transport, mut out) = transport();

    let server = BotServer::new(config, transport).with_clock(FixedHour::new(12));
    let (console_tx, console_rx) = mpsc::channel(8);
    let (incoming_tx, incoming_rx) = mpsc::channel(8);

    incoming_tx
        .send(IncomingEvent::Message {
            room: ROOM.to_string(),
            sender: "hungry".to_string(),
            text: "!quote served".to_string(),
        })
        .await
        .unwrap();

    let run = tokio::spawn(server.run(console_rx, incoming_rx));

    // Let the quote land before quitting.
    let added = tokio::time::timeout(Duration::from_secs(5), out.recv())
        .await
        .unwrap();
    assert_eq!(added, Some(Outbound::notice(ROOM, "Quote #0 added")));

    console_tx.send(":n bye soon".to_string()).await.unwrap();
    console_tx.send(":q gone".to_string()).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("server stops after quit")
        .unwrap()
        .unwrap();

    let rest = drain(&mut out);
    assert_eq!(
        rest,
        vec![
            Outbound::notice(ROOM, "bye soon"),
            Outbound::Quit("gone".to_string()),
        ]
    );
    assert!(std::fs::read_to_string(quote_path).unwrap().ends_with(" served\n"));
}

#[tokio::test]
async fn test_external_shutdown_signal() {
    let dir = TempDir::new().unwrap();
    let (transport, _out) = transport();
    let server = BotServer::new(config_in(dir.path()), transport);
    let signal = server.shutdown_signal();
    let (_console_tx, console_rx) = mpsc::channel::<String>(1);
    let (_incoming_tx, incoming_rx) = mpsc::channel(1);

    let run = tokio::spawn(server.run(console_rx, incoming_rx));
    signal.trigger();

    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("server stops on signal")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_invalid_link_pattern_fails_startup() {
    let dir = TempDir::new().unwrap();
    let (transport, _out) = transport();
    let config = config_in(dir.path()).with_link_pattern("(unclosed");
    let server = BotServer::new(config, transport);
    let (_console_tx, console_rx) = mpsc::channel::<String>(1);
    let (_incoming_tx, incoming_rx) = mpsc::channel(1);

    assert!(server.run(console_rx, incoming_rx).await.is_err());
}

#[tokio::test]
async fn test_out_of_range_startup_values_fail_startup() {
    let dir = TempDir::new().unwrap();
    for config in [
        config_in(dir.path()).with_command_probability(1.5),
        config_in(dir.path()).with_special_event_probability(f64::NAN),
        config_in(dir.path()).with_idle_hours(u64::MAX),
    ] {
        let (transport, mut out) = transport();
        let server = BotServer::new(config, transport);
        let (_console_tx, console_rx) = mpsc::channel::<String>(1);
        let (_incoming_tx, incoming_rx) = mpsc::channel(1);

        assert!(server.run(console_rx, incoming_rx).await.is_err());
        assert!(drain(&mut out).is_empty());
    }
}
