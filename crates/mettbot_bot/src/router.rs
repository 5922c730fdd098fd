//! Administrative console commands.
//!
//! A console line starting with [`SENTINEL`] is a command:
//! `<sentinel><verb>[<modifier>...] <rest>`. Any other line is passed to the
//! chat server verbatim.

use crate::config::{ConfigKey, SharedConfig};
use crate::shutdown::{ShutdownListener, ShutdownSignal};
use crate::transport::{ChatTransport, Outbound};
use mettbot_error::{CommandError, CommandErrorKind, MettbotResult};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

/// Marks a console line as a command.
pub const SENTINEL: char = ':';

/// Messages sent by one flood burst.
pub const FLOOD_BURST: usize = 20;

/// A console command split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Command letter
    pub verb: char,
    /// Character right after the verb, if any and not a space
    pub modifier: Option<char>,
    /// Everything after the first space
    pub rest: Option<String>,
}

/// Classification of one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    /// A command line
    Command(ParsedCommand),
    /// A line for the chat server
    Raw(String),
    /// A bare sentinel
    Empty,
}

impl ConsoleLine {
    /// Classifies `line`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mettbot_bot::{ConsoleLine, ParsedCommand};
    ///
    /// assert_eq!(
    ///     ConsoleLine::parse(":m hello there"),
    ///     ConsoleLine::Command(ParsedCommand {
    ///         verb: 'm',
    ///         modifier: None,
    ///         rest: Some("hello there".to_string()),
    ///     })
    /// );
    /// assert_eq!(ConsoleLine::parse("PING x"), ConsoleLine::Raw("PING x".to_string()));
    /// ```
    pub fn parse(line: &str) -> Self {
        let Some(body) = line.strip_prefix(SENTINEL) else {
            return Self::Raw(line.to_string());
        };

        let mut chars = body.chars();
        let Some(verb) = chars.next() else {
            return Self::Empty;
        };
        let modifier = chars.next().filter(|c| *c != ' ');
        let rest = body.split_once(' ').map(|(_, rest)| rest.to_string());

        Self::Command(ParsedCommand {
            verb,
            modifier,
            rest,
        })
    }
}

/// Splits `<key> <value>` and resolves the key.
fn parse_setting(rest: &str) -> Result<(ConfigKey, &str), CommandError> {
    let (name, value) = rest
        .split_once(' ')
        .ok_or_else(|| CommandError::new(CommandErrorKind::WrongSyntax))?;
    let key = ConfigKey::from_str(name)
        .map_err(|_| CommandError::new(CommandErrorKind::UnknownVariable(name.to_string())))?;
    Ok((key, value))
}

/// Executes console lines against the shared configuration and the chat
/// transport.
pub struct CommandRouter {
    config: SharedConfig,
    transport: Arc<dyn ChatTransport>,
    flood_phrase: String,
    shutdown: ShutdownSignal,
}

impl CommandRouter {
    /// Creates a router.
    pub fn new(
        config: SharedConfig,
        transport: Arc<dyn ChatTransport>,
        flood_phrase: impl Into<String>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            config,
            transport,
            flood_phrase: flood_phrase.into(),
            shutdown,
        }
    }

    /// Reads console lines until the console closes or shutdown is requested,
    /// printing whatever the commands produce.
    #[instrument(skip_all)]
    pub async fn run(self, mut lines: mpsc::Receiver<String>, mut stop: ShutdownListener) {
        info!("Command router started");

        loop {
            tokio::select! {
                line = lines.recv() => match line {
                    Some(line) => match self.dispatch(&line).await {
                        Ok(Some(output)) => println!("{}", output),
                        Ok(None) => {}
                        Err(e) => error!(error = %e, "Console command failed"),
                    },
                    None => {
                        info!("Console closed");
                        break;
                    }
                },
                _ = stop.wait() => break,
            }
        }

        info!("Command router stopped");
    }

    /// Executes one console line. `Ok(Some(text))` is console output,
    /// including messages about malformed input; `Err` means the chat
    /// transport refused the request.
    pub async fn dispatch(&self, line: &str) -> MettbotResult<Option<String>> {
        let cmd = match ConsoleLine::parse(line) {
            ConsoleLine::Raw(raw) => {
                self.transport.send(Outbound::Raw(raw)).await?;
                return Ok(None);
            }
            ConsoleLine::Empty => return Ok(None),
            ConsoleLine::Command(cmd) => cmd,
        };

        match (cmd.verb, cmd.rest) {
            ('d', _) => Ok(Some(self.dump())),
            ('f', _) => {
                self.flood(cmd.modifier).await?;
                Ok(None)
            }
            (_, None) => {
                debug!(verb = %cmd.verb, "Command without argument ignored");
                Ok(None)
            }
            ('q', Some(message)) => {
                info!("Quit requested from console");
                self.shutdown.trigger();
                self.transport.send(Outbound::Quit(message)).await?;
                Ok(None)
            }
            ('j', Some(room)) => self.forward(Outbound::Join(room)).await,
            ('p', Some(room)) => self.forward(Outbound::Part(room)).await,
            ('m', Some(text)) => self.forward(Outbound::privmsg(self.config.room(), text)).await,
            ('a', Some(text)) => self.forward(Outbound::action(self.config.room(), text)).await,
            ('n', Some(text)) => self.forward(Outbound::notice(self.config.room(), text)).await,
            ('s', Some(rest)) => self.set(&rest).await,
            (verb, Some(_)) => {
                debug!(%verb, "Unrecognized console command");
                Ok(None)
            }
        }
    }

    async fn forward(&self, message: Outbound) -> MettbotResult<Option<String>> {
        self.transport.send(message).await?;
        Ok(None)
    }

    async fn flood(&self, modifier: Option<char>) -> MettbotResult<()> {
        match modifier {
            Some('e') => self.transport.send(Outbound::SetFlood(true)).await?,
            Some('d') => self.transport.send(Outbound::SetFlood(false)).await?,
            _ => {}
        }

        let room = self.config.room();
        for _ in 0..FLOOD_BURST {
            self.transport
                .send(Outbound::privmsg(room.clone(), self.flood_phrase.clone()))
                .await?;
        }
        Ok(())
    }

    /// Applies `s <key> <value>`. Malformed input comes back as console text.
    async fn set(&self, rest: &str) -> MettbotResult<Option<String>> {
        let (key, value) = match parse_setting(rest) {
            Ok(setting) => setting,
            Err(e) => return Ok(Some(e.to_string())),
        };
        if let Err(e) = self.config.set(key, value) {
            return Ok(Some(e.to_string()));
        }
        info!(%key, value, "Runtime setting changed");

        match key {
            ConfigKey::Room => self.forward(Outbound::Join(value.to_string())).await,
            ConfigKey::Nickname => self.forward(Outbound::Nick(value.to_string())).await,
            _ => Ok(None),
        }
    }

    fn dump(&self) -> String {
        let config = self.config.snapshot();
        format!(
            "{}\nroom: {}\nnickname: {}\nquotes: {}\nmetts: {}\nofftime: {}h\noffmessages: {}\nprobability: {}\nfirebird: {}\nlink pattern: {}",
            self.transport.describe(),
            config.room,
            config.nickname,
            config.quote_path.display(),
            config.idle_content_path.display(),
            config.idle_hours,
            config.idle_messages,
            config.command_probability,
            config.special_event_probability,
            config.link_pattern.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flood_modifier() {
        let ConsoleLine::Command(cmd) = ConsoleLine::parse(":fe") else {
            panic!("expected a command");
        };
        assert_eq!(cmd.verb, 'f');
        assert_eq!(cmd.modifier, Some('e'));
        assert_eq!(cmd.rest, None);
    }

    #[test]
    fn test_parse_keeps_rest_verbatim() {
        let ConsoleLine::Command(cmd) = ConsoleLine::parse(":s offtime  2") else {
            panic!("expected a command");
        };
        assert_eq!(cmd.modifier, None);
        assert_eq!(cmd.rest.as_deref(), Some("offtime  2"));
    }

    #[test]
    fn test_parse_setting_errors() {
        assert_eq!(
            parse_setting("offtime").unwrap_err().kind,
            CommandErrorKind::WrongSyntax
        );
        assert_eq!(
            parse_setting("bogus 1").unwrap_err().kind,
            CommandErrorKind::UnknownVariable("bogus".to_string())
        );
        assert_eq!(
            parse_setting("metts /tmp/m.txt").unwrap(),
            (ConfigKey::IdleContentPath, "/tmp/m.txt")
        );
    }

    #[test]
    fn test_parse_bare_sentinel() {
        assert_eq!(ConsoleLine::parse(":"), ConsoleLine::Empty);
    }
}
