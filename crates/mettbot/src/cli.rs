//! Command-line interface.

use clap::Parser;
use mettbot_bot::BotConfig;
use mettbot_error::MettbotResult;
use std::path::PathBuf;

/// Chat-room bot with an idle notifier and quote databases.
///
/// Lines typed on stdin starting with `:` are console commands; anything else
/// is passed to the chat server verbatim.
#[derive(Debug, Parser)]
#[command(name = "mettbot", version, about, long_about = None)]
pub struct Cli {
    /// TOML file with startup settings; flags override it
    #[arg(short, long, env = "METTBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Chat server address
    #[arg(long)]
    pub host: Option<String>,

    /// Room to join
    #[arg(long = "channel")]
    pub room: Option<String>,

    /// Nickname
    #[arg(long = "nick")]
    pub nickname: Option<String>,

    /// Full display name
    #[arg(long = "longnick")]
    pub display_name: Option<String>,

    /// Timestamp format for stored quotes (chrono strftime)
    #[arg(long = "timeformat")]
    pub time_format: Option<String>,

    /// Quote database file
    #[arg(long = "quotes")]
    pub quote_path: Option<PathBuf>,

    /// Idle-content database file
    #[arg(long = "metts")]
    pub idle_content_path: Option<PathBuf>,

    /// Hours of off-topic chat before idle content is posted
    #[arg(long = "offtime")]
    pub idle_hours: Option<u64>,

    /// Off-topic messages before idle content is posted
    #[arg(long = "offmessages")]
    pub idle_messages: Option<u64>,

    /// Probability that the bot ignores a command
    #[arg(long = "probability")]
    pub command_probability: Option<f64>,

    /// Pattern matching links to resolve
    #[arg(long = "twitterregex")]
    pub link_pattern: Option<String>,

    /// Probability that a question gets a special-event reply
    #[arg(long = "firebird")]
    pub special_event_probability: Option<f64>,
}

impl Cli {
    /// Loads the config file (if any) and applies flag overrides.
    pub fn bot_config(&self) -> MettbotResult<BotConfig> {
        let mut config = match &self.config {
            Some(path) => BotConfig::from_file(path)?,
            None => BotConfig::default(),
        };

        if let Some(v) = &self.host {
            config = config.with_host(v.clone());
        }
        if let Some(v) = &self.room {
            config = config.with_room(v.clone());
        }
        if let Some(v) = &self.nickname {
            config = config.with_nickname(v.clone());
        }
        if let Some(v) = &self.display_name {
            config = config.with_display_name(v.clone());
        }
        if let Some(v) = &self.time_format {
            config = config.with_time_format(v.clone());
        }
        if let Some(v) = &self.quote_path {
            config = config.with_quote_path(v.clone());
        }
        if let Some(v) = &self.idle_content_path {
            config = config.with_idle_content_path(v.clone());
        }
        if let Some(v) = self.idle_hours {
            config = config.with_idle_hours(v);
        }
        if let Some(v) = self.idle_messages {
            config = config.with_idle_messages(v);
        }
        if let Some(v) = self.command_probability {
            config = config.with_command_probability(v);
        }
        if let Some(v) = &self.link_pattern {
            config = config.with_link_pattern(v.clone());
        }
        if let Some(v) = self.special_event_probability {
            config = config.with_special_event_probability(v);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from(["mettbot", "--channel", "#mett", "--offtime", "2"]);
        let config = cli.bot_config().unwrap();
        assert_eq!(config.room(), "#mett");
        assert_eq!(*config.idle_hours(), 2);
        assert_eq!(config.nickname(), "rohmett");
    }
}
