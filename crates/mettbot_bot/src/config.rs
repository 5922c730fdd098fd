//! Startup configuration and the shared runtime configuration store.

use derive_getters::Getters;
use derive_setters::Setters;
use mettbot_error::{CommandError, CommandErrorKind, ConfigError, MettbotResult};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Startup parameters. Every field has a default and can be overridden from a
/// TOML file or the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_", into)]
pub struct BotConfig {
    /// Chat server address
    host: String,
    /// Room the bot lives in
    room: String,
    /// Nickname
    nickname: String,
    /// Full display name
    display_name: String,
    /// `chrono` format string used to timestamp stored quotes
    time_format: String,
    /// Quote database
    quote_path: PathBuf,
    /// Idle-content database
    idle_content_path: PathBuf,
    /// Hours without suppressing activity before idle content is posted
    idle_hours: u64,
    /// Off-topic messages before idle content is posted (0 disables)
    idle_messages: u64,
    /// Probability that the bot ignores a chat command
    command_probability: f64,
    /// Pattern recognizing links handed to the link resolver
    link_pattern: String,
    /// Probability that a question gets a special-event reply
    special_event_probability: f64,
    /// Idle notice template; `{}` is replaced by the selected line
    idle_template: String,
    /// Notice sent on a forced trigger
    force_ack: String,
    /// Phrase repeated by the console flood burst
    flood_phrase: String,
    /// Replies picked for special events
    special_event_replies: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            host: "irc.ps0ke.de:2342".to_string(),
            room: "#metttest".to_string(),
            nickname: "rohmett".to_string(),
            display_name: "Le MettBot".to_string(),
            time_format: "%Y-%m-%dT%H:%M".to_string(),
            quote_path: PathBuf::from("mett_quotes.txt"),
            idle_content_path: PathBuf::from("mett_metts.txt"),
            idle_hours: 4,
            idle_messages: 100,
            command_probability: 0.1,
            link_pattern: r"\S*twitter\.com\/\S+\/status(es)?\/(\d+)\S*".to_string(),
            special_event_probability: 0.05,
            idle_template: "Too quiet in here. Have some mett: {}".to_string(),
            force_ack: "DONG!".to_string(),
            flood_phrase: "salami!1!".to_string(),
            special_event_replies: vec![
                "Ask firebird.".to_string(),
                "firebird knows.".to_string(),
                "firebird, your turn.".to_string(),
            ],
        }
    }
}

impl BotConfig {
    /// Load bot configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> MettbotResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Ok(toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?)
    }

    /// Builds the mutable runtime subset, compiling the link pattern.
    pub fn runtime(&self) -> MettbotResult<RuntimeConfig> {
        let link_pattern = Regex::new(&self.link_pattern).map_err(|e| {
            ConfigError::new(format!("Invalid link pattern {:?}: {}", self.link_pattern, e))
        })?;

        if !is_probability(self.command_probability) {
            return Err(ConfigError::new(format!(
                "Command probability must be within 0 and 1, got {}",
                self.command_probability
            ))
            .into());
        }
        if !is_probability(self.special_event_probability) {
            return Err(ConfigError::new(format!(
                "Special-event probability must be within 0 and 1, got {}",
                self.special_event_probability
            ))
            .into());
        }
        if self.idle_hours > MAX_IDLE_HOURS {
            return Err(ConfigError::new(format!(
                "Idle hours must be at most {}, got {}",
                MAX_IDLE_HOURS, self.idle_hours
            ))
            .into());
        }

        Ok(RuntimeConfig {
            room: self.room.clone(),
            nickname: self.nickname.clone(),
            quote_path: self.quote_path.clone(),
            idle_content_path: self.idle_content_path.clone(),
            idle_hours: self.idle_hours,
            idle_messages: self.idle_messages,
            command_probability: self.command_probability,
            special_event_probability: self.special_event_probability,
            link_pattern,
        })
    }
}

/// Parameters that may change while the bot runs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Room the bot posts to
    pub room: String,
    /// Current nickname
    pub nickname: String,
    /// Quote database
    pub quote_path: PathBuf,
    /// Idle-content database
    pub idle_content_path: PathBuf,
    /// Idle threshold in hours
    pub idle_hours: u64,
    /// Off-topic message threshold
    pub idle_messages: u64,
    /// Probability of ignoring a chat command
    pub command_probability: f64,
    /// Probability of a special-event reply
    pub special_event_probability: f64,
    /// Compiled link pattern
    pub link_pattern: Regex,
}

/// Shortest idle window, used when the threshold is set to zero hours.
const MIN_IDLE_WINDOW: Duration = Duration::from_secs(60);

/// Largest accepted idle threshold: one year.
pub const MAX_IDLE_HOURS: u64 = 24 * 365;

impl RuntimeConfig {
    /// Length of one idle wait window, between a minute and [`MAX_IDLE_HOURS`].
    pub fn idle_window(&self) -> Duration {
        let hours = self.idle_hours.min(MAX_IDLE_HOURS);
        Duration::from_secs(hours * 3600).max(MIN_IDLE_WINDOW)
    }
}

/// Runtime settings addressable from the console `s` command.
///
/// The short names come first; the long ones are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
pub enum ConfigKey {
    /// Room name
    #[strum(to_string = "channel", serialize = "room")]
    Room,
    /// Nickname
    #[strum(to_string = "nick", serialize = "nickname")]
    Nickname,
    /// Quote database path
    #[strum(to_string = "quotes", serialize = "quote-path")]
    QuotePath,
    /// Idle-content database path
    #[strum(to_string = "metts", serialize = "idle-content-path")]
    IdleContentPath,
    /// Idle threshold in hours
    #[strum(to_string = "offtime", serialize = "idle-hours")]
    IdleHours,
    /// Off-topic message threshold
    #[strum(to_string = "offmessages", serialize = "idle-messages")]
    IdleMessages,
    /// Command-ignore probability
    #[strum(to_string = "probability", serialize = "command-probability")]
    CommandProbability,
    /// Special-event probability
    #[strum(to_string = "firebird", serialize = "special-event-probability")]
    SpecialEventProbability,
}

fn parse_count(value: &str) -> Result<u64, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::new(CommandErrorKind::NotANumber(value.to_string())))
}

fn parse_hours(value: &str) -> Result<u64, CommandError> {
    parse_count(value).and_then(|hours| {
        if hours <= MAX_IDLE_HOURS {
            Ok(hours)
        } else {
            Err(CommandError::new(CommandErrorKind::NotANumber(value.to_string())))
        }
    })
}

/// `gen_bool` only accepts values in `[0, 1]`; NaN fails the range check.
fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

fn parse_probability(value: &str) -> Result<f64, CommandError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|p| is_probability(*p))
        .ok_or_else(|| CommandError::new(CommandErrorKind::NotAFloat(value.to_string())))
}

/// Process-wide runtime configuration.
///
/// Readers take cheap snapshots; writes go through [`SharedConfig::set`], which
/// only the command router calls.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<RuntimeConfig>>,
}

impl SharedConfig {
    /// Wraps an initial configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Clones the current configuration.
    pub fn snapshot(&self) -> RuntimeConfig {
        self.inner.read().clone()
    }

    /// Reads one value without cloning the whole configuration.
    pub fn read<T>(&self, f: impl FnOnce(&RuntimeConfig) -> T) -> T {
        f(&self.inner.read())
    }

    /// Current room.
    pub fn room(&self) -> String {
        self.read(|c| c.room.clone())
    }

    /// Parses `value` for `key` and stores it. On error nothing changes.
    pub(crate) fn set(&self, key: ConfigKey, value: &str) -> Result<(), CommandError> {
        match key {
            ConfigKey::IdleHours => {
                let hours = parse_hours(value)?;
                self.inner.write().idle_hours = hours;
            }
            ConfigKey::IdleMessages => {
                let messages = parse_count(value)?;
                self.inner.write().idle_messages = messages;
            }
            ConfigKey::CommandProbability => {
                let p = parse_probability(value)?;
                self.inner.write().command_probability = p;
            }
            ConfigKey::SpecialEventProbability => {
                let p = parse_probability(value)?;
                self.inner.write().special_event_probability = p;
            }
            ConfigKey::Room => self.inner.write().room = value.to_string(),
            ConfigKey::Nickname => self.inner.write().nickname = value.to_string(),
            ConfigKey::QuotePath => self.inner.write().quote_path = PathBuf::from(value),
            ConfigKey::IdleContentPath => {
                self.inner.write().idle_content_path = PathBuf::from(value)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_config_key_names_and_aliases() {
        assert_eq!(ConfigKey::from_str("offtime").unwrap(), ConfigKey::IdleHours);
        assert_eq!(ConfigKey::from_str("idle-hours").unwrap(), ConfigKey::IdleHours);
        assert_eq!(ConfigKey::from_str("channel").unwrap(), ConfigKey::Room);
        assert_eq!(ConfigKey::IdleHours.to_string(), "offtime");
        assert!(ConfigKey::from_str("bogus").is_err());
    }

    #[test]
    fn test_zero_idle_hours_keeps_a_floor() {
        let mut runtime = BotConfig::default().runtime().unwrap();
        assert_eq!(runtime.idle_window(), Duration::from_secs(4 * 3600));
        runtime.idle_hours = 0;
        assert_eq!(runtime.idle_window(), MIN_IDLE_WINDOW);
    }

    #[test]
    fn test_idle_window_is_capped() {
        let mut runtime = BotConfig::default().runtime().unwrap();
        runtime.idle_hours = u64::MAX;
        assert_eq!(runtime.idle_window(), Duration::from_secs(MAX_IDLE_HOURS * 3600));
    }

    #[test]
    fn test_runtime_rejects_out_of_range_startup_values() {
        assert!(BotConfig::default().with_command_probability(1.5).runtime().is_err());
        assert!(BotConfig::default().with_command_probability(f64::NAN).runtime().is_err());
        assert!(BotConfig::default().with_special_event_probability(-0.1).runtime().is_err());
        assert!(BotConfig::default().with_idle_hours(u64::MAX).runtime().is_err());
        assert!(BotConfig::default().with_idle_hours(MAX_IDLE_HOURS).runtime().is_ok());
    }

    #[test]
    fn test_hours_above_cap_are_rejected() {
        assert_eq!(parse_hours("8760").unwrap(), MAX_IDLE_HOURS);
        assert_eq!(
            parse_hours("18446744073709551615").unwrap_err().kind,
            CommandErrorKind::NotANumber("18446744073709551615".to_string())
        );
    }

    #[test]
    fn test_probability_must_be_in_range() {
        assert_eq!(parse_probability("0.25").unwrap(), 0.25);
        assert!(parse_probability("1.5").is_err());
        assert!(parse_probability("NaN").is_err());
    }
}
