use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::APOLLO_RELEASE_TOPIC;
use crate::constants::DEFAULT_KEY_SEPARATOR;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Channel carrying release-change messages
    #[serde(default = "default_release_topic")]
    pub release_topic: String,

    /// Single character joining `appId`, `cluster` and `namespace`
    #[serde(default = "default_key_separator")]
    pub key_separator: char,

    /// Capacity of the in-process release message queue
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Release messages handed to listeners at once; further messages wait
    /// in the queue
    #[serde(default = "default_max_in_flight_dispatches")]
    pub max_in_flight_dispatches: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            release_topic: default_release_topic(),
            key_separator: default_key_separator(),
            channel_capacity: default_channel_capacity(),
            max_in_flight_dispatches: default_max_in_flight_dispatches(),
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.release_topic.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "release_topic cannot be empty".into(),
            )));
        }

        // Separator must never collide with identifier characters
        if self.key_separator.is_alphanumeric() || self.key_separator.is_whitespace() {
            return Err(Error::Config(ConfigError::Message(format!(
                "key_separator {:?} must be a punctuation character",
                self.key_separator
            ))));
        }

        if self.channel_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "channel_capacity must be greater than 0".into(),
            )));
        }

        if self.max_in_flight_dispatches == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_in_flight_dispatches must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_release_topic() -> String {
    APOLLO_RELEASE_TOPIC.to_string()
}
fn default_key_separator() -> char {
    DEFAULT_KEY_SEPARATOR
}
fn default_channel_capacity() -> usize {
    1024
}
fn default_max_in_flight_dispatches() -> usize {
    4
}
