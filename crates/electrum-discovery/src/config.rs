// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// Discovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// IRC server hostname
    #[serde(default = "default_server_host")]
    pub server_host: String,

    /// IRC server port (plaintext)
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Channel where peers announce themselves
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Only members whose name starts with this prefix are queried
    #[serde(default = "default_member_prefix")]
    pub member_prefix: String,

    /// Our nickname is this prefix plus six random hex digits
    #[serde(default = "default_nick_prefix")]
    pub nick_prefix: String,

    /// Real name sent at registration
    #[serde(default = "default_realname")]
    pub realname: String,

    /// Overall lookup deadline in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Longest accepted IRC line (bytes)
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Capacity of the inbound event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_server_host() -> String {
    "irc.libera.chat".to_string()
}

fn default_server_port() -> u16 {
    6667
}

fn default_channel() -> String {
    "#electrum".to_string()
}

fn default_member_prefix() -> String {
    "E_".to_string()
}

fn default_nick_prefix() -> String {
    "discovery_".to_string()
}

fn default_realname() -> String {
    "none".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_line_length() -> usize {
    8192
}

fn default_event_capacity() -> usize {
    crate::session::transport::DEFAULT_EVENT_CAPACITY
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            channel: default_channel(),
            member_prefix: default_member_prefix(),
            nick_prefix: default_nick_prefix(),
            realname: default_realname(),
            timeout_secs: default_timeout(),
            max_line_length: default_max_line_length(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Lookup deadline as Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `host:port` of the IRC server.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Fresh nickname for one lookup.
    pub fn generate_nickname(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}{}", self.nick_prefix, &suffix[..6])
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_host.is_empty() {
            return Err(ConfigError::Invalid("server_host cannot be empty".into()));
        }
        if self.server_port == 0 {
            return Err(ConfigError::Invalid("server_port cannot be 0".into()));
        }
        if !self.channel.starts_with(['#', '&']) {
            return Err(ConfigError::Invalid(format!(
                "channel {:?} must start with '#' or '&'",
                self.channel
            )));
        }
        if self.channel.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid("channel cannot contain spaces".into()));
        }
        if self.member_prefix.is_empty() {
            return Err(ConfigError::Invalid("member_prefix cannot be empty".into()));
        }
        if self.nick_prefix.is_empty() {
            return Err(ConfigError::Invalid("nick_prefix cannot be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs cannot be 0".into()));
        }
        if self.max_line_length < 512 {
            return Err(ConfigError::Invalid(
                "max_line_length must be at least 512".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity cannot be 0".into()));
        }
        Ok(())
    }
}
