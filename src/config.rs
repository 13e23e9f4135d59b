//! Bridge configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mpd::Endpoint;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Host cannot be empty")]
  EmptyHost,
  #[error("Port cannot be 0")]
  ZeroPort,
  #[error("Reconnect delay must be between 1 and 600000 ms")]
  ReconnectDelay,
  #[error("Command timeout must be at least 1 ms")]
  CommandTimeout,
  #[error("Invalid configuration file: {0}")]
  Parse(String),
}

/// Connection behaviour shared by every endpoint of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
  /// Delay before reconnecting after the server went away.
  #[serde(default = "default_reconnect_delay_ms")]
  pub reconnect_delay_ms: u64,

  /// Give up on a command after this long (None = wait forever).
  #[serde(default)]
  pub command_timeout_ms: Option<u64>,
}

fn default_reconnect_delay_ms() -> u64 {
  1000
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      reconnect_delay_ms: default_reconnect_delay_ms(),
      command_timeout_ms: None,
    }
  }
}

impl ClientConfig {
  pub fn reconnect_delay(&self) -> Duration {
    Duration::from_millis(self.reconnect_delay_ms)
  }

  pub fn command_timeout(&self) -> Option<Duration> {
    self.command_timeout_ms.map(Duration::from_millis)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.reconnect_delay_ms < 1 || self.reconnect_delay_ms > 600_000 {
      return Err(ConfigError::ReconnectDelay);
    }
    if self.command_timeout_ms == Some(0) {
      return Err(ConfigError::CommandTimeout);
    }
    Ok(())
  }
}

/// MPD server address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
}

fn default_host() -> String {
  "localhost".to_string()
}

fn default_port() -> u16 {
  6600
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
    }
  }
}

impl ServerConfig {
  pub fn endpoint(&self) -> Endpoint {
    Endpoint::new(self.host.clone(), self.port)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.host.trim().is_empty() {
      return Err(ConfigError::EmptyHost);
    }
    if self.port == 0 {
      return Err(ConfigError::ZeroPort);
    }
    Ok(())
  }
}

/// Settings of one consumer node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
  #[serde(default)]
  pub server: ServerConfig,

  /// Topic stamped on every message the node emits.
  #[serde(default)]
  pub topic: Option<String>,

  /// Destroy the shared socket on close even if other nodes still use it.
  #[serde(default)]
  pub force_close: bool,
}

/// Everything the `mpd-bridge` binary reads from its config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
  #[serde(default)]
  pub client: ClientConfig,
  #[serde(default)]
  pub node: NodeConfig,
}

impl AppConfig {
  pub fn from_json(text: &str) -> Result<Self, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.client.validate()?;
    self.node.server.validate()
  }
}
