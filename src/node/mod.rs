//! Consumer nodes bound to one shared MPD connection.
//!
//! - `command.rs` - pass-through commands ("mpd out")
//! - `status.rs` - re-queries `currentsong` + `status` on every server push ("mpd in")

mod command;
mod status;

pub use command::CommandNode;
pub use status::StatusNode;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::mpd::{ConnectionEvent, ManagedConnection, Payload, Subscription};

/// Message a node hands to its downstream sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMessage {
  pub topic: Option<String>,
  pub payload: Payload,
}

/// Connectivity shown for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeStatus {
  Connected,
  NotConnected,
}

impl NodeStatus {
  fn of(connection: &ManagedConnection) -> Self {
    if connection.is_connected() {
      NodeStatus::Connected
    } else {
      NodeStatus::NotConnected
    }
  }
}

/// Command submitted to a [`CommandNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
  pub command: String,
  #[serde(default)]
  pub args: Vec<serde_json::Value>,
}

impl CommandRequest {
  pub fn new(command: impl Into<String>, args: Vec<serde_json::Value>) -> Self {
    Self {
      command: command.into(),
      args,
    }
  }

  /// Parse either a JSON request or a plain `name arg arg` line.
  pub fn from_line(line: &str) -> Option<Self> {
    let line = line.trim();
    if line.starts_with('{') {
      return match serde_json::from_str(line) {
        Ok(request) => Some(request),
        Err(e) => {
          log::warn!("Ignoring malformed command request: {}", e);
          None
        }
      };
    }
    let mut words = line.split_whitespace();
    let command = words.next()?.to_string();
    let args = words.map(|w| serde_json::Value::String(w.to_string())).collect();
    Some(Self { command, args })
  }

  /// Arguments as protocol strings. Non-string JSON values keep their JSON text.
  pub fn string_args(&self) -> Vec<String> {
    self
      .args
      .iter()
      .map(|arg| match arg {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
      })
      .collect()
  }
}

/// Track connect/disconnect events into `status` until the subscription ends.
/// Pushes are handed to `on_push`, which must not block.
async fn follow_status<F>(subscription: Subscription, status: Arc<RwLock<NodeStatus>>, mut on_push: F)
where
  F: FnMut(String),
{
  while let Some(event) = subscription.recv().await {
    match event {
      ConnectionEvent::Connected => *status.write() = NodeStatus::Connected,
      ConnectionEvent::Disconnected => *status.write() = NodeStatus::NotConnected,
      ConnectionEvent::Push(subsystem) => on_push(subsystem),
    }
  }
  *status.write() = NodeStatus::NotConnected;
}
