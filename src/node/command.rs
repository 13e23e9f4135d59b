//! Pass-through command node.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{follow_status, CommandRequest, NodeMessage, NodeStatus};
use crate::config::NodeConfig;
use crate::mpd::{gateway, ConnectionRegistry, ManagedConnection, ResponseShape};

/// Forwards commands to MPD and emits each non-empty reply as a list payload.
pub struct CommandNode {
  topic: Option<String>,
  force_close: bool,
  registry: Arc<ConnectionRegistry>,
  connection: Arc<ManagedConnection>,
  sink: mpsc::Sender<NodeMessage>,
  status: Arc<RwLock<NodeStatus>>,
  watcher: JoinHandle<()>,
  closed: bool,
}

impl CommandNode {
  pub fn new(config: &NodeConfig, registry: Arc<ConnectionRegistry>, sink: mpsc::Sender<NodeMessage>) -> Self {
    let connection = registry.acquire(&config.server.endpoint());
    let subscription = connection.subscribe();
    let status = Arc::new(RwLock::new(NodeStatus::of(&connection)));
    let watcher = tokio::spawn(follow_status(subscription, status.clone(), |_| {}));

    Self {
      topic: config.topic.clone(),
      force_close: config.force_close,
      registry,
      connection,
      sink,
      status,
      watcher,
      closed: false,
    }
  }

  pub fn status(&self) -> NodeStatus {
    *self.status.read()
  }

  pub fn connection(&self) -> &Arc<ManagedConnection> {
    &self.connection
  }

  /// Run one command. Failures and empty replies produce no message; a bare
  /// `OK` arrives as one empty record.
  pub async fn input(&self, request: CommandRequest) {
    if !self.connection.is_connected() {
      log::debug!(
        "[MPD] {} - not connected, dropping {}",
        self.connection.endpoint(),
        request.command
      );
      return;
    }

    let args = request.string_args();
    let payload = match gateway::issue(&self.connection, &request.command, args, ResponseShape::List).await {
      Ok(payload) => payload,
      Err(_) => return,
    };
    if payload.is_empty() {
      return;
    }

    let message = NodeMessage {
      topic: self.topic.clone(),
      payload,
    };
    if self.sink.send(message).await.is_err() {
      log::warn!("Command node sink closed, reply dropped");
    }
  }

  /// Unsubscribe and give back the connection reference.
  pub fn close(mut self) {
    self.shutdown();
  }

  fn shutdown(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;
    self.watcher.abort();
    if self.force_close {
      self.registry.force_close_connection(&self.connection);
    } else {
      self.registry.release_connection(&self.connection);
    }
  }
}

impl Drop for CommandNode {
  fn drop(&mut self) {
    self.shutdown();
  }
}
