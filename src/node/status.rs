//! Status node: on every server push, fetch `currentsong` and `status`.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use super::{follow_status, NodeMessage, NodeStatus};
use crate::config::NodeConfig;
use crate::mpd::{gateway, ConnectionRegistry, ManagedConnection};

/// Re-queries `currentsong` + `status` on every server push. Pushes that land
/// while a refresh is in flight collapse into one follow-up refresh.
pub struct StatusNode {
  force_close: bool,
  registry: Arc<ConnectionRegistry>,
  connection: Arc<ManagedConnection>,
  status: Arc<RwLock<NodeStatus>>,
  listener: JoinHandle<()>,
  refresher: JoinHandle<()>,
  closed: bool,
}

impl StatusNode {
  pub fn new(config: &NodeConfig, registry: Arc<ConnectionRegistry>, sink: mpsc::Sender<NodeMessage>) -> Self {
    let connection = registry.acquire(&config.server.endpoint());
    let subscription = connection.subscribe();
    let status = Arc::new(RwLock::new(NodeStatus::of(&connection)));

    let dirty = Arc::new(Notify::new());
    let refresher = tokio::spawn(refresh_loop(
      connection.clone(),
      dirty.clone(),
      sink,
      config.topic.clone(),
    ));

    let endpoint = connection.endpoint().clone();
    let on_push = move |subsystem: String| {
      log::debug!("[MPD] {} - {} changed, refreshing status", endpoint, subsystem);
      dirty.notify_one();
    };
    let listener = tokio::spawn(follow_status(subscription, status.clone(), on_push));

    Self {
      force_close: config.force_close,
      registry,
      connection,
      status,
      listener,
      refresher,
      closed: false,
    }
  }

  pub fn status(&self) -> NodeStatus {
    *self.status.read()
  }

  pub fn connection(&self) -> &Arc<ManagedConnection> {
    &self.connection
  }

  /// Stop listening and give back the connection reference.
  pub fn close(mut self) {
    self.shutdown();
  }

  fn shutdown(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;
    self.listener.abort();
    self.refresher.abort();
    if self.force_close {
      self.registry.force_close_connection(&self.connection);
    } else {
      self.registry.release_connection(&self.connection);
    }
  }
}

impl Drop for StatusNode {
  fn drop(&mut self) {
    self.shutdown();
  }
}

/// One status query at a time. `Notify` keeps at most one pending permit.
async fn refresh_loop(
  connection: Arc<ManagedConnection>,
  dirty: Arc<Notify>,
  sink: mpsc::Sender<NodeMessage>,
  topic: Option<String>,
) {
  loop {
    dirty.notified().await;
    let payload = match gateway::query_status(&connection).await {
      Ok(payload) => payload,
      Err(_) => continue,
    };
    let message = NodeMessage {
      topic: topic.clone(),
      payload,
    };
    if sink.send(message).await.is_err() {
      log::warn!("Status node sink closed, update dropped");
    }
  }
}
