//! Process-wide map from endpoint to its shared connection.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::connection::ManagedConnection;
use super::endpoint::Endpoint;
use super::transport::{Connector, TcpConnector};
use crate::config::ClientConfig;

/// Owns every [`ManagedConnection`]. Construct once and hand an `Arc` to each consumer.
pub struct ConnectionRegistry {
  connector: Arc<dyn Connector>,
  config: ClientConfig,
  connections: Mutex<HashMap<String, Arc<ManagedConnection>>>,
}

impl ConnectionRegistry {
  /// Registry connecting over TCP.
  pub fn new(config: ClientConfig) -> Self {
    Self::with_connector(Arc::new(TcpConnector), config)
  }

  pub fn with_connector(connector: Arc<dyn Connector>, config: ClientConfig) -> Self {
    Self {
      connector,
      config,
      connections: Mutex::new(HashMap::new()),
    }
  }

  pub fn config(&self) -> &ClientConfig {
    &self.config
  }

  /// Take a reference on the connection for `endpoint`, creating it on first use.
  pub fn acquire(&self, endpoint: &Endpoint) -> Arc<ManagedConnection> {
    let id = endpoint.id();
    let mut connections = self.connections.lock();

    let live = connections.get(&id).filter(|c| !c.is_closed()).cloned();
    let connection = match live {
      Some(connection) => connection,
      None => {
        if connections.contains_key(&id) {
          log::info!("Replacing closed connection to MPD server {}", id);
        } else {
          log::debug!("Creating connection to MPD server {}", id);
        }
        let created = ManagedConnection::spawn(endpoint.clone(), self.connector.clone(), &self.config);
        connections.insert(id, created.clone());
        created
      }
    };

    let count = connection.retain();
    log::debug!("MPD server {} now has {} consumer(s)", endpoint, count);
    connection
  }

  /// Give back a reference. The last release closes the connection.
  pub fn release(&self, endpoint: &Endpoint) {
    match self.get(endpoint) {
      Some(connection) => self.release_connection(&connection),
      None => log::warn!("Release of unknown MPD server {}", endpoint.id()),
    }
  }

  /// Like [`release`](Self::release), but for the exact handle a consumer holds.
  /// A handle whose entry was already replaced only drops its own count.
  pub fn release_connection(&self, connection: &Arc<ManagedConnection>) {
    let id = connection.endpoint().id();
    let mut connections = self.connections.lock();

    let remaining = connection.release();
    log::debug!("MPD server {} now has {} consumer(s)", id, remaining);
    if remaining > 0 {
      return;
    }

    let registered = connections
      .get(&id)
      .is_some_and(|entry| Arc::ptr_eq(entry, connection));
    if registered {
      connections.remove(&id);
    }
    drop(connections);
    if !connection.is_closed() {
      connection.close();
    }
  }

  /// Destroy the socket immediately, even if other consumers still hold it, then release.
  pub fn force_close(&self, endpoint: &Endpoint) {
    match self.get(endpoint) {
      Some(connection) => self.force_close_connection(&connection),
      None => log::warn!("Force close of unknown MPD server {}", endpoint.id()),
    }
  }

  pub fn force_close_connection(&self, connection: &Arc<ManagedConnection>) {
    let others = connection.ref_count().saturating_sub(1);
    if others > 0 {
      log::warn!(
        "Force closing MPD server {} while {} other consumer(s) still use it",
        connection.endpoint(),
        others
      );
    }
    connection.close();
    self.release_connection(connection);
  }

  pub fn get(&self, endpoint: &Endpoint) -> Option<Arc<ManagedConnection>> {
    self.connections.lock().get(&endpoint.id()).cloned()
  }

  pub fn len(&self) -> usize {
    self.connections.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.connections.lock().is_empty()
  }

  /// Close every connection and forget them.
  pub fn shutdown(&self) {
    let drained: Vec<_> = self.connections.lock().drain().collect();
    for (_, connection) in drained {
      connection.close();
    }
  }
}

impl Drop for ConnectionRegistry {
  fn drop(&mut self) {
    self.shutdown();
  }
}
