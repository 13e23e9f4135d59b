//! Shared, reference-counted connection to one MPD server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::endpoint::Endpoint;
use super::error::CommandError;
use super::protocol::{Fields, MpdCommand};
use super::transport::{Connector, Transport, TransportEvent};
use crate::config::ClientConfig;

/// Reconnect state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
  Disconnected,
  Connecting,
  Ready,
  Closed,
}

/// Notification fanned out to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
  Connected,
  Disconnected,
  /// Server reported a change in the named subsystem.
  Push(String),
}

static SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct Observers {
  senders: HashMap<u64, Sender<ConnectionEvent>>,
}

/// Handle returned by [`ManagedConnection::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
  id: u64,
  rx: Receiver<ConnectionEvent>,
  observers: Weak<Mutex<Observers>>,
}

impl Subscription {
  /// Next event, or `None` once the connection is closed.
  pub async fn recv(&self) -> Option<ConnectionEvent> {
    self.rx.recv().await.ok()
  }

  pub fn try_recv(&self) -> Option<ConnectionEvent> {
    self.rx.try_recv().ok()
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(observers) = self.observers.upgrade() {
      observers.lock().senders.remove(&self.id);
    }
  }
}

/// One physical connection to one endpoint, shared by every consumer of it.
pub struct ManagedConnection {
  endpoint: Endpoint,
  connector: Arc<dyn Connector>,
  reconnect_delay: Duration,
  command_timeout: Option<Duration>,
  state: RwLock<ConnectionState>,
  ref_count: AtomicUsize,
  transport: RwLock<Option<Arc<dyn Transport>>>,
  observers: Arc<Mutex<Observers>>,
  cancel: CancellationToken,
}

impl ManagedConnection {
  /// Create the connection and start connecting right away.
  pub(crate) fn spawn(endpoint: Endpoint, connector: Arc<dyn Connector>, config: &ClientConfig) -> Arc<Self> {
    let connection = Arc::new(Self {
      endpoint,
      connector,
      reconnect_delay: config.reconnect_delay(),
      command_timeout: config.command_timeout(),
      state: RwLock::new(ConnectionState::Disconnected),
      ref_count: AtomicUsize::new(0),
      transport: RwLock::new(None),
      observers: Arc::new(Mutex::new(Observers::default())),
      cancel: CancellationToken::new(),
    });

    tokio::spawn(connection.clone().supervise());
    connection
  }

  pub fn endpoint(&self) -> &Endpoint {
    &self.endpoint
  }

  pub fn state(&self) -> ConnectionState {
    *self.state.read()
  }

  pub fn is_connected(&self) -> bool {
    self.state() == ConnectionState::Ready
  }

  pub fn is_closed(&self) -> bool {
    self.state() == ConnectionState::Closed
  }

  pub fn ref_count(&self) -> usize {
    self.ref_count.load(Ordering::SeqCst)
  }

  pub(crate) fn retain(&self) -> usize {
    self.ref_count.fetch_add(1, Ordering::SeqCst) + 1
  }

  /// Drop one reference and return what is left.
  pub(crate) fn release(&self) -> usize {
    self
      .ref_count
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
      .map(|n| n.saturating_sub(1))
      .unwrap_or(0)
  }

  /// Register an observer for connect/disconnect/push events.
  pub fn subscribe(&self) -> Subscription {
    let id = SUBSCRIPTION_ID.fetch_add(1, Ordering::SeqCst);
    let (tx, rx) = async_channel::unbounded();
    let mut observers = self.observers.lock();
    if !self.is_closed() {
      observers.senders.insert(id, tx);
    }
    drop(observers);
    Subscription {
      id,
      rx,
      observers: Arc::downgrade(&self.observers),
    }
  }

  pub fn subscriber_count(&self) -> usize {
    self.observers.lock().senders.len()
  }

  fn broadcast(&self, event: ConnectionEvent) {
    let mut observers = self.observers.lock();
    observers
      .senders
      .retain(|_, tx| tx.try_send(event.clone()).is_ok());
  }

  fn set_state(&self, state: ConnectionState) {
    let mut current = self.state.write();
    if *current != ConnectionState::Closed {
      *current = state;
    }
  }

  /// Send one command over the shared transport and return the reply fields.
  /// A command that would not fit on one protocol line never reaches the socket.
  pub async fn send_command(&self, command: MpdCommand) -> Result<Fields, CommandError> {
    command.validate()?;
    if !self.is_connected() {
      return Err(CommandError::NotConnected);
    }
    let transport = self.transport.read().clone().ok_or(CommandError::NotConnected)?;
    let reply = transport.send_command(command);

    match self.command_timeout {
      Some(limit) => match tokio::time::timeout(limit, reply).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CommandError::Timeout),
      },
      None => Ok(reply.await?),
    }
  }

  /// Tear down for good: stop reconnecting, drop the socket, end all subscriptions.
  pub(crate) fn close(&self) {
    *self.state.write() = ConnectionState::Closed;
    self.cancel.cancel();
    if let Some(transport) = self.transport.write().take() {
      transport.destroy();
    }
    // subscribe() checks the state under this lock
    self.observers.lock().senders.clear();
    log::info!("Closed connection to MPD server {}", self.endpoint);
  }

  async fn supervise(self: Arc<Self>) {
    loop {
      self.set_state(ConnectionState::Connecting);
      let (events_tx, events_rx) = async_channel::unbounded();
      let transport = self.connector.connect(&self.endpoint, events_tx);
      *self.transport.write() = Some(transport.clone());
      if self.cancel.is_cancelled() {
        transport.destroy();
        break;
      }

      self.pump(&events_rx).await;

      self.transport.write().take();
      transport.destroy();
      if self.cancel.is_cancelled() {
        break;
      }

      log::info!("Disconnected from MPD server {}", self.endpoint);
      self.set_state(ConnectionState::Disconnected);
      self.broadcast(ConnectionEvent::Disconnected);

      tokio::select! {
        _ = self.cancel.cancelled() => break,
        _ = tokio::time::sleep(self.reconnect_delay) => {}
      }
      log::debug!("Reconnecting to MPD server {}", self.endpoint);
    }
    log::debug!("Supervisor for {} stopped", self.endpoint);
  }

  /// Relay transport events until the transport ends or the connection is closed.
  async fn pump(&self, events: &Receiver<TransportEvent>) {
    loop {
      let event = tokio::select! {
        biased;
        _ = self.cancel.cancelled() => return,
        event = events.recv() => event,
      };

      match event {
        Ok(TransportEvent::Ready) => {
          log::info!("Connected to MPD server {}", self.endpoint);
          self.set_state(ConnectionState::Ready);
          self.broadcast(ConnectionEvent::Connected);
        }
        Ok(TransportEvent::Error(e)) => {
          log::warn!(
            "Connection problem with MPD server {}: {} (is it running?)",
            self.endpoint,
            e
          );
        }
        Ok(TransportEvent::System(subsystem)) => {
          log::debug!("MPD server {} changed: {}", self.endpoint, subsystem);
          self.broadcast(ConnectionEvent::Push(subsystem));
        }
        Ok(TransportEvent::End) | Err(_) => return,
      }
    }
  }
}
