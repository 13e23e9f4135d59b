//! Async transport to an MPD server, built on `mpd_client`.
//!
//! The client library owns the socket: it answers commands one at a time in
//! the order they were queued and keeps the connection in `idle` in between,
//! so subsystem changes reach us as push events.

use std::sync::Arc;

use async_channel::Sender;
use futures_util::future::BoxFuture;
use mpd_client::client::{ConnectionEvent, Subsystem};
use mpd_client::Client;
use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::endpoint::Endpoint;
use super::error::TransportError;
use super::protocol::{frame_fields, Fields, MpdCommand};

/// Lifecycle and push events emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
  /// Greeting received, commands may be sent.
  Ready,
  /// Socket or protocol error. Does not end the connection by itself.
  Error(String),
  /// A subsystem reported a change (`changed: <name>`).
  System(String),
  /// The connection is gone.
  End,
}

/// A live connection that can carry commands.
pub trait Transport: Send + Sync {
  /// Queue a command and resolve with the reply fields.
  fn send_command(&self, command: MpdCommand) -> BoxFuture<'static, Result<Fields, TransportError>>;

  /// Drop the socket. No `End` event is emitted afterwards.
  fn destroy(&self);
}

/// Opens transports. Connecting happens in the background; progress is
/// reported on `events`.
pub trait Connector: Send + Sync {
  fn connect(&self, endpoint: &Endpoint, events: Sender<TransportEvent>) -> Arc<dyn Transport>;
}

/// Connector for plain TCP MPD servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
  fn connect(&self, endpoint: &Endpoint, events: Sender<TransportEvent>) -> Arc<dyn Transport> {
    Arc::new(MpdTransport::connect(endpoint.clone(), events))
  }
}

type ClientSlot = Arc<RwLock<Option<Client>>>;

/// TCP transport handle.
pub struct MpdTransport {
  client: ClientSlot,
  cancel: CancellationToken,
}

impl MpdTransport {
  /// Start connecting to `endpoint` in the background.
  pub fn connect(endpoint: Endpoint, events: Sender<TransportEvent>) -> Self {
    let client: ClientSlot = Arc::new(RwLock::new(None));
    let cancel = CancellationToken::new();

    let token = cancel.clone();
    let slot = client.clone();
    tokio::spawn(async move {
      tokio::select! {
        _ = token.cancelled() => {
          log::debug!("MPD transport {} destroyed", endpoint);
        }
        _ = Self::run(&endpoint, &slot, &events) => {}
      }
    });

    Self { client, cancel }
  }

  async fn run(endpoint: &Endpoint, slot: &ClientSlot, events: &Sender<TransportEvent>) {
    match TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await {
      Ok(stream) => Self::session(stream, slot, events).await,
      Err(e) => {
        let error = TransportError::ConnectionFailed(e.to_string());
        let _ = events.send(TransportEvent::Error(error.to_string())).await;
      }
    }
    slot.write().take();
    let _ = events.send(TransportEvent::End).await;
  }

  /// Handshake, then relay connection events until the server goes away.
  async fn session<C>(io: C, slot: &ClientSlot, events: &Sender<TransportEvent>)
  where
    C: AsyncRead + AsyncWrite + Send + Unpin + 'static,
  {
    let (client, mut changes) = match Client::connect(io).await {
      Ok(connected) => connected,
      Err(e) => {
        let error = TransportError::Handshake(e.to_string());
        let _ = events.send(TransportEvent::Error(error.to_string())).await;
        return;
      }
    };
    *slot.write() = Some(client);
    let _ = events.send(TransportEvent::Ready).await;

    while let Some(event) = changes.next().await {
      match event {
        ConnectionEvent::SubsystemChange(subsystem) => {
          let _ = events.send(TransportEvent::System(subsystem_name(&subsystem))).await;
        }
        ConnectionEvent::ConnectionClosed(e) => {
          log::debug!("MPD connection closed: {}", e);
          let _ = events.send(TransportEvent::Error(e.to_string())).await;
          break;
        }
        #[allow(unreachable_patterns)]
        _ => {}
      }
    }
  }
}

/// Name of a subsystem as it appears in `changed:` lines.
fn subsystem_name(subsystem: &Subsystem) -> String {
  match subsystem {
    Subsystem::Queue => "playlist".to_string(),
    Subsystem::StoredPlaylist => "stored_playlist".to_string(),
    Subsystem::Other(raw) => raw.to_string(),
    #[allow(unreachable_patterns)]
    known => format!("{:?}", known).to_lowercase(),
  }
}

impl Transport for MpdTransport {
  fn send_command(&self, command: MpdCommand) -> BoxFuture<'static, Result<Fields, TransportError>> {
    let client = self.client.read().clone();
    let cancel = self.cancel.clone();
    Box::pin(async move {
      let client = client.ok_or(TransportError::Disconnected)?;
      let wire = command.to_wire()?;
      log::debug!("Sending MPD command: {}", command);
      tokio::select! {
        _ = cancel.cancelled() => Err(TransportError::Disconnected),
        reply = client.raw_command(wire) => match reply {
          Ok(frame) => Ok(frame_fields(&frame)),
          Err(e) => Err(TransportError::Server(e.to_string())),
        },
      }
    })
  }

  fn destroy(&self) {
    self.cancel.cancel();
    self.client.write().take();
  }
}

impl Drop for MpdTransport {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}
