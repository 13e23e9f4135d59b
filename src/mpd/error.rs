//! MPD error types.

use thiserror::Error;

/// Errors raised by the connection layer.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("Connection failed: {0}")]
  ConnectionFailed(String),

  #[error("Handshake failed: {0}")]
  Handshake(String),

  /// The server answered with `ACK`, or the client library gave up on the reply.
  #[error("Server error: {0}")]
  Server(String),

  #[error(transparent)]
  Protocol(#[from] ProtocolError),

  #[error("Disconnected")]
  Disconnected,
}

/// Commands that cannot be put on the wire as a single line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
  #[error("Invalid command name {0:?}")]
  InvalidCommand(String),

  #[error("Invalid argument {arg:?} for {command}")]
  InvalidArgument { command: String, arg: String },
}

/// Errors a command round trip can end with.
#[derive(Debug, Error)]
pub enum CommandError {
  #[error("Not connected")]
  NotConnected,

  #[error("Command timeout")]
  Timeout,

  #[error(transparent)]
  Transport(#[from] TransportError),

  #[error(transparent)]
  Protocol(#[from] ProtocolError),
}
