//! MPD client core - one shared, self-reconnecting socket per server.
//!
//! Architecture:
//! - `protocol.rs` - command validation and reply decoding
//! - `transport.rs` - `mpd_client` session behind the `Transport`/`Connector` seam
//! - `connection.rs` - reference-counted connection with reconnect loop and event fanout
//! - `registry.rs` - endpoint -> connection map shared by all consumers
//! - `gateway.rs` - command round trips and the status query sequence

mod connection;
mod endpoint;
mod error;
pub mod gateway;
#[cfg(test)]
pub(crate) mod mock;
mod protocol;
mod registry;
mod transport;

pub use connection::{ConnectionEvent, ConnectionState, ManagedConnection, Subscription};
pub use endpoint::Endpoint;
pub use error::{CommandError, ProtocolError, TransportError};
pub use protocol::{
  decode, parse_array_message, parse_key_value_message, Fields, MpdCommand, Payload, Record,
  ResponseShape,
};
pub use registry::ConnectionRegistry;
pub use transport::{Connector, MpdTransport, TcpConnector, Transport, TransportEvent};
