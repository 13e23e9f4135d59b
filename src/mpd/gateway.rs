//! Command round trips over a shared connection.

use super::connection::ManagedConnection;
use super::error::CommandError;
use super::protocol::{decode, parse_key_value_message, MpdCommand, Payload, Record, ResponseShape};

/// Send `name args...` and decode the reply as `shape`.
///
/// Returns [`CommandError::NotConnected`] without touching the socket when the
/// connection is not ready. Server errors are logged here with the endpoint.
pub async fn issue(
  connection: &ManagedConnection,
  name: &str,
  args: Vec<String>,
  shape: ResponseShape,
) -> Result<Payload, CommandError> {
  let command = MpdCommand::new(name, args);
  let fields = connection.send_command(command).await.map_err(|e| {
    log_failure(connection, name, &e);
    e
  })?;
  Ok(decode(&fields, shape))
}

/// `currentsong` then `status`, combined into one payload.
pub async fn query_status(connection: &ManagedConnection) -> Result<Payload, CommandError> {
  let currentsong = fetch_record(connection, MpdCommand::currentsong()).await?;
  let status = fetch_record(connection, MpdCommand::status()).await?;
  Ok(Payload::Status { currentsong, status })
}

async fn fetch_record(
  connection: &ManagedConnection,
  command: MpdCommand,
) -> Result<Record, CommandError> {
  let name = command.name.clone();
  let fields = connection.send_command(command).await.map_err(|e| {
    log_failure(connection, &name, &e);
    e
  })?;
  Ok(parse_key_value_message(&fields))
}

fn log_failure(connection: &ManagedConnection, name: &str, error: &CommandError) {
  match error {
    CommandError::NotConnected => {
      log::debug!("[MPD] {} - dropped {}: not connected", connection.endpoint(), name);
    }
    _ => log::error!("[MPD] {} - {} failed: {}", connection.endpoint(), name, error),
  }
}
