//! Commands and reply decoding on top of `mpd_protocol` frames.
//!
//! Reference: https://mpd.readthedocs.io/en/latest/protocol.html

use std::collections::BTreeMap;
use std::fmt;

use mpd_protocol::response::Frame;
use mpd_protocol::Command;
use serde::{Deserialize, Serialize};

use super::error::ProtocolError;

/// One `key: value` block of a response.
pub type Record = BTreeMap<String, String>;

/// Reply body as received: `key: value` pairs in server order, final `OK` stripped.
pub type Fields = Vec<(String, String)>;

/// Command sent to MPD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpdCommand {
  pub name: String,
  pub args: Vec<String>,
}

impl MpdCommand {
  /// Create a command from a name and argument list.
  pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      name: name.into(),
      args,
    }
  }

  /// Command without arguments.
  pub fn bare(name: impl Into<String>) -> Self {
    Self::new(name, Vec::new())
  }

  pub fn currentsong() -> Self {
    Self::bare("currentsong")
  }

  pub fn status() -> Self {
    Self::bare("status")
  }

  /// A command must stay on one protocol line: the name is a single token and
  /// no argument may carry a line break.
  pub fn validate(&self) -> Result<(), ProtocolError> {
    let name_ok = !self.name.is_empty()
      && self
        .name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !name_ok {
      return Err(ProtocolError::InvalidCommand(self.name.clone()));
    }
    if let Some(arg) = self.args.iter().find(|a| a.contains(['\n', '\r'])) {
      return Err(ProtocolError::InvalidArgument {
        command: self.name.clone(),
        arg: arg.clone(),
      });
    }
    Ok(())
  }

  /// Build the wire command. Fails on anything [`validate`](Self::validate) rejects.
  pub fn to_wire(&self) -> Result<Command, ProtocolError> {
    self.validate()?;
    let mut command =
      Command::build(&self.name).map_err(|_| ProtocolError::InvalidCommand(self.name.clone()))?;
    for arg in &self.args {
      command
        .add_argument(arg.as_str())
        .map_err(|_| ProtocolError::InvalidArgument {
          command: self.name.clone(),
          arg: arg.clone(),
        })?;
    }
    Ok(command)
  }
}

/// Human-readable form used in logs, `name "arg1" "arg2"`.
impl fmt::Display for MpdCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)?;
    for arg in &self.args {
      write!(f, " \"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))?;
    }
    Ok(())
  }
}

/// Copy the fields of a response frame. Binary payloads are not forwarded.
pub fn frame_fields(frame: &Frame) -> Fields {
  frame
    .fields()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

/// Expected decoding of a command reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
  List,
  Map,
}

/// Decoded reply delivered to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
  Status { currentsong: Record, status: Record },
  List(Vec<Record>),
  Map(Record),
}

impl Payload {
  /// Whether there is anything to report.
  pub fn is_empty(&self) -> bool {
    match self {
      Payload::List(records) => records.is_empty(),
      Payload::Map(record) => record.is_empty(),
      Payload::Status { .. } => false,
    }
  }
}

/// Split a reply into records. A key seen twice starts a new record; the last
/// record is always kept, so a bare `OK` yields one empty record.
pub fn parse_array_message(fields: &[(String, String)]) -> Vec<Record> {
  let mut records = Vec::new();
  let mut current = Record::new();

  for (key, value) in fields {
    if current.contains_key(key) {
      records.push(std::mem::take(&mut current));
    }
    current.insert(key.clone(), value.clone());
  }

  records.push(current);
  records
}

/// Fold a reply into a single record. The last value for a key wins.
pub fn parse_key_value_message(fields: &[(String, String)]) -> Record {
  fields.iter().cloned().collect()
}

/// Decode a reply according to `shape`.
pub fn decode(fields: &[(String, String)], shape: ResponseShape) -> Payload {
  match shape {
    ResponseShape::List => Payload::List(parse_array_message(fields)),
    ResponseShape::Map => Payload::Map(parse_key_value_message(fields)),
  }
}
