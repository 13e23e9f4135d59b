use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one MPD server. No DNS resolution or normalization is done:
/// `localhost:6600` and `127.0.0.1:6600` are different endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
  pub host: String,
  pub port: u16,
}

impl Endpoint {
  pub fn new(host: impl Into<String>, port: u16) -> Self {
    Self {
      host: host.into(),
      port,
    }
  }

  /// Registry key, `[host:port]`.
  pub fn id(&self) -> String {
    format!("[{}:{}]", self.host, self.port)
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}:{}]", self.host, self.port)
  }
}
