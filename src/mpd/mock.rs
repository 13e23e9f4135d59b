//! Scripted in-memory transport for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::Sender;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use super::endpoint::Endpoint;
use super::error::TransportError;
use super::protocol::{Fields, MpdCommand};
use super::transport::{Connector, Transport, TransportEvent};

#[derive(Clone)]
enum Scripted {
  Body(String),
  Ack(String),
}

#[derive(Default)]
struct Script {
  replies: HashMap<String, Scripted>,
  hanging: HashSet<String>,
  sent: Vec<String>,
}

/// Connector handing out [`MockTransport`]s. Replies are scripted per command name.
#[derive(Default)]
pub struct MockConnector {
  script: Arc<Mutex<Script>>,
  transports: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockConnector {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Answer `command` with `key: value` lines.
  pub fn reply(&self, command: &str, body: &str) {
    self
      .script
      .lock()
      .replies
      .insert(command.to_string(), Scripted::Body(body.to_string()));
  }

  pub fn reply_ack(&self, command: &str, line: &str) {
    self
      .script
      .lock()
      .replies
      .insert(command.to_string(), Scripted::Ack(line.to_string()));
  }

  pub fn connect_count(&self) -> usize {
    self.transports.lock().len()
  }

  pub fn last(&self) -> Arc<MockTransport> {
    self
      .transports
      .lock()
      .last()
      .cloned()
      .expect("no transport created yet")
  }

  pub fn transports(&self) -> Vec<Arc<MockTransport>> {
    self.transports.lock().clone()
  }

  /// Every command line sent through any transport, in order.
  pub fn sent(&self) -> Vec<String> {
    self.script.lock().sent.clone()
  }

  pub async fn wait_for_connects(&self, count: usize) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
      while self.connect_count() < count {
        tokio::time::sleep(Duration::from_millis(5)).await;
      }
    })
    .await;
    assert!(waited.is_ok(), "expected {} connects, saw {}", count, self.connect_count());
  }
}

impl Connector for MockConnector {
  fn connect(&self, endpoint: &Endpoint, events: Sender<TransportEvent>) -> Arc<dyn Transport> {
    let transport = Arc::new(MockTransport {
      endpoint: endpoint.clone(),
      events,
      script: self.script.clone(),
      sent: Mutex::new(Vec::new()),
      destroyed: AtomicBool::new(false),
    });
    self.transports.lock().push(transport.clone());
    transport
  }
}

pub struct MockTransport {
  endpoint: Endpoint,
  events: Sender<TransportEvent>,
  script: Arc<Mutex<Script>>,
  sent: Mutex<Vec<String>>,
  destroyed: AtomicBool,
}

impl MockTransport {
  pub fn emit(&self, event: TransportEvent) {
    let _ = self.events.try_send(event);
  }

  pub fn endpoint(&self) -> &Endpoint {
    &self.endpoint
  }

  pub fn sent(&self) -> Vec<String> {
    self.sent.lock().clone()
  }

  pub fn is_destroyed(&self) -> bool {
    self.destroyed.load(Ordering::SeqCst)
  }

  /// Never answer commands with this name.
  pub fn hang_on(&self, command: &str) {
    self.script.lock().hanging.insert(command.to_string());
  }
}

impl Transport for MockTransport {
  fn send_command(&self, command: MpdCommand) -> BoxFuture<'static, Result<Fields, TransportError>> {
    if self.is_destroyed() {
      return Box::pin(async { Err::<Fields, _>(TransportError::Disconnected) });
    }

    let line = command.to_string();
    self.sent.lock().push(line.clone());
    let mut script = self.script.lock();
    script.sent.push(line);

    if script.hanging.contains(&command.name) {
      return Box::pin(futures_util::future::pending::<Result<Fields, TransportError>>());
    }
    let result = match script.replies.get(&command.name).cloned() {
      Some(Scripted::Body(body)) => Ok(body_fields(&body)),
      Some(Scripted::Ack(line)) => Err(TransportError::Server(line)),
      None => Ok(Fields::new()),
    };
    Box::pin(async move { result })
  }

  fn destroy(&self) {
    self.destroyed.store(true, Ordering::SeqCst);
  }
}

fn body_fields(body: &str) -> Fields {
  body
    .lines()
    .filter_map(|line| line.split_once(": "))
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}
