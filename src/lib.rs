use std::sync::Arc;

mod config;
pub mod mpd;
pub mod node;

pub use config::{AppConfig, ClientConfig, ConfigError, NodeConfig, ServerConfig};
use mpd::ConnectionRegistry;
use node::{CommandNode, CommandRequest, NodeMessage, StatusNode};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Run one status node and one command node against the configured server.
///
/// Every emitted message is printed to stdout as a JSON line; stdin lines are
/// commands. Returns on Ctrl-C or when stdin closes.
pub async fn run(config: AppConfig) -> Result<(), ConfigError> {
  config.validate()?;

  let registry = Arc::new(ConnectionRegistry::new(config.client.clone()));
  let (sink_tx, mut sink_rx) = mpsc::channel::<NodeMessage>(64);

  let status_node = StatusNode::new(&config.node, registry.clone(), sink_tx.clone());
  let command_node = CommandNode::new(&config.node, registry.clone(), sink_tx);
  log::info!(
    "Bridging MPD server {} ({} connection(s) open)",
    config.node.server.endpoint(),
    registry.len()
  );

  let printer = tokio::spawn(async move {
    while let Some(message) = sink_rx.recv().await {
      match serde_json::to_string(&message) {
        Ok(line) => println!("{}", line),
        Err(e) => log::error!("Failed to serialize message: {}", e),
      }
    }
  });

  let mut stdin = BufReader::new(tokio::io::stdin()).lines();
  let ctrl_c = tokio::signal::ctrl_c();
  tokio::pin!(ctrl_c);
  loop {
    tokio::select! {
      _ = &mut ctrl_c => {
        log::info!("Shutdown requested");
        break;
      }
      line = stdin.next_line() => match line {
        Ok(Some(line)) => {
          if let Some(request) = CommandRequest::from_line(&line) {
            command_node.input(request).await;
          }
        }
        Ok(None) => {
          log::info!("stdin closed, shutting down");
          break;
        }
        Err(e) => {
          log::error!("Failed to read stdin: {}", e);
          break;
        }
      }
    }
  }

  command_node.close();
  status_node.close();
  registry.shutdown();
  let _ = printer.await;
  Ok(())
}
