use std::path::PathBuf;

use clap::Parser;
use mpd_bridge::AppConfig;

/// Share one MPD connection between a status listener and a command channel.
#[derive(Debug, Parser)]
#[command(name = "mpd-bridge", version, about)]
struct Args {
  /// JSON config file; flags below override it.
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[arg(long)]
  host: Option<String>,

  #[arg(short, long)]
  port: Option<u16>,

  /// Topic stamped on emitted messages.
  #[arg(short, long)]
  topic: Option<String>,

  #[arg(long)]
  reconnect_delay_ms: Option<u64>,

  #[arg(long)]
  command_timeout_ms: Option<u64>,
}

impl Args {
  fn into_config(self) -> Result<AppConfig, String> {
    let mut config = match &self.config {
      Some(path) => {
        let text = std::fs::read_to_string(path)
          .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        AppConfig::from_json(&text).map_err(|e| e.to_string())?
      }
      None => AppConfig::default(),
    };

    if let Some(host) = self.host {
      config.node.server.host = host;
    }
    if let Some(port) = self.port {
      config.node.server.port = port;
    }
    if self.topic.is_some() {
      config.node.topic = self.topic;
    }
    if let Some(delay) = self.reconnect_delay_ms {
      config.client.reconnect_delay_ms = delay;
    }
    if self.command_timeout_ms.is_some() {
      config.client.command_timeout_ms = self.command_timeout_ms;
    }
    Ok(config)
  }
}

#[tokio::main]
async fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let config = match Args::parse().into_config() {
    Ok(config) => config,
    Err(e) => {
      log::error!("{}", e);
      std::process::exit(2);
    }
  };

  if let Err(e) = mpd_bridge::run(config).await {
    log::error!("{}", e);
    std::process::exit(1);
  }
}
