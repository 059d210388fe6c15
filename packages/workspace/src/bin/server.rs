//! Placesync server
//!
//! Hosts the relay hub, restores any project left open by a previous run and
//! keeps a control client attached to the hub.

use clap::Parser;
use placesync_workspace::{CommandRouter, Config, ControlClient, RelayHub, WorkspaceServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "placesync-server")]
#[command(about = "Project place documents onto disk and sync edits back", long_about = None)]
struct Cli {
    /// Config file (default: placesync.config.json in the working directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding .place documents
    #[arg(long)]
    projects_dir: Option<PathBuf>,

    /// Projection root for the open project
    #[arg(long)]
    unpack_dir: Option<PathBuf>,

    /// Address for the relay hub
    #[arg(long)]
    listen: Option<String>,

    /// Hub for the control client to connect to
    #[arg(long)]
    relay_url: Option<String>,

    /// Connect to an external hub instead of hosting one
    #[arg(long)]
    no_relay: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(Config, bool)> {
        let mut config = match &self.config {
            Some(path) => Config::load_file(path)?,
            None => Config::load(&std::env::current_dir()?)?,
        };

        if let Some(dir) = self.projects_dir {
            config.projects_dir = dir;
        }
        if let Some(dir) = self.unpack_dir {
            config.unpack_dir = dir;
        }
        if let Some(addr) = self.listen {
            config.listen_addr = addr;
        }
        if let Some(url) = self.relay_url {
            config.relay_url = url;
        }

        Ok((config, !self.no_relay))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,warp=warn")),
        )
        .init();

    let (config, host_relay) = Cli::parse().into_config()?;
    info!(
        "Projects in {}, projection at {}",
        config.projects_dir.display(),
        config.unpack_dir.display()
    );

    let server = WorkspaceServer::new(&config);
    if let Some(name) = server.restore().await {
        info!("Resumed project {}", name);
    }

    if host_relay {
        let addr: SocketAddr = config.listen_addr.parse()?;
        let (_, relay) = RelayHub::new().bind(addr)?;
        tokio::spawn(relay);
    }

    let client = ControlClient::new(
        config.relay_url.clone(),
        config.reconnect_delay(),
        CommandRouter::new(server),
    );

    tokio::select! {
        _ = client.run() => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
