use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use coedit_workspace::{router, DocumentRegistry, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coedit-server")]
#[command(author, version, about = "Collaborative rich-text editing server", long_about = None)]
struct Args {
    /// Config file (default: ./coedit.config.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Retained revisions per document (0 = unlimited)
    #[arg(long)]
    history_limit: Option<usize>,
}

impl Args {
    fn config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load_file(path)?,
            None => ServerConfig::load(std::env::current_dir()?)?,
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(history_limit) = self.history_limit {
            config.history_limit = history_limit;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.config()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let registry = Arc::new(DocumentRegistry::from_config(&config)?);
    let app = router(registry);

    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(
        %address,
        history_limit = config.history_limit,
        broadcast_capacity = config.broadcast_capacity,
        "coedit server listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
