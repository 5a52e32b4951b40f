//! examd - exam task daemon

use anyhow::Result;
use clap::Parser;
use examd::{server, AppState, Config};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "examd", version, about = "Serves practice exam tasks with answers")]
struct Args {
    /// Config file (default: /etc/examd/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides server.bind
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.validate()?;

    info!("examd v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Budgets: {} req/{}s service-wide, {} req/{}s for /get_task",
        config.limits.default_requests,
        config.limits.default_window_secs,
        config.limits.generation_requests,
        config.limits.generation_window_secs
    );

    let state = AppState::from_config(config).await?;
    server::run(state).await
}
