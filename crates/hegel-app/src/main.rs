use std::sync::Arc;

use hegel_app::{host, Orchestrator};
use hegel_pty::{default_probe, ManagerConfig};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Resolved once; every session shares the shell, working directory, and base env.
    let config = ManagerConfig::from_env();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let orchestrator = Orchestrator::start(config, Arc::new(event_tx), default_probe()).await?;

    host::run(orchestrator, event_rx).await
}
